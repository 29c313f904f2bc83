//! Test fixtures for common test data
//!
//! Fixed identifiers shared by the integration and BDD suites.

/// Fixed ids for reproducible tests
pub mod ids {
    pub const ADMIN_ID: &str = "admin-1";
    pub const TEACHER_ID: &str = "teacher-7";
    pub const OTHER_TEACHER_ID: &str = "teacher-8";
    pub const STUDENT_ID: &str = "student-21";
    pub const OTHER_STUDENT_ID: &str = "student-22";
    pub const PARENT_ID: &str = "parent-3";
    pub const HR_ID: &str = "hr-1";

    pub const CLASS_ID: &str = "12";
    pub const OTHER_CLASS_ID: &str = "13";
    pub const SUBJECT_ID: &str = "math";
}

/// Secret shared by the test configuration and the token factory
pub const TEST_JWT_SECRET: &str = "test_secret_key_that_is_at_least_32_bytes_long";

/// A new-student payload for the given class
pub fn new_student_body(class_id: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "Ada",
        "surname": "Lovelace",
        "classId": class_id,
    })
}

/// An attendance payload for the given class
pub fn attendance_body(class_id: &str) -> serde_json::Value {
    serde_json::json!({
        "classId": class_id,
        "date": "2026-03-02",
        "records": [
            {"studentId": ids::STUDENT_ID, "status": "PRESENT"},
            {"studentId": ids::OTHER_STUDENT_ID, "status": "LATE"},
        ],
    })
}

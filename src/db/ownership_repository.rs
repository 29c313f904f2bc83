//! Ownership relationship repository
//!
//! Answers the two existence questions the ownership guard asks: does this
//! teacher hold an active assignment to the class, and is this parent linked
//! to the student.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{AssignmentStatus, ParentStudentLink, TeachingAssignment};

/// Read side of the relationship data consulted by the ownership guard
#[async_trait]
pub trait OwnershipStore: Send + Sync {
    /// Active assignment for (teacher, class), narrowed to the subject when given
    async fn find_active_assignment(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: Option<&str>,
    ) -> Result<Option<TeachingAssignment>>;

    async fn find_parent_link(
        &self,
        parent_id: &str,
        student_id: &str,
    ) -> Result<Option<ParentStudentLink>>;
}

#[derive(Debug, sqlx::FromRow)]
struct AssignmentRow {
    id: String,
    teacher_id: String,
    class_id: String,
    subject_id: Option<String>,
    status: String,
}

#[derive(Debug, sqlx::FromRow)]
struct ParentLinkRow {
    id: String,
    parent_id: String,
    student_id: String,
}

#[derive(Clone)]
pub struct OwnershipRepository {
    pool: SqlitePool,
}

impl OwnershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a teaching assignment
    pub async fn assign_teacher(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: Option<&str>,
        status: AssignmentStatus,
    ) -> Result<TeachingAssignment> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO teaching_assignments (id, teacher_id, class_id, subject_id, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(teacher_id)
        .bind(class_id)
        .bind(subject_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert teaching assignment")?;

        Ok(TeachingAssignment {
            id,
            teacher_id: teacher_id.to_string(),
            class_id: class_id.to_string(),
            subject_id: subject_id.map(|s| s.to_string()),
            status,
        })
    }

    /// Move an assignment to a new status, returning whether it existed
    pub async fn set_assignment_status(&self, id: &str, status: AssignmentStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE teaching_assignments SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update teaching assignment")?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a guardianship link
    pub async fn link_parent(&self, parent_id: &str, student_id: &str) -> Result<ParentStudentLink> {
        let id = Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO parent_students (id, parent_id, student_id) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(parent_id)
            .bind(student_id)
            .execute(&self.pool)
            .await
            .context("Failed to insert parent-student link")?;

        Ok(ParentStudentLink {
            id,
            parent_id: parent_id.to_string(),
            student_id: student_id.to_string(),
        })
    }
}

#[async_trait]
impl OwnershipStore for OwnershipRepository {
    async fn find_active_assignment(
        &self,
        teacher_id: &str,
        class_id: &str,
        subject_id: Option<&str>,
    ) -> Result<Option<TeachingAssignment>> {
        let mut sql = String::from(
            "SELECT id, teacher_id, class_id, subject_id, status FROM teaching_assignments \
             WHERE teacher_id = ? AND class_id = ? AND status = ?",
        );
        if subject_id.is_some() {
            sql.push_str(" AND subject_id = ?");
        }
        sql.push_str(" LIMIT 1");

        let mut q = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(teacher_id)
            .bind(class_id)
            .bind(AssignmentStatus::Active.as_str());
        if let Some(subject_id) = subject_id {
            q = q.bind(subject_id);
        }

        let row = q
            .fetch_optional(&self.pool)
            .await
            .context("Failed to look up teaching assignment")?;

        row.map(row_to_assignment).transpose()
    }

    async fn find_parent_link(
        &self,
        parent_id: &str,
        student_id: &str,
    ) -> Result<Option<ParentStudentLink>> {
        let row = sqlx::query_as::<_, ParentLinkRow>(
            "SELECT id, parent_id, student_id FROM parent_students WHERE parent_id = ? AND student_id = ? LIMIT 1",
        )
        .bind(parent_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up parent-student link")?;

        Ok(row.map(|r| ParentStudentLink {
            id: r.id,
            parent_id: r.parent_id,
            student_id: r.student_id,
        }))
    }
}

fn row_to_assignment(row: AssignmentRow) -> Result<TeachingAssignment> {
    let status = row
        .status
        .parse::<AssignmentStatus>()
        .map_err(anyhow::Error::msg)?;

    Ok(TeachingAssignment {
        id: row.id,
        teacher_id: row.teacher_id,
        class_id: row.class_id,
        subject_id: row.subject_id,
        status,
    })
}

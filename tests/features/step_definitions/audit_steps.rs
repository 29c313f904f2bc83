//! Audit trail step definitions

use std::time::Duration;

use cucumber::{given, then};

use crate::features::support::TestWorld;

#[given("audit logging is disabled")]
async fn audit_disabled(world: &mut TestWorld) {
    world.config.audit.enabled = false;
}

#[then(expr = "an audit entry {string} should be recorded for route {string}")]
async fn audit_recorded(world: &mut TestWorld, action: String, route: String) {
    let entries = world.audit.wait_for(1).await;
    assert!(
        entries.iter().any(|e| e.action == action && e.route == route),
        "No {} entry for {} in {:?}",
        action,
        route,
        entries
    );
}

#[then("no audit entry should be recorded")]
async fn no_audit(world: &mut TestWorld) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(world.audit.entries().is_empty());
}

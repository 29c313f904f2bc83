//! Rate limiting step definitions

use std::time::Duration;

use axum::http::{header::RETRY_AFTER, Method};
use cucumber::{given, then, when};

use crate::features::support::TestWorld;

#[given(expr = "requests are limited to {int} per {int} milliseconds")]
async fn limited(world: &mut TestWorld, max_requests: u32, window_ms: u64) {
    world.config.rate_limit.enabled = true;
    world.config.rate_limit.max_requests = max_requests;
    world.config.rate_limit.window_ms = window_ms;
}

#[given(expr = "my client address is {string}")]
async fn client_address(world: &mut TestWorld, ip: String) {
    world.client_ip = Some(ip);
}

#[when(expr = "I send {int} GET requests to {string}")]
async fn repeated_requests(world: &mut TestWorld, count: usize, uri: String) {
    world.responses.clear();
    for _ in 0..count {
        world.send(Method::GET, &uri, None).await;
    }
}

#[when(expr = "I wait {int} milliseconds")]
async fn wait(_world: &mut TestWorld, millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[then(expr = "every response status should be {int}")]
async fn every_status(world: &mut TestWorld, status: u16) {
    assert!(!world.responses.is_empty(), "No response available");
    for response in &world.responses {
        assert_eq!(response.status.as_u16(), status, "Body: {}", response.text());
    }
}

#[then(expr = "the response should ask me to retry within {int} second(s)")]
async fn retry_within(world: &mut TestWorld, seconds: u64) {
    let response = world.last_response();
    let header: u64 = response.headers[RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(header <= seconds, "Retry-After was {}", header);

    let body: serde_json::Value = response.json();
    assert_eq!(body["retryAfter"], header);
}

//! BDD step definitions for the remote UI surface

use axum::body::Body;
use axum::http::Request;
use cucumber::{then, when};
use tower::ServiceExt;

use nzb_info::remote::{build_router, RemoteState};

use crate::world::NzbInfoWorld;

async fn send(world: &mut NzbInfoWorld, request: Request<Body>) {
    let router = build_router(RemoteState::new(world.state(), world.selection(), 30));
    let response = router.oneshot(request).await.expect("router is infallible");

    world.response_status = Some(response.status().as_u16());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    world.response_body = serde_json::from_slice(&bytes).ok();
}

fn field<'a>(world: &'a NzbInfoWorld, pointer: &str) -> &'a serde_json::Value {
    let body = world
        .response_body
        .as_ref()
        .expect("response body is not JSON");
    body.pointer(pointer)
        .unwrap_or_else(|| panic!("no field {} in {}", pointer, body))
}

// --- When steps ---

#[when(expr = "the remote client requests {string}")]
async fn remote_client_requests(world: &mut NzbInfoWorld, path: String) {
    let request = Request::builder()
        .uri(path)
        .body(Body::empty())
        .expect("valid request");
    send(world, request).await;
}

#[when(expr = "the remote client selects {string}")]
async fn remote_client_selects(world: &mut NzbInfoWorld, source: String) {
    let body = serde_json::json!({ "source": source }).to_string();
    let request = Request::builder()
        .method("PUT")
        .uri("/api/source")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("valid request");
    send(world, request).await;
}

// --- Then steps ---

#[then(expr = "the response status is {int}")]
fn response_status_is(world: &mut NzbInfoWorld, expected: u16) {
    assert_eq!(world.response_status, Some(expected));
}

#[then(expr = "the response field {string} is {string}")]
fn response_field_is(world: &mut NzbInfoWorld, pointer: String, expected: String) {
    let value = field(world, &pointer);
    let actual = match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    assert_eq!(actual, expected);
}

#[then(expr = "the response field {string} contains {string}")]
fn response_field_contains(world: &mut NzbInfoWorld, pointer: String, expected: String) {
    let value = field(world, &pointer);
    assert!(
        value.to_string().contains(&expected),
        "{} does not contain {:?}",
        value,
        expected
    );
}

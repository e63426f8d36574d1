//! BDD step definitions for polling, retention and status mapping

use std::time::{Duration, Instant};

use cucumber::{then, when};

use nzb_info::presentation::{render, DisplayPayload, Source};

use crate::world::NzbInfoWorld;

async fn view(world: &mut NzbInfoWorld, id: &str) -> DisplayPayload {
    let state = world.state();
    let store = state.read().await;
    render(&store, &Source::Application(id.to_string()))
}

// --- When steps ---

#[when("a poll tick runs")]
async fn poll_tick_runs(world: &mut NzbInfoWorld) {
    let scheduler = world.scheduler();
    let started = Instant::now();
    scheduler.tick().await;
    world.tick_elapsed = Some(started.elapsed());
}

// --- Then steps ---

#[then(expr = "the tick completes within {int} milliseconds")]
fn tick_completes_within(world: &mut NzbInfoWorld, millis: u64) {
    let elapsed = world.tick_elapsed.expect("no tick has run");
    assert!(
        elapsed < Duration::from_millis(millis),
        "tick took {:?}, expected under {}ms",
        elapsed,
        millis
    );
}

#[then(expr = "{word} is reported as {string}")]
async fn application_is_reported_as(world: &mut NzbInfoWorld, id: String, expected: String) {
    let state = world.state();
    let snapshot = state
        .read()
        .await
        .read(&id)
        .unwrap_or_else(|| panic!("no snapshot for {}", id));
    assert_eq!(snapshot.status.to_string(), expected);
}

#[then(expr = "{word} has not been polled")]
async fn application_has_not_been_polled(world: &mut NzbInfoWorld, id: String) {
    let state = world.state();
    assert!(state.read().await.read(&id).is_none());
}

#[then(expr = "the {word} view shows {string}")]
async fn view_shows(world: &mut NzbInfoWorld, id: String, expected: String) {
    let payload = view(world, &id).await;
    let visible = [
        &payload.title,
        &payload.status_line,
        &payload.queue_summary,
        &payload.last_file,
    ];
    assert!(
        visible.iter().any(|line| line.contains(&expected)),
        "expected {:?} in {:?}",
        expected,
        payload
    );
}

#[then(expr = "the {word} queue summary is {string}")]
async fn queue_summary_is(world: &mut NzbInfoWorld, id: String, expected: String) {
    let payload = view(world, &id).await;
    assert_eq!(payload.queue_summary, expected);
}

#[then(expr = "the {word} status line mentions {string}")]
async fn status_line_mentions(world: &mut NzbInfoWorld, id: String, expected: String) {
    let payload = view(world, &id).await;
    assert!(
        payload.status_line.contains(&expected),
        "status line {:?} does not mention {:?}",
        payload.status_line,
        expected
    );
}

#[then(expr = "{word} has no metrics")]
async fn application_has_no_metrics(world: &mut NzbInfoWorld, id: String) {
    let state = world.state();
    let snapshot = state.read().await.read(&id).expect("no snapshot");
    assert!(snapshot.metrics.is_empty(), "{:?}", snapshot.metrics);
}

#[then(expr = "the last file of {word} is {string}")]
async fn last_file_is(world: &mut NzbInfoWorld, id: String, expected: String) {
    let state = world.state();
    let snapshot = state.read().await.read(&id).expect("no snapshot");
    assert_eq!(snapshot.last_file.as_deref(), Some(expected.as_str()));
}

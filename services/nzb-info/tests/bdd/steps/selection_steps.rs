//! BDD step definitions for source selection and the overview

use cucumber::{then, when};

use nzb_info::presentation::render;
use nzb_info::NzbInfoError;

use crate::world::NzbInfoWorld;

#[when(expr = "the user selects {string}")]
async fn user_selects(world: &mut NzbInfoWorld, source: String) {
    let selection = world.selection();
    let result = selection.write().await.select(&source).map(|_| ());
    world.selection_error = result.err();
}

#[then(expr = "the selected source is {string}")]
async fn selected_source_is(world: &mut NzbInfoWorld, expected: String) {
    let selection = world.selection();
    assert_eq!(selection.read().await.current().id(), expected);
}

#[then("the selection is rejected as an unknown source")]
fn selection_is_rejected(world: &mut NzbInfoWorld) {
    match &world.selection_error {
        Some(NzbInfoError::UnknownSource(_)) => {}
        other => panic!("expected UnknownSource, got {:?}", other),
    }
}

#[then("the selection is accepted")]
fn selection_is_accepted(world: &mut NzbInfoWorld) {
    assert!(
        world.selection_error.is_none(),
        "unexpected error: {:?}",
        world.selection_error
    );
}

#[then(expr = "the available sources are {string}")]
async fn available_sources_are(world: &mut NzbInfoWorld, expected: String) {
    let selection = world.selection();
    let names: Vec<String> = selection
        .read()
        .await
        .sources()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names.join(", "), expected);
}

#[then(expr = "the display title is {string}")]
async fn display_title_is(world: &mut NzbInfoWorld, expected: String) {
    let selection = world.selection();
    let source = selection.read().await.current().clone();
    let state = world.state();
    let store = state.read().await;
    assert_eq!(render(&store, &source).title, expected);
}

#[then(expr = "the display shows {string}")]
async fn display_shows(world: &mut NzbInfoWorld, expected: String) {
    let selection = world.selection();
    let source = selection.read().await.current().clone();
    let state = world.state();
    let store = state.read().await;
    let payload = render(&store, &source);
    let visible = [
        &payload.title,
        &payload.status_line,
        &payload.queue_summary,
        &payload.last_file,
    ];
    assert!(
        visible.iter().any(|line| line.contains(&expected))
            || payload.entries.iter().any(|e| e.summary.contains(&expected)),
        "expected {:?} in {:?}",
        expected,
        payload
    );
}

//! BDD step definitions for the service builder and lifecycle

use std::sync::Arc;
use std::time::Duration;

use cucumber::{given, then, when};
use tokio_util::sync::CancellationToken;

use nzb_info::io::HttpClient;
use nzb_info::NzbInfoBuilder;

use crate::world::NzbInfoWorld;

fn builder(world: &mut NzbInfoWorld) -> NzbInfoBuilder {
    let mut config = world.config.clone();
    config.server.enabled = false;
    let http: Arc<dyn HttpClient> = world.backends.clone();
    let cancel = world.cancel.get_or_insert_with(CancellationToken::new).clone();
    NzbInfoBuilder::new(config)
        .with_http_client(http)
        .with_cancellation_token(cancel)
}

// --- Given steps ---

#[given("an empty configuration")]
fn empty_configuration(world: &mut NzbInfoWorld) {
    world.config.applications.clear();
}

#[given(expr = "a configured timeout of {int} seconds")]
fn configured_timeout(world: &mut NzbInfoWorld, seconds: u64) {
    world.config.timeout = seconds;
}

#[given(expr = "the {word} host is blank")]
fn host_is_blank(world: &mut NzbInfoWorld, kind: String) {
    let kind = crate::world::parse_kinds(&kind)[0];
    if let Some(settings) = world.config.applications.get_mut(&kind) {
        settings.host = "  ".to_string();
    }
}

#[given("the service is cancelled before it starts")]
fn cancelled_before_start(world: &mut NzbInfoWorld) {
    let cancel = CancellationToken::new();
    cancel.cancel();
    world.cancel = Some(cancel);
}

// --- When steps ---

#[when("the service is built")]
async fn service_is_built(world: &mut NzbInfoWorld) {
    let result = builder(world).build().await;
    world.build_succeeded = Some(result.is_ok());
}

#[when("the service is started")]
async fn service_is_started(world: &mut NzbInfoWorld) {
    let service = match builder(world).build().await {
        Ok(service) => service,
        Err(_) => {
            world.build_succeeded = Some(false);
            return;
        }
    };
    world.build_succeeded = Some(true);

    let result = tokio::time::timeout(Duration::from_secs(5), service.start()).await;
    world.start_succeeded = Some(matches!(result, Ok(Ok(()))));
}

#[when("the service runs until every application has been polled")]
async fn service_runs_until_polled(world: &mut NzbInfoWorld) {
    let service = builder(world)
        .build()
        .await
        .expect("service should build");
    world.build_succeeded = Some(true);

    let state = service.state();
    let ids: Vec<String> = service.applications().iter().map(|a| a.id.clone()).collect();
    world.state = Some(service.state());
    world.selection = Some(service.selection());

    let cancel = service.cancellation_token();
    let running = tokio::spawn(service.start());

    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let store = state.read().await;
                if ids.iter().all(|id| store.read(id).is_some()) {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "not every application was polled in time");

    cancel.cancel();
    let stopped = tokio::time::timeout(Duration::from_secs(5), running).await;
    world.start_succeeded = Some(matches!(stopped, Ok(Ok(Ok(())))));
}

// --- Then steps ---

#[then("the service builds successfully")]
fn builds_successfully(world: &mut NzbInfoWorld) {
    assert_eq!(world.build_succeeded, Some(true));
}

#[then("the service fails to build")]
fn fails_to_build(world: &mut NzbInfoWorld) {
    assert_eq!(world.build_succeeded, Some(false));
}

#[then("the service stops cleanly")]
fn stops_cleanly(world: &mut NzbInfoWorld) {
    assert_eq!(world.start_succeeded, Some(true));
}

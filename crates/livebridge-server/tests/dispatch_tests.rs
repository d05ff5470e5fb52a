//! Integration tests for the protocol dispatcher.
//!
//! These drive the dispatcher directly, without a live socket, and
//! cover the observable protocol properties: namespace persistence,
//! per-call fault isolation, lookup recovery, change detection on the
//! eval path, context rebuild, and the invalid-request path.

#![allow(clippy::unwrap_used)]

use livebridge_context::{ContextSlot, ExecutionContext, ReloadController};
use livebridge_protocol::{Outcome, Request, Response};
use livebridge_server::dispatch::{DispatchOutcome, Dispatcher};
use serde_json::json;

fn make_dispatcher() -> (Dispatcher, ContextSlot) {
    let context = ExecutionContext::new(None).unwrap();
    let slot = ContextSlot::new(context);
    (Dispatcher::new(slot.clone()), slot)
}

fn request(value: serde_json::Value) -> Request {
    serde_json::from_value(value).unwrap()
}

/// Dispatch a request expected to produce a broadcast response.
async fn broadcast(dispatcher: &mut Dispatcher, value: serde_json::Value) -> Response {
    match dispatcher.dispatch(&request(value)).await.unwrap() {
        DispatchOutcome::Broadcast(response) => response,
        DispatchOutcome::Direct(response) => {
            panic!("expected broadcast delivery, got direct: {response:?}")
        }
    }
}

#[tokio::test]
async fn consecutive_evals_share_the_namespace() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let first = broadcast(&mut dispatcher, json!({"eval": "let x = 40;"})).await;
    assert_eq!(first.result, Outcome::Success);

    let second = broadcast(&mut dispatcher, json!({"eval": "x + 2"})).await;
    assert_eq!(second.result, Outcome::Success);
    assert_eq!(second.value, Some(json!("42\n")));
}

#[tokio::test]
async fn one_fault_never_poisons_later_evaluations() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let bad = broadcast(&mut dispatcher, json!({"eval": "1/0"})).await;
    assert_eq!(bad.result, Outcome::Exception);
    assert!(bad.value.unwrap().as_str().unwrap().contains("zero"));

    let good = broadcast(&mut dispatcher, json!({"eval": "1+1"})).await;
    assert_eq!(good.result, Outcome::Success);
    assert_eq!(good.value, Some(json!("2\n")));
}

#[tokio::test]
async fn get_on_unbound_name_is_recovered() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let response = broadcast(&mut dispatcher, json!({"get": "ghost"})).await;
    assert_eq!(response.result, Outcome::Error);
    assert_eq!(response.description.as_deref(), Some("no such variable"));
}

#[tokio::test]
async fn set_then_get_round_trips() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let set = broadcast(&mut dispatcher, json!({"set": "x", "value": 5})).await;
    assert_eq!(set.result, Outcome::Success);
    assert_eq!(set.value, None);

    let get = broadcast(&mut dispatcher, json!({"get": "x"})).await;
    assert_eq!(get.result, Outcome::Success);
    assert_eq!(get.value, Some(json!(5)));
}

#[tokio::test]
async fn set_without_value_is_a_write_fault() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let response = broadcast(&mut dispatcher, json!({"set": "x"})).await;
    assert_eq!(response.result, Outcome::Error);
    assert_eq!(
        response.description.as_deref(),
        Some("could not set variable")
    );
}

#[tokio::test]
async fn model_state_is_published_once_per_change() {
    let (mut dispatcher, _slot) = make_dispatcher();

    // Constructing the model makes its generation visible.
    let first = broadcast(&mut dispatcher, json!({"eval": "let model = init();"})).await;
    assert_eq!(first.result, Outcome::Success);
    assert!(first.state.is_some());

    // Mutation marks it dirty again.
    let second = broadcast(
        &mut dispatcher,
        json!({"eval": "model.add_module(\"osc1\", #{ kind: \"oscillator\" });"}),
    )
    .await;
    let state = second.state.unwrap();
    assert_eq!(state.modules["osc1"]["kind"], "oscillator");

    // No further mutation: no state field.
    let third = broadcast(&mut dispatcher, json!({"eval": "1+1"})).await;
    assert_eq!(third.result, Outcome::Success);
    assert!(third.state.is_none());
}

#[tokio::test]
async fn model_reassignment_forces_a_publish_even_when_clean() {
    let (mut dispatcher, _slot) = make_dispatcher();

    broadcast(&mut dispatcher, json!({"eval": "let model = init();"})).await;

    // A brand-new entity, dirty flag false, identity changed.
    let response = broadcast(&mut dispatcher, json!({"eval": "model = init();"})).await;
    assert!(response.state.is_some());
}

#[tokio::test]
async fn faulted_eval_never_carries_state() {
    let (mut dispatcher, _slot) = make_dispatcher();

    broadcast(&mut dispatcher, json!({"eval": "let model = init();"})).await;
    let bad = broadcast(&mut dispatcher, json!({"eval": "model.kaput()"})).await;
    assert_eq!(bad.result, Outcome::Exception);
    assert!(bad.state.is_none());
}

#[tokio::test]
async fn call_and_set_do_not_trigger_change_detection() {
    let (mut dispatcher, _slot) = make_dispatcher();

    broadcast(&mut dispatcher, json!({"eval": "let model = init();"})).await;

    // `call` constructs another model but carries no state field.
    let call = broadcast(&mut dispatcher, json!({"call": "init"})).await;
    assert_eq!(call.result, Outcome::Success);
    assert!(call.state.is_none());
}

#[tokio::test]
async fn rebuild_clears_previously_bound_names() {
    let (mut dispatcher, slot) = make_dispatcher();

    broadcast(&mut dispatcher, json!({"eval": "let x = 1;"})).await;
    let before = broadcast(&mut dispatcher, json!({"get": "x"})).await;
    assert_eq!(before.result, Outcome::Success);

    ReloadController::new(slot, None).rebuild().await.unwrap();

    let after = broadcast(&mut dispatcher, json!({"get": "x"})).await;
    assert_eq!(after.result, Outcome::Error);
    assert_eq!(after.description.as_deref(), Some("no such variable"));
}

#[tokio::test]
async fn model_in_rebuilt_context_is_republished() {
    let (mut dispatcher, slot) = make_dispatcher();

    broadcast(&mut dispatcher, json!({"eval": "let model = init();"})).await;
    ReloadController::new(slot, None).rebuild().await.unwrap();

    // The detector's record survives the swap, but the new model's
    // generation is unseen, so it publishes again.
    let response = broadcast(&mut dispatcher, json!({"eval": "let model = init();"})).await;
    assert!(response.state.is_some());
}

#[tokio::test]
async fn verbless_request_is_answered_directly() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let outcome = dispatcher
        .dispatch(&request(json!({"value": 5})))
        .await
        .unwrap();
    match outcome {
        DispatchOutcome::Direct(response) => {
            assert_eq!(response.result, Outcome::Error);
            assert_eq!(response.description.as_deref(), Some("invalid request"));
        }
        DispatchOutcome::Broadcast(response) => {
            panic!("invalid request must not broadcast: {response:?}")
        }
    }
}

#[tokio::test]
async fn call_on_absent_routine_is_an_unrecovered_fault() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let result = dispatcher.dispatch(&request(json!({"call": "missing"}))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn call_fault_inside_routine_propagates() {
    let (mut dispatcher, _slot) = make_dispatcher();

    broadcast(
        &mut dispatcher,
        json!({"eval": "fn boom() { throw \"kaput\" }"}),
    )
    .await;
    let result = dispatcher.dispatch(&request(json!({"call": "boom"}))).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn call_with_kwargs_passes_an_object_map() {
    let (mut dispatcher, _slot) = make_dispatcher();

    broadcast(
        &mut dispatcher,
        json!({"eval": "fn scale(opts) { opts.value * opts.by }"}),
    )
    .await;

    let response = broadcast(
        &mut dispatcher,
        json!({"call": "scale", "args": {"value": 6, "by": 7}}),
    )
    .await;
    assert_eq!(response.result, Outcome::Success);
    assert_eq!(response.value, Some(json!(42)));
}

#[tokio::test]
async fn incomplete_fragment_yields_empty_success() {
    let (mut dispatcher, _slot) = make_dispatcher();

    let open = broadcast(&mut dispatcher, json!({"eval": "fn add(a, b) {"})).await;
    assert_eq!(open.result, Outcome::Success);
    assert_eq!(open.value, Some(json!("")));

    broadcast(&mut dispatcher, json!({"eval": "a + b"})).await;
    broadcast(&mut dispatcher, json!({"eval": "}"})).await;

    let usage = broadcast(&mut dispatcher, json!({"eval": "add(20, 22)"})).await;
    assert_eq!(usage.value, Some(json!("42\n")));
}

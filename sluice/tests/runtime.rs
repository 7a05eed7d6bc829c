mod common;

use common::{CountdownHandler, CounterEffect, CounterMsg, FaultyHandler, counter_update};
use sluice::{
    EmitError, Feature, FeatureError, FeatureRuntime, Lifecycle, Operation,
    testing::{DisposeProbe, RecordingHandler, next_within},
};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    time::Duration,
};
use tokio::sync::broadcast::error::TryRecvError;

const WAIT: Duration = Duration::from_secs(1);

#[tokio::test]
async fn test_counter_increment_then_decrement() {
    let feature = FeatureRuntime::new(0, counter_update);
    let mut states = feature.state_changes();
    let mut effects = feature.effects();
    feature.init().await.unwrap();

    feature.accept(CounterMsg::Increment).unwrap();
    feature.accept(CounterMsg::Decrement).unwrap();

    assert_eq!(feature.state(), 0);
    assert_eq!(states.try_recv(), Ok(1));
    assert_eq!(states.try_recv(), Ok(0));
    assert_eq!(
        next_within(&mut effects, Duration::from_millis(50)).await,
        None
    );

    feature.dispose().await.unwrap();
}

#[tokio::test]
async fn test_state_published_exactly_once() {
    let feature = FeatureRuntime::new(0, counter_update);
    let mut states = feature.state_changes();
    feature.init().await.unwrap();

    feature.accept(CounterMsg::Increment).unwrap();

    assert_eq!(feature.state(), 1);
    assert_eq!(states.try_recv(), Ok(1));
    assert_eq!(states.try_recv(), Err(TryRecvError::Empty));

    // Effects alone never touch the state stream.
    feature.accept(CounterMsg::Produce(vec![1])).unwrap();
    assert_eq!(states.try_recv(), Err(TryRecvError::Empty));

    feature.dispose().await.unwrap();
}

#[tokio::test]
async fn test_effects_reach_every_handler_in_order() {
    let first = RecordingHandler::<CounterEffect>::new();
    let second = RecordingHandler::<CounterEffect>::new();
    let feature = FeatureRuntime::builder(0, counter_update)
        .handler(first.clone())
        .handler(second.clone())
        .build();
    let mut effects = feature.effects();
    feature.init().await.unwrap();

    feature.accept(CounterMsg::Produce(vec![1, 2, 3])).unwrap();

    let expected: Vec<_> = [1, 2, 3].into_iter().map(CounterEffect::Value).collect();
    for effect in &expected {
        assert_eq!(next_within(&mut effects, WAIT).await.as_ref(), Some(effect));
    }
    assert!(first.wait_for(3, WAIT).await);
    assert!(second.wait_for(3, WAIT).await);
    assert_eq!(first.effects(), expected);
    assert_eq!(second.effects(), expected);

    feature.dispose().await.unwrap();
}

#[tokio::test]
async fn test_initial_and_disposal_effects_go_to_handlers() {
    let recorder = RecordingHandler::<CounterEffect>::new();
    let feature = FeatureRuntime::builder(0, counter_update)
        .handler(recorder.clone())
        .initial_effect(CounterEffect::Value(1))
        .disposal_effects([CounterEffect::Value(8), CounterEffect::Value(9)])
        .build();
    let mut effects = feature.effects();

    feature.init().await.unwrap();
    assert!(recorder.wait_for(1, WAIT).await);
    feature.dispose().await.unwrap();

    assert_eq!(
        recorder.effects(),
        vec![
            CounterEffect::Value(1),
            CounterEffect::Value(8),
            CounterEffect::Value(9)
        ]
    );
    // Only accepted messages produce stream effects.
    assert_eq!(next_within(&mut effects, WAIT).await, None);
}

#[tokio::test]
async fn test_emitted_messages_reenter_in_order() {
    let feature = FeatureRuntime::builder(0, counter_update)
        .handler(CountdownHandler)
        .build();
    let mut states = feature.state_changes();
    feature.init().await.unwrap();

    feature.accept(CounterMsg::Countdown(3)).unwrap();

    for expected in [3, 2, 1, 0] {
        assert_eq!(next_within(&mut states, WAIT).await, Some(expected));
    }
    assert_eq!(feature.state(), 0);

    feature.dispose().await.unwrap();
}

#[tokio::test]
async fn test_lifecycle_misuse_is_an_error() {
    let feature = FeatureRuntime::new(0, counter_update);
    assert_eq!(feature.lifecycle(), Lifecycle::Uninitialized);

    let err = feature.accept(CounterMsg::Increment).unwrap_err();
    assert_eq!(err.to_string(), "cannot accept a message on a feature that is uninitialized");

    feature.init().await.unwrap();
    assert_eq!(feature.lifecycle(), Lifecycle::Running);
    assert!(feature.init().await.is_err());

    feature.dispose().await.unwrap();
    assert_eq!(feature.lifecycle(), Lifecycle::Disposed);
    assert_eq!(
        feature.accept(CounterMsg::Increment),
        Err(FeatureError::Lifecycle {
            operation: Operation::Accept,
            lifecycle: Lifecycle::Disposed,
        })
    );
    assert_eq!(
        feature.init().await,
        Err(FeatureError::Lifecycle {
            operation: Operation::Init,
            lifecycle: Lifecycle::Disposed,
        })
    );
    assert_eq!(feature.state(), 0);
}

#[tokio::test]
async fn test_dispose_is_idempotent() {
    let probe = DisposeProbe::new();
    let feature = FeatureRuntime::builder(0, counter_update)
        .handler(probe.clone())
        .build();
    feature.init().await.unwrap();

    feature.dispose().await.unwrap();
    feature.dispose().await.unwrap();

    assert!(probe.is_disposed());
    assert_eq!(probe.dispose_calls(), 1);
}

#[tokio::test]
async fn test_dispose_without_init_runs_disposal_hooks_only() {
    let probe = DisposeProbe::new();
    let recorder = RecordingHandler::<CounterEffect>::new();
    let feature = FeatureRuntime::builder(0, counter_update)
        .handler(probe.clone())
        .handler(recorder.clone())
        .disposal_effect(CounterEffect::Value(0))
        .build();

    feature.dispose().await.unwrap();

    assert!(probe.is_disposed());
    assert_eq!(recorder.count(), 0);
    assert_eq!(feature.lifecycle(), Lifecycle::Disposed);
}

#[tokio::test]
async fn test_emitter_closes_after_dispose() {
    let feature = FeatureRuntime::new(0, counter_update);
    let emitter = feature.emitter();
    feature.init().await.unwrap();
    emitter.emit(CounterMsg::Increment).unwrap();

    feature.dispose().await.unwrap();

    assert_eq!(emitter.emit(CounterMsg::Increment), Err(EmitError::Closed));
    assert_eq!(feature.emitter().emit(CounterMsg::Increment), Err(EmitError::Closed));
}

#[tokio::test]
async fn test_emitter_closes_after_dispose_without_init() {
    let feature = FeatureRuntime::new(0, counter_update);
    let emitter = feature.emitter();

    feature.dispose().await.unwrap();

    assert_eq!(emitter.emit(CounterMsg::Increment), Err(EmitError::Closed));
}

#[tokio::test]
async fn test_faulty_handler_does_not_stall_the_others() {
    let recorder = RecordingHandler::<CounterEffect>::new();
    let feature = FeatureRuntime::builder(0, counter_update)
        .handler(FaultyHandler)
        .handler(recorder.clone())
        .build();
    feature.init().await.unwrap();

    feature.accept(CounterMsg::Produce(vec![1])).unwrap();
    feature.accept(CounterMsg::Produce(vec![2])).unwrap();
    feature.accept(CounterMsg::Produce(vec![3])).unwrap();

    assert!(recorder.wait_for(3, WAIT).await);
    assert_eq!(
        recorder.effects(),
        vec![
            CounterEffect::Value(1),
            CounterEffect::Value(2),
            CounterEffect::Value(3)
        ]
    );

    // Later messages still reach every handler.
    feature.accept(CounterMsg::Increment).unwrap();
    feature.accept(CounterMsg::Produce(vec![4])).unwrap();
    assert!(recorder.wait_for(4, WAIT).await);
    assert_eq!(feature.state(), 1);

    feature.dispose().await.unwrap();
}

#[tokio::test]
async fn test_panicking_transition_poisons_feature() {
    let feature = FeatureRuntime::new(0, counter_update);
    feature.init().await.unwrap();
    feature.accept(CounterMsg::Increment).unwrap();

    let outcome = catch_unwind(AssertUnwindSafe(|| feature.accept(CounterMsg::Boom)));
    assert!(outcome.is_err());

    assert_eq!(
        feature.accept(CounterMsg::Increment),
        Err(FeatureError::Poisoned)
    );
    assert_eq!(feature.state(), 1);

    feature.dispose().await.unwrap();
}

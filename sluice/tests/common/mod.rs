#![allow(dead_code)]

use rand::Rng;
use sluice::{EffectHandler, Emitter, HandlerError, Message, Next};

// ============================================================================
// Counter Feature
// ============================================================================

#[derive(Clone, Debug, PartialEq, Message)]
pub enum CounterMsg {
    Increment,
    Decrement,
    /// Sets the counter and counts down to zero through the effect handler.
    Countdown(u32),
    /// Produces the given effects without changing the state.
    Produce(Vec<u32>),
    /// The transition function panics.
    Boom,
}

#[derive(Clone, Debug, PartialEq, Message)]
pub enum CounterEffect {
    Tick(u32),
    Value(u32),
}

pub fn counter_update(state: &i64, msg: CounterMsg) -> Next<i64, CounterEffect> {
    match msg {
        CounterMsg::Increment => Next::state(state + 1),
        CounterMsg::Decrement => Next::state(state - 1),
        CounterMsg::Countdown(n) => {
            let next = Next::state(i64::from(n));
            if n > 0 {
                next.with_effect(CounterEffect::Tick(n))
            } else {
                next
            }
        }
        CounterMsg::Produce(values) => {
            Next::effects(values.into_iter().map(CounterEffect::Value))
        }
        CounterMsg::Boom => panic!("transition defect"),
    }
}

/// Answers `Tick(n)` with `Countdown(n - 1)`.
#[derive(Clone)]
pub struct CountdownHandler;

impl EffectHandler<CounterEffect, CounterMsg> for CountdownHandler {
    async fn handle(
        &self,
        effect: CounterEffect,
        emit: Emitter<CounterMsg>,
    ) -> Result<(), HandlerError> {
        if let CounterEffect::Tick(n) = effect {
            tokio::task::yield_now().await;
            emit.emit(CounterMsg::Countdown(n - 1))
                .map_err(HandlerError::failed)?;
        }
        Ok(())
    }
}

/// Panics on `Value(1)` and fails on `Value(2)`.
#[derive(Clone)]
pub struct FaultyHandler;

impl EffectHandler<CounterEffect, CounterMsg> for FaultyHandler {
    async fn handle(
        &self,
        effect: CounterEffect,
        _emit: Emitter<CounterMsg>,
    ) -> Result<(), HandlerError> {
        match effect {
            CounterEffect::Value(1) => panic!("faulty handler"),
            CounterEffect::Value(2) => Err(HandlerError::failed("faulty handler")),
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Random Feature
// ============================================================================

#[derive(Clone, Debug, PartialEq, Message)]
pub enum RandomMsg {
    AskRandom,
    SetCounter(u32),
}

#[derive(Clone, Debug, PartialEq, Message)]
pub enum RandomEffect {
    GetRandom { min: u32, max: u32 },
}

pub fn random_update(_state: &u32, msg: RandomMsg) -> Next<u32, RandomEffect> {
    match msg {
        RandomMsg::AskRandom => Next::none().with_effect(RandomEffect::GetRandom { min: 0, max: 100 }),
        RandomMsg::SetCounter(value) => Next::state(value),
    }
}

/// Emits `SetCounter(v)` with `min <= v < max`.
#[derive(Clone)]
pub struct RandomHandler;

impl EffectHandler<RandomEffect, RandomMsg> for RandomHandler {
    async fn handle(&self, effect: RandomEffect, emit: Emitter<RandomMsg>) -> Result<(), HandlerError> {
        let RandomEffect::GetRandom { min, max } = effect;
        let value = rand::thread_rng().gen_range(min..max);
        emit.emit(RandomMsg::SetCounter(value))
            .map_err(HandlerError::failed)
    }
}

//! The `Reactor` trait.

use futures::stream::BoxStream;

use super::context::MutateContext;
use super::mutations::{self, MutationStream};
use super::state::ReactorState;
use crate::ops::Routed;

/// A UI-independent state machine driven by actions.
///
/// Only the associated types are required; every hook has a default:
/// `mutate` produces nothing, `reduce` keeps the state, `route` folds every
/// mutation and the four transforms pass their stream through.
///
/// Hooks are invoked from the tasks of one running reactor. `reduce` is
/// never called concurrently with itself.
pub trait Reactor: Send + Sync + 'static {
    /// External intent. Generally an enum.
    type Action: Send + 'static;

    /// Internal unit of change; zero or more per action.
    type Mutation: Send + 'static;

    /// Snapshot held in the reactor's state cell.
    type State: ReactorState;

    /// Fire-once notification. Use `std::convert::Infallible` for none.
    type Effect: Clone + Send + Sync + 'static;

    /// Derive mutations for an action. This is the place for async work.
    ///
    /// The returned stream is dropped, and `ctx`'s token cancelled, as soon
    /// as a newer action arrives while it is suspended. An `Err` return or
    /// an `Err` item ends this derivation without stopping the reactor.
    fn mutate(
        &self,
        _ctx: MutateContext<Self::State>,
        _action: Self::Action,
    ) -> anyhow::Result<MutationStream<Self::Mutation>> {
        Ok(mutations::empty())
    }

    /// Given the current state and a mutation, return the next state.
    ///
    /// On `Err` the state is left unchanged.
    fn reduce(
        &self,
        state: &Self::State,
        _mutation: Self::Mutation,
    ) -> anyhow::Result<Self::State> {
        Ok(state.clone())
    }

    /// Decide whether a mutation is folded or emitted as an effect.
    ///
    /// Effect mutations never reach `reduce`.
    fn route(&self, mutation: Self::Mutation) -> Routed<Self::Mutation, Self::Effect> {
        Routed::Fold(mutation)
    }

    fn transform_actions(
        &self,
        actions: BoxStream<'static, Self::Action>,
    ) -> BoxStream<'static, Self::Action> {
        actions
    }

    fn transform_mutations(
        &self,
        mutations: BoxStream<'static, Self::Mutation>,
    ) -> BoxStream<'static, Self::Mutation> {
        mutations
    }

    /// Runs on the fold output, including the initial state.
    fn transform_states(
        &self,
        states: BoxStream<'static, Self::State>,
    ) -> BoxStream<'static, Self::State> {
        states
    }

    /// Runs once per reactor on routed effects, before any subscriber
    /// sees them.
    fn transform_effects(
        &self,
        effects: BoxStream<'static, Self::Effect>,
    ) -> BoxStream<'static, Self::Effect> {
        effects
    }
}

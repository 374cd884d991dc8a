//! Reactor definition: the hooks a user implements.
//!
//! # Architecture
//!
//! ```text
//! Action ──→ mutate ──→ Mutation ──→ route ──→ reduce ──→ State
//!                                      │
//!                                      └──→ Effect
//! ```
//!
//! - **Action**: external intent, supplied by any producer
//! - **Mutation**: derived unit of change, may carry an effect
//! - **State**: immutable snapshot, replayed to late subscribers
//! - **Effect**: fire-once notification, never replayed

mod context;
mod state;
mod traits;

pub mod mutations;

pub use context::MutateContext;
pub use mutations::MutationStream;
pub use state::ReactorState;
pub use traits::Reactor;

pub(crate) use state::StateCell;

//! Unidirectional data flow state container.
//!
//! A [`Reactor`] turns a live stream of actions into a replayed stream of
//! immutable states, through a cancellable asynchronous derivation stage
//! (`mutate`) and a strictly ordered fold (`reduce`), plus a fire-once
//! effect channel.
//!
//! ```no_run
//! use flowreactor::{mutations, MutateContext, MutationStream, Reactor, ReactorHandle};
//!
//! struct Counter;
//!
//! impl Reactor for Counter {
//!     type Action = ();
//!     type Mutation = i64;
//!     type State = i64;
//!     type Effect = std::convert::Infallible;
//!
//!     fn mutate(&self, _ctx: MutateContext<i64>, _action: ()) -> anyhow::Result<MutationStream<i64>> {
//!         Ok(mutations::just(1))
//!     }
//!
//!     fn reduce(&self, state: &i64, mutation: i64) -> anyhow::Result<i64> {
//!         Ok(state + mutation)
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let handle = ReactorHandle::spawn(Counter, 0);
//! let mut states = handle.states();
//! handle.dispatch(())?;
//! assert_eq!(states.recv().await, Some(0));
//! assert_eq!(states.recv().await, Some(1));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hub;
pub mod lifecycle;
pub mod ops;
pub mod reactor;
pub mod store;

pub use config::{ConfigError, OverflowPolicy, ReactorConfig};
pub use error::DispatchError;
pub use hub::{Hub, Subscription};
pub use lifecycle::Phase;
pub use ops::Routed;
pub use reactor::{mutations, MutateContext, MutationStream, Reactor, ReactorState};
pub use store::{Dispatcher, ReactorHandle};

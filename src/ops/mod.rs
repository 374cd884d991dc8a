//! Generic stream operators the reactor pipeline is assembled from.

mod fold;
mod router;
mod switch;

pub use fold::fold;
pub use router::{route_effects, Routed};
pub use switch::{switch_latest, Derivation, SwitchLatest};

use std::any::Any;

/// Best-effort text of a caught panic payload, for logging.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return (*message).to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    "non-string panic payload".to_string()
}

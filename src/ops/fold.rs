use std::panic::{catch_unwind, AssertUnwindSafe};

use async_stream::stream;
use futures::{Stream, StreamExt};

use super::panic_message;

/// Sequential left fold emitting the seed and then one state per input.
///
/// `combine` runs one call at a time in arrival order. When it fails or
/// panics for an input, the previous state is emitted again and folding
/// continues with the next input.
pub fn fold<S, M, St, F>(seed: St, inputs: S, mut combine: F) -> impl Stream<Item = St>
where
    S: Stream<Item = M>,
    St: Clone,
    F: FnMut(&St, M) -> anyhow::Result<St>,
{
    stream! {
        let mut state = seed;
        yield state.clone();

        futures::pin_mut!(inputs);
        while let Some(input) = inputs.next().await {
            if let Some(next) = step(&mut combine, &state, input) {
                state = next;
            }
            yield state.clone();
        }
    }
}

fn step<M, St, F>(combine: &mut F, state: &St, input: M) -> Option<St>
where
    F: FnMut(&St, M) -> anyhow::Result<St>,
{
    match catch_unwind(AssertUnwindSafe(|| combine(state, input))) {
        Ok(Ok(next)) => Some(next),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Reduce failed, keeping previous state");
            None
        }
        Err(payload) => {
            tracing::warn!(
                panic = %panic_message(payload.as_ref()),
                "Reduce panicked, keeping previous state"
            );
            None
        }
    }
}

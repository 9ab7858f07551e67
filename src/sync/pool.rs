use std::future::Future;

use futures::stream::{self, StreamExt};

/// Drive every unit with at most `workers` in flight and return all outputs
/// once the last one finishes. Outputs arrive in completion order. The pool
/// lives only for the duration of the call.
pub async fn run_bounded<I, F, T>(workers: usize, units: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    stream::iter(units)
        .buffer_unordered(workers.max(1))
        .collect()
        .await
}

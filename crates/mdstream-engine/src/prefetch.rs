//! One-ahead read prefetching on a scoped worker thread.
//!
//! The worker pulls from the source iterator and hands items over a
//! bounded channel. Besides the item the consumer holds, up to `depth`
//! items wait in the channel and one more may be held by the worker while
//! it blocks in `send`. The default depth of zero is a rendezvous, so
//! peak memory is two batches: the current one and the next.
//!
//! Items arrive in source order. The first `Err` is delivered and ends
//! the stream. When the consumer returns early, the receiver is dropped,
//! the worker's next send fails, and the worker exits before
//! [`Prefetcher::run`] returns.

use std::thread;

use crossbeam_channel::bounded;

/// Runs a consumer against a source iterator read ahead on another thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prefetcher {
    depth: usize,
}

impl Default for Prefetcher {
    fn default() -> Self {
        Self { depth: 0 }
    }
}

impl Prefetcher {
    /// Buffer up to `depth` items in the channel. A depth of zero hands
    /// items over synchronously (rendezvous channel), which still reads
    /// one item ahead.
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Items buffered ahead of the consumer.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Drive `consume` with the items of `source`, read on a worker thread.
    pub fn run<I, T, E, R>(
        &self,
        source: I,
        consume: impl FnOnce(&mut dyn Iterator<Item = Result<T, E>>) -> R,
    ) -> R
    where
        I: Iterator<Item = Result<T, E>> + Send,
        T: Send,
        E: Send,
    {
        let (tx, rx) = bounded(self.depth);
        thread::scope(|scope| {
            scope.spawn(move || {
                for item in source {
                    let last = item.is_err();
                    if tx.send(item).is_err() {
                        tracing::trace!("prefetch consumer gone, stopping");
                        break;
                    }
                    if last {
                        break;
                    }
                }
            });
            let mut items = rx.into_iter();
            let result = consume(&mut items);
            drop(items);
            result
        })
    }
}

/// Drive `consume` with `source`, prefetching when `enabled`.
pub(crate) fn drive<I, T, E, R>(
    enabled: bool,
    source: I,
    consume: impl FnOnce(&mut dyn Iterator<Item = Result<T, E>>) -> R,
) -> R
where
    I: Iterator<Item = Result<T, E>> + Send,
    T: Send,
    E: Send,
{
    if enabled {
        Prefetcher::default().run(source, consume)
    } else {
        let mut source = source;
        consume(&mut source)
    }
}

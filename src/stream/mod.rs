pub(crate) mod group;
pub(crate) mod merge;

use std::{
    io,
    path::Path,
    pin::Pin,
    task::{Context, Poll},
    vec,
};

use futures_core::{ready, FusedStream, Stream};
use futures_util::StreamExt;
use log::Level;

use self::group::GroupStream;
use crate::{
    error::GroupByError,
    fs::ScratchDir,
    logging::{group_log, LogContext},
    record::{Key, Value},
};

/// Lifecycle of one invocation. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupByState {
    Ingesting,
    FastPath,
    Compacting,
    MergingFinal,
    Draining,
    Closed,
}

/// Counters collected while grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupByStats {
    /// `(key, value)` entries read from the input.
    pub entries: u64,
    /// Groups handed to the caller so far.
    pub groups: u64,
    /// Runs written while ingesting.
    pub spills: usize,
    /// Compaction passes needed to get under `max_number_of_files`.
    pub merge_stages: usize,
    /// Runs left for the final merge.
    pub runs: usize,
    /// Largest number of entries the accumulator held at once.
    pub peak_accumulated: usize,
    /// Largest number of runs read simultaneously by one merge.
    pub max_open_runs: usize,
    /// Effective spill threshold, after any memory budget was applied.
    pub max_hashmap_entries: usize,
    /// Effective merge fan-in, after any memory budget was applied.
    pub max_number_of_files: usize,
}

enum Source<K, V> {
    Memory(vec::IntoIter<(K, Vec<V>)>),
    Disk(GroupStream<K, V>),
    Exhausted,
}

/// The grouped output: one `(key, values)` item per distinct key, in
/// ascending key order.
///
/// Scratch storage is removed as soon as the stream is exhausted, fails, is
/// [closed](GroupByStream::close), or is dropped. Only `close` removes it
/// asynchronously: exhaustion, failure and drop delete the run files with a
/// blocking call on the polling thread, which can take a while when many runs
/// are left. Prefer `close` to stop early from async code.
pub struct GroupByStream<K, V> {
    source: Source<K, V>,
    scratch: Option<ScratchDir>,
    state: GroupByState,
    stats: GroupByStats,
    ctx: LogContext,
}

// never structurally pinned
impl<K, V> Unpin for GroupByStream<K, V> {}

impl<K, V> GroupByStream<K, V>
where
    K: Key,
    V: Value,
{
    pub(crate) fn memory(groups: Vec<(K, Vec<V>)>, stats: GroupByStats, ctx: LogContext) -> Self {
        GroupByStream {
            source: Source::Memory(groups.into_iter()),
            scratch: None,
            state: GroupByState::Draining,
            stats,
            ctx,
        }
    }

    pub(crate) fn disk(
        groups: GroupStream<K, V>,
        scratch: ScratchDir,
        stats: GroupByStats,
        ctx: LogContext,
    ) -> Self {
        GroupByStream {
            source: Source::Disk(groups),
            scratch: Some(scratch),
            state: GroupByState::Draining,
            stats,
            ctx,
        }
    }

    pub fn state(&self) -> GroupByState {
        self.state
    }

    pub fn stats(&self) -> &GroupByStats {
        &self.stats
    }

    /// Scratch directory of this invocation, if it ever spilled. The path is
    /// kept after removal so callers can check that it is gone.
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(ScratchDir::path)
    }

    /// Stops iteration early, releasing every open run and deleting the
    /// scratch directory. Closing twice is a no-op.
    pub async fn close(mut self) -> Result<(), GroupByError> {
        self.source = Source::Exhausted;
        let result = match self.scratch.as_mut() {
            Some(scratch) => scratch.remove().await,
            None => Ok(()),
        };
        self.transition_closed("close");

        Ok(result?)
    }

    fn shutdown(&mut self, reason: &str) -> io::Result<()> {
        // drop readers before removing their files
        self.source = Source::Exhausted;
        let result = match self.scratch.as_mut() {
            Some(scratch) => scratch.remove_blocking(),
            None => Ok(()),
        };
        self.transition_closed(reason);

        result
    }

    fn transition_closed(&mut self, reason: &str) {
        if self.state == GroupByState::Closed {
            return;
        }
        self.state = GroupByState::Closed;
        group_log!(
            Level::Info,
            ctx: self.ctx,
            "closed",
            "reason={} groups={} entries={}",
            reason,
            self.stats.groups,
            self.stats.entries
        );
    }
}

impl<K, V> Stream for GroupByStream<K, V>
where
    K: Key,
    V: Value,
{
    type Item = Result<(K, Vec<V>), GroupByError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = match &mut this.source {
            Source::Memory(groups) => groups.next().map(Ok),
            Source::Disk(groups) => ready!(groups.poll_next_unpin(cx)),
            Source::Exhausted => return Poll::Ready(None),
        };

        match polled {
            Some(Ok(group)) => {
                this.stats.groups += 1;
                Poll::Ready(Some(Ok(group)))
            }
            Some(Err(err)) => {
                group_log!(Level::Error, ctx: this.ctx, "merge_failed", "error={}", err);
                // the merge error is what the caller needs to see
                let _ = this.shutdown("error");
                Poll::Ready(Some(Err(err)))
            }
            None => match this.shutdown("exhausted") {
                Ok(()) => Poll::Ready(None),
                Err(err) => Poll::Ready(Some(Err(err.into()))),
            },
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.source {
            Source::Memory(groups) => groups.size_hint(),
            Source::Disk(_) => (0, None),
            Source::Exhausted => (0, Some(0)),
        }
    }
}

impl<K, V> FusedStream for GroupByStream<K, V>
where
    K: Key,
    V: Value,
{
    fn is_terminated(&self) -> bool {
        self.state == GroupByState::Closed
    }
}

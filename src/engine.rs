use std::{error::Error, pin::pin};

use futures_core::Stream;
use futures_util::StreamExt;
use log::Level;
use ulid::Ulid;

use crate::{
    error::GroupByError,
    inmem::accumulator::Accumulator,
    logging::{group_log, LogContext},
    option::GroupByOption,
    record::{Key, Value},
    spill::SpillManager,
    stream::{group::GroupStream, merge::MergeStream, GroupByState, GroupByStats, GroupByStream},
};

/// Groups `input` by key.
///
/// The input is read to the end before this returns. If it fits in
/// `max_hashmap_entries` entries nothing touches the disk; otherwise sorted
/// runs are spilled to a fresh directory under the scratch path, compacted
/// down to `max_number_of_files`, and merged lazily while the returned stream
/// is polled.
///
/// Groups come out in ascending key order on both paths. Values of a key keep
/// their arrival order.
pub async fn group_by<K, V, S, E>(
    input: S,
    option: GroupByOption,
) -> Result<GroupByStream<K, V>, GroupByError>
where
    K: Key,
    V: Value,
    S: Stream<Item = Result<(K, V), E>> + Send,
    E: Error + Send + Sync + 'static,
{
    let mut group_by = GroupBy::new(option)?;

    let mut input = pin!(input);
    while let Some(entry) = input.next().await {
        let ingested = match entry {
            Ok((key, value)) => group_by.offer(key, value).await,
            Err(err) => Err(GroupByError::input(err)),
        };
        if let Err(err) = ingested {
            group_by.abort(&err).await;
            return Err(err);
        }
    }

    group_by.finish().await
}

/// Stage driver of one invocation.
struct GroupBy<K, V> {
    option: GroupByOption,
    request: Ulid,
    ctx: LogContext,
    accumulator: Accumulator<K, V>,
    spill: Option<SpillManager>,
    state: GroupByState,
    stats: GroupByStats,
}

impl<K, V> GroupBy<K, V>
where
    K: Key,
    V: Value,
{
    fn new(option: GroupByOption) -> Result<Self, GroupByError> {
        option.validate()?;

        let request = Ulid::new();
        let ctx = LogContext::new(request);
        group_log!(
            Level::Info,
            ctx: ctx,
            "request_started",
            "scratch_path={} max_hashmap_entries={} max_number_of_files={} max_memory={:?}",
            option.base_path().display(),
            option.max_hashmap_entries,
            option.max_number_of_files,
            option.max_memory
        );

        Ok(GroupBy {
            accumulator: Accumulator::new(option.max_hashmap_entries),
            option,
            request,
            ctx,
            spill: None,
            state: GroupByState::Ingesting,
            stats: GroupByStats::default(),
        })
    }

    async fn offer(&mut self, key: K, value: V) -> Result<(), GroupByError> {
        if self.stats.entries == 0 {
            self.apply_memory_budget(key.size() + value.size());
        }
        if self.accumulator.is_full() {
            self.spill().await?;
        }

        self.accumulator.offer(key, value);
        self.stats.entries += 1;
        self.stats.peak_accumulated = self.stats.peak_accumulated.max(self.accumulator.len());

        Ok(())
    }

    fn apply_memory_budget(&mut self, entry_size: usize) {
        if !self.option.apply_memory_budget(entry_size) {
            return;
        }
        self.accumulator.set_capacity(self.option.max_hashmap_entries);
        group_log!(
            Level::Info,
            ctx: self.ctx,
            "memory_budget",
            "entry_size={} max_hashmap_entries={} max_number_of_files={}",
            entry_size,
            self.option.max_hashmap_entries,
            self.option.max_number_of_files
        );
    }

    async fn spill(&mut self) -> Result<(), GroupByError> {
        let groups = self.accumulator.drain_sorted();
        let spill = match &mut self.spill {
            Some(spill) => spill,
            None => {
                let spill = SpillManager::create(&self.option, self.request, self.ctx).await?;
                self.spill.insert(spill)
            }
        };
        spill.spill(&groups).await?;
        self.stats.spills += 1;

        Ok(())
    }

    async fn finish(mut self) -> Result<GroupByStream<K, V>, GroupByError> {
        group_log!(
            Level::Info,
            ctx: self.ctx,
            "ingest_finished",
            "entries={} spills={}",
            self.stats.entries,
            self.stats.spills
        );
        self.stats.max_hashmap_entries = self.option.max_hashmap_entries;
        self.stats.max_number_of_files = self.option.max_number_of_files;

        let Some(mut spill) = self.spill.take() else {
            self.transition(GroupByState::FastPath);
            let groups = self.accumulator.drain_sorted();
            self.transition(GroupByState::Draining);

            return Ok(GroupByStream::memory(groups, self.stats, self.ctx));
        };

        match self.merge(&mut spill).await {
            Ok(merge) => {
                self.stats.merge_stages = spill.merge_stages();
                self.stats.max_open_runs = spill.max_open_runs();
                self.stats.runs = spill.run_count();
                self.transition(GroupByState::Draining);

                Ok(GroupByStream::disk(
                    GroupStream::new(merge),
                    spill.into_scratch(),
                    self.stats,
                    self.ctx,
                ))
            }
            Err(err) => {
                self.spill = Some(spill);
                self.abort(&err).await;
                Err(err)
            }
        }
    }

    /// Stage 2 and the setup of stage 3.
    async fn merge(&mut self, spill: &mut SpillManager) -> Result<MergeStream<K, V>, GroupByError> {
        if !self.accumulator.is_empty() {
            spill.spill(&self.accumulator.drain_sorted()).await?;
            self.stats.spills += 1;
        }

        self.transition(GroupByState::Compacting);
        spill.compact::<K, V>(self.option.max_number_of_files).await?;

        self.transition(GroupByState::MergingFinal);
        spill.merge::<K, V>().await
    }

    /// Best-effort removal of everything spilled so far.
    async fn abort(&mut self, err: &GroupByError) {
        group_log!(
            Level::Error,
            ctx: self.ctx,
            "request_failed",
            "state={:?} error={}",
            self.state,
            err
        );
        if let Some(spill) = self.spill.take() {
            let mut scratch = spill.into_scratch();
            let _ = scratch.remove().await;
        }
        self.state = GroupByState::Closed;
    }

    fn transition(&mut self, next: GroupByState) {
        debug_assert!(next > self.state, "{:?} -> {:?}", self.state, next);
        group_log!(
            Level::Debug,
            ctx: self.ctx,
            "transition",
            "from={:?} to={:?}",
            self.state,
            next
        );
        self.state = next;
    }
}

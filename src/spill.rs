use std::{io, mem};

use futures_util::StreamExt;
use log::Level;
use ulid::Ulid;

use crate::{
    error::GroupByError,
    fs::ScratchDir,
    logging::{group_log, LogContext},
    option::GroupByOption,
    record::{Key, Value},
    run::{Run, RunWriter},
    stream::merge::MergeStream,
};

/// Owns the scratch directory of one invocation and the runs living in it.
///
/// `runs` is kept in creation order: the merge tie-break relies on it to
/// replay values of a key in arrival order.
pub(crate) struct SpillManager {
    scratch: ScratchDir,
    runs: Vec<Run>,
    read_buffer_size: usize,
    write_buffer_size: usize,
    merge_stages: usize,
    max_open_runs: usize,
    ctx: LogContext,
}

impl SpillManager {
    pub(crate) async fn create(
        option: &GroupByOption,
        request: Ulid,
        ctx: LogContext,
    ) -> io::Result<Self> {
        let scratch = ScratchDir::create(option.base_path(), request).await?;

        Ok(SpillManager {
            scratch,
            runs: Vec::new(),
            read_buffer_size: option.read_buffer_size,
            write_buffer_size: option.write_buffer_size,
            merge_stages: 0,
            max_open_runs: 0,
            ctx,
        })
    }

    pub(crate) fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub(crate) fn merge_stages(&self) -> usize {
        self.merge_stages
    }

    pub(crate) fn max_open_runs(&self) -> usize {
        self.max_open_runs
    }

    /// Writes already sorted groups as one new run.
    pub(crate) async fn spill<K, V>(&mut self, groups: &[(K, Vec<V>)]) -> Result<(), GroupByError>
    where
        K: Key,
        V: Value,
    {
        let mut writer = RunWriter::create(&self.scratch, self.write_buffer_size).await?;
        for (key, values) in groups {
            if let Err(err) = writer.write_group(key, values).await {
                let _ = writer.abort().await;
                return Err(err);
            }
        }
        let run = writer.finish().await?;

        group_log!(
            Level::Debug,
            ctx: self.ctx,
            "spill",
            "run={} keys={} entries={}",
            run.id(),
            groups.len(),
            run.entries()
        );
        self.runs.push(run);

        Ok(())
    }

    /// Merges runs, at most `max_number_of_files` at a time, until no more
    /// than `max_number_of_files` remain.
    ///
    /// Each pass replaces every chunk of consecutive runs by its merge, in
    /// place, so run order keeps following arrival order.
    pub(crate) async fn compact<K, V>(
        &mut self,
        max_number_of_files: usize,
    ) -> Result<(), GroupByError>
    where
        K: Key,
        V: Value,
    {
        debug_assert!(max_number_of_files >= 2);

        while self.runs.len() > max_number_of_files {
            let before = self.runs.len();
            let mut pending = mem::take(&mut self.runs).into_iter();
            let mut compacted = Vec::with_capacity(before.div_ceil(max_number_of_files));

            loop {
                let chunk = pending
                    .by_ref()
                    .take(max_number_of_files)
                    .collect::<Vec<_>>();
                if chunk.len() <= 1 {
                    compacted.extend(chunk);
                    break;
                }

                match self.merge_runs::<K, V>(&chunk).await {
                    Ok(run) => {
                        for input in chunk {
                            input.remove().await?;
                        }
                        compacted.push(run);
                    }
                    Err(err) => {
                        self.runs = compacted.into_iter().chain(chunk).chain(pending).collect();
                        return Err(err);
                    }
                }
            }

            self.runs = compacted;
            self.merge_stages += 1;
            group_log!(
                Level::Info,
                ctx: self.ctx,
                "compaction_stage",
                "stage={} runs_before={} runs_after={}",
                self.merge_stages,
                before,
                self.runs.len()
            );
        }

        Ok(())
    }

    /// Opens the final merge over every remaining run.
    pub(crate) async fn merge<K, V>(&mut self) -> Result<MergeStream<K, V>, GroupByError>
    where
        K: Key,
        V: Value,
    {
        self.max_open_runs = self.max_open_runs.max(self.runs.len());
        group_log!(
            Level::Info,
            ctx: self.ctx,
            "final_merge",
            "runs={} entries={}",
            self.runs.len(),
            self.runs.iter().map(Run::entries).sum::<u64>()
        );

        MergeStream::from_runs(&self.runs, self.read_buffer_size).await
    }

    pub(crate) fn into_scratch(self) -> ScratchDir {
        self.scratch
    }

    async fn merge_runs<K, V>(&mut self, runs: &[Run]) -> Result<Run, GroupByError>
    where
        K: Key,
        V: Value,
    {
        self.max_open_runs = self.max_open_runs.max(runs.len());

        let mut merge = MergeStream::<K, V>::from_runs(runs, self.read_buffer_size).await?;
        let open_runs = merge.open_runs();
        let mut writer = RunWriter::create(&self.scratch, self.write_buffer_size).await?;

        while let Some(entry) = merge.next().await {
            let written = match entry {
                Ok((key, value)) => writer.write(&key, &value).await,
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                let _ = writer.abort().await;
                return Err(err);
            }
        }
        drop(merge);
        let run = writer.finish().await?;

        group_log!(
            Level::Debug,
            ctx: self.ctx,
            "merge_runs",
            "inputs={} non_empty={} run={} entries={}",
            runs.len(),
            open_runs,
            run.id(),
            run.entries()
        );
        Ok(run)
    }
}

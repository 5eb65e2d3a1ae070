use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::{ready, Stream};
use futures_util::stream::StreamExt;
use pin_project_lite::pin_project;

use crate::{
    error::GroupByError,
    record::{Key, Value},
    run::{Run, RunStream},
};

pin_project! {
    /// Ascending k-way merge over several runs.
    ///
    /// Entries with equal keys come out in the order of the runs they were
    /// read from, so the position of a run in the input vector decides the
    /// arrival order of its values.
    pub(crate) struct MergeStream<K, V> {
        streams: Vec<Option<RunStream<K, V>>>,
        peeked: BinaryHeap<CmpEntry<K, V>>,
    }
}

impl<K, V> MergeStream<K, V>
where
    K: Key,
    V: Value,
{
    pub(crate) async fn from_vec(streams: Vec<RunStream<K, V>>) -> Result<Self, GroupByError> {
        let mut peeked = BinaryHeap::with_capacity(streams.len());
        let mut slots = Vec::with_capacity(streams.len());

        for (offset, mut stream) in streams.into_iter().enumerate() {
            match stream.next().await {
                Some(entry) => {
                    let (key, value) = entry?;
                    peeked.push(CmpEntry::new(offset, key, value));
                    slots.push(Some(stream));
                }
                None => slots.push(None),
            }
        }

        Ok(Self {
            streams: slots,
            peeked,
        })
    }

    pub(crate) async fn from_runs(runs: &[Run], buffer_size: usize) -> Result<Self, GroupByError> {
        let mut streams = Vec::with_capacity(runs.len());
        for run in runs {
            streams.push(run.open(buffer_size).await?);
        }
        Self::from_vec(streams).await
    }

    /// Runs whose file handle is still held.
    pub(crate) fn open_runs(&self) -> usize {
        self.streams.iter().filter(|stream| stream.is_some()).count()
    }
}

impl<K, V> Stream for MergeStream<K, V>
where
    K: Key,
    V: Value,
{
    type Item = Result<(K, V), GroupByError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let Some(offset) = this.peeked.peek().map(|entry| entry.offset) else {
            return Poll::Ready(None);
        };
        let next = match this.streams[offset].as_mut() {
            Some(stream) => ready!(stream.as_mut().poll_next(cx)),
            None => None,
        };
        let next = match next.transpose() {
            Ok(next) => next,
            Err(err) => return Poll::Ready(Some(Err(err))),
        };
        let Some(peeked) = this.peeked.pop() else {
            return Poll::Ready(None);
        };
        match next {
            Some((key, value)) => this.peeked.push(CmpEntry::new(offset, key, value)),
            // exhausted: release the file handle
            None => this.streams[offset] = None,
        }

        Poll::Ready(Some(Ok((peeked.key, peeked.value))))
    }
}

struct CmpEntry<K, V> {
    offset: usize,
    key: K,
    value: V,
}

impl<K, V> CmpEntry<K, V> {
    fn new(offset: usize, key: K, value: V) -> Self {
        Self { offset, key, value }
    }
}

impl<K: Ord, V> PartialEq for CmpEntry<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord, V> Eq for CmpEntry<K, V> {}

impl<K: Ord, V> PartialOrd for CmpEntry<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V> Ord for CmpEntry<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then(self.offset.cmp(&other.offset))
            .reverse()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{stream, StreamExt, TryStreamExt};
    use tempfile::TempDir;
    use ulid::Ulid;

    use super::MergeStream;
    use crate::{
        error::GroupByError,
        fs::ScratchDir,
        run::{Run, RunStream, RunWriter},
    };

    fn memory_run(entries: Vec<(u64, u64)>) -> RunStream<u64, u64> {
        Box::pin(stream::iter(entries.into_iter().map(Ok::<_, GroupByError>)))
    }

    async fn disk_run(scratch: &ScratchDir, entries: &[(u64, u64)]) -> Run {
        let mut writer = RunWriter::create(scratch, 64).await.unwrap();
        for (key, value) in entries {
            writer.write(key, value).await.unwrap();
        }
        writer.finish().await.unwrap()
    }

    #[tokio::test]
    async fn test_merge_ascending() {
        let merge = MergeStream::from_vec(vec![
            memory_run(vec![(1, 10), (4, 40), (9, 90)]),
            memory_run(vec![(2, 20), (3, 30)]),
            memory_run(vec![]),
            memory_run(vec![(5, 50)]),
        ])
        .await
        .unwrap();

        let keys = merge
            .map_ok(|(key, _)| key)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(keys, vec![1, 2, 3, 4, 5, 9]);
    }

    #[tokio::test]
    async fn test_merge_equal_keys_follow_run_order() {
        let merge = MergeStream::from_vec(vec![
            memory_run(vec![(1, 0), (1, 1), (7, 2)]),
            memory_run(vec![(1, 3), (7, 4)]),
            memory_run(vec![(0, 5), (1, 6)]),
        ])
        .await
        .unwrap();

        let entries = merge.try_collect::<Vec<_>>().await.unwrap();
        assert_eq!(
            entries,
            vec![(0, 5), (1, 0), (1, 1), (1, 3), (1, 6), (7, 2), (7, 4)]
        );
    }

    #[tokio::test]
    async fn test_merge_releases_exhausted_runs() {
        let temp_dir = TempDir::new().unwrap();
        let scratch = ScratchDir::create(temp_dir.path(), Ulid::new())
            .await
            .unwrap();

        let runs = vec![
            disk_run(&scratch, &[(1, 1)]).await,
            disk_run(&scratch, &[(2, 2), (3, 3)]).await,
        ];
        let mut merge = MergeStream::<u64, u64>::from_runs(&runs, 64).await.unwrap();
        assert_eq!(merge.open_runs(), 2);

        assert_eq!(merge.next().await.unwrap().unwrap(), (1, 1));
        assert_eq!(merge.open_runs(), 1);
        assert_eq!(merge.next().await.unwrap().unwrap(), (2, 2));
        assert_eq!(merge.next().await.unwrap().unwrap(), (3, 3));
        assert_eq!(merge.open_runs(), 0);
        assert!(merge.next().await.is_none());
    }
}

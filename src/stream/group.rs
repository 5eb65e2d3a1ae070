use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::{ready, Stream};
use pin_project_lite::pin_project;

use super::merge::MergeStream;
use crate::{
    error::GroupByError,
    record::{Key, Value},
};

pin_project! {
    /// Folds consecutive entries with equal keys of an ascending merge into
    /// one `(key, values)` group.
    pub(crate) struct GroupStream<K, V> {
        #[pin]
        merge: MergeStream<K, V>,
        current: Option<(K, Vec<V>)>,
    }
}

impl<K, V> GroupStream<K, V> {
    pub(crate) fn new(merge: MergeStream<K, V>) -> Self {
        Self {
            merge,
            current: None,
        }
    }
}

impl<K, V> Stream for GroupStream<K, V>
where
    K: Key,
    V: Value,
{
    type Item = Result<(K, Vec<V>), GroupByError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match ready!(this.merge.as_mut().poll_next(cx)) {
                Some(Ok((key, value))) => {
                    if let Some((current, values)) = this.current.as_mut() {
                        if *current == key {
                            values.push(value);
                            continue;
                        }
                    }
                    if let Some(group) = this.current.replace((key, vec![value])) {
                        return Poll::Ready(Some(Ok(group)));
                    }
                }
                Some(Err(err)) => return Poll::Ready(Some(Err(err))),
                None => return Poll::Ready(this.current.take().map(Ok)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{stream, TryStreamExt};

    use super::GroupStream;
    use crate::{error::GroupByError, run::RunStream, stream::merge::MergeStream};

    fn memory_run(entries: Vec<(u64, &'static str)>) -> RunStream<u64, String> {
        Box::pin(stream::iter(
            entries
                .into_iter()
                .map(|(key, value)| Ok::<_, GroupByError>((key, value.to_string()))),
        ))
    }

    #[tokio::test]
    async fn test_group_split_keys() {
        let merge = MergeStream::from_vec(vec![
            memory_run(vec![(1, "3"), (4, "1")]),
            memory_run(vec![(1, "2"), (4, "4")]),
            memory_run(vec![(100, "1")]),
        ])
        .await
        .unwrap();

        let groups = GroupStream::new(merge)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();
        assert_eq!(
            groups,
            vec![
                (1, vec!["3".to_string(), "2".to_string()]),
                (4, vec!["1".to_string(), "4".to_string()]),
                (100, vec!["1".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_group_empty() {
        let merge = MergeStream::from_vec(vec![memory_run(vec![])]).await.unwrap();
        let groups = GroupStream::new(merge)
            .try_collect::<Vec<_>>()
            .await
            .unwrap();

        assert!(groups.is_empty());
    }
}

use std::pin::Pin;

use async_stream::try_stream;
use futures_core::Stream;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncReadExt, BufReader},
};

use super::{Run, END_TAG, ENTRY_TAG};
use crate::{
    error::GroupByError,
    fs::{checksum::HashReader, RunId},
    record::{Key, Value},
};

/// Lazily decoded entries of one run. Dropping the stream closes the file.
pub(crate) type RunStream<K, V> =
    Pin<Box<dyn Stream<Item = Result<(K, V), GroupByError>> + Send>>;

impl Run {
    /// Opens the run from its first entry.
    pub(crate) async fn open<K, V>(&self, buffer_size: usize) -> Result<RunStream<K, V>, GroupByError>
    where
        K: Key,
        V: Value,
    {
        let file = File::open(&self.path).await?;
        let reader = HashReader::new(BufReader::with_capacity(buffer_size, file));

        Ok(Box::pin(read_entries(self.id, reader)))
    }
}

fn read_entries<K, V, R>(
    id: RunId,
    mut reader: HashReader<R>,
) -> impl Stream<Item = Result<(K, V), GroupByError>> + Send
where
    K: Key,
    V: Value,
    R: AsyncRead + Unpin + Send + 'static,
{
    try_stream! {
        let mut last: Option<K> = None;
        let mut entries = 0_u64;

        loop {
            match reader.read_u8().await? {
                ENTRY_TAG => {
                    let key = K::decode(&mut reader).await.map_err(GroupByError::decode)?;
                    let value = V::decode(&mut reader).await.map_err(GroupByError::decode)?;

                    check_order(id, last.as_ref(), &key)?;
                    entries += 1;
                    last = Some(key.clone());

                    yield (key, value);
                }
                END_TAG => {
                    let recorded = reader.read_u64_le().await?;
                    let computed = reader.checksum();
                    let stored = reader.read_u32_le().await?;

                    check_trailer(id, (recorded, entries), (stored, computed))?;
                    break;
                }
                tag => unknown_tag(id, tag)?,
            }
        }
    }
}

fn check_order<K: Key>(id: RunId, last: Option<&K>, key: &K) -> Result<(), GroupByError> {
    match last {
        Some(last) if key < last => Err(GroupByError::consistency(
            id,
            format!("key {:?} follows greater key {:?}", key, last),
        )),
        _ => Ok(()),
    }
}

fn check_trailer(
    id: RunId,
    (recorded, read): (u64, u64),
    (stored, computed): (u32, u32),
) -> Result<(), GroupByError> {
    if recorded != read {
        return Err(GroupByError::consistency(
            id,
            format!("trailer records {recorded} entries, read {read}"),
        ));
    }
    if stored != computed {
        return Err(GroupByError::consistency(
            id,
            format!("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"),
        ));
    }
    Ok(())
}

fn unknown_tag(id: RunId, tag: u8) -> Result<(), GroupByError> {
    Err(GroupByError::consistency(id, format!("unknown record tag {tag}")))
}

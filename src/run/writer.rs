use std::{io, path::PathBuf};

use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncWriteExt, BufWriter},
};
use ulid::Ulid;

use super::{Run, END_TAG, ENTRY_TAG};
use crate::{
    error::GroupByError,
    fs::{checksum::HashWriter, RunId, ScratchDir},
    serdes::Encode,
};

/// Appends entries to a new run file.
///
/// Callers are responsible for writing keys in ascending order; the reader
/// rejects runs that are not.
pub(crate) struct RunWriter {
    id: RunId,
    path: PathBuf,
    writer: HashWriter<BufWriter<File>>,
    entries: u64,
}

impl RunWriter {
    pub(crate) async fn create(scratch: &ScratchDir, buffer_size: usize) -> io::Result<Self> {
        let id = Ulid::new();
        let path = scratch.run_path(&id);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        Ok(RunWriter {
            id,
            path,
            writer: HashWriter::new(BufWriter::with_capacity(buffer_size, file)),
            entries: 0,
        })
    }

    pub(crate) async fn write<K, V>(&mut self, key: &K, value: &V) -> Result<(), GroupByError>
    where
        K: Encode + Sync,
        V: Encode + Sync,
    {
        self.writer.write_u8(ENTRY_TAG).await?;
        key.encode(&mut self.writer)
            .await
            .map_err(GroupByError::encode)?;
        value
            .encode(&mut self.writer)
            .await
            .map_err(GroupByError::encode)?;
        self.entries += 1;

        Ok(())
    }

    pub(crate) async fn write_group<K, V>(
        &mut self,
        key: &K,
        values: &[V],
    ) -> Result<(), GroupByError>
    where
        K: Encode + Sync,
        V: Encode + Sync,
    {
        for value in values {
            self.write(key, value).await?;
        }
        Ok(())
    }

    /// Writes the trailer and makes the file durable. A run that fails to seal
    /// is removed.
    pub(crate) async fn finish(mut self) -> Result<Run, GroupByError> {
        if let Err(err) = self.seal().await {
            let _ = self.abort().await;
            return Err(err.into());
        }

        Ok(Run {
            id: self.id,
            path: self.path,
            entries: self.entries,
        })
    }

    async fn seal(&mut self) -> io::Result<()> {
        self.writer.write_u8(END_TAG).await?;
        self.writer.write_u64_le(self.entries).await?;
        let checksum = self.writer.checksum();
        self.writer.write_u32_le(checksum).await?;
        self.writer.flush().await?;
        self.writer.inner().get_ref().sync_data().await
    }

    /// Discards a partially written run.
    pub(crate) async fn abort(self) -> io::Result<()> {
        let RunWriter { path, writer, .. } = self;
        drop(writer);

        match tokio::fs::remove_file(&path).await {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}

use std::{io, mem::size_of};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::serdes::{Decode, Encode};

impl Encode for Bytes {
    type Error = io::Error;

    async fn encode<W>(&self, writer: &mut W) -> Result<(), Self::Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let len = u32::try_from(self.len())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        writer.write_u32_le(len).await?;
        writer.write_all(self).await
    }

    fn size(&self) -> usize {
        size_of::<u32>() + self.len()
    }
}

impl Decode for Bytes {
    type Error = io::Error;

    async fn decode<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let len = reader.read_u32_le().await? as usize;
        let mut buf = vec![0; len];
        reader.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }
}

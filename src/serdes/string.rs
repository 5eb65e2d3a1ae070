use std::{io, mem::size_of};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Decode, Encode};

impl Encode for &str {
    type Error = io::Error;

    async fn encode<W>(&self, writer: &mut W) -> Result<(), Self::Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let len = u32::try_from(self.len())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        writer.write_u32_le(len).await?;
        writer.write_all(self.as_bytes()).await
    }

    fn size(&self) -> usize {
        size_of::<u32>() + self.len()
    }
}

impl Encode for String {
    type Error = io::Error;

    async fn encode<W>(&self, writer: &mut W) -> Result<(), Self::Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        self.as_str().encode(writer).await
    }

    fn size(&self) -> usize {
        self.as_str().size()
    }
}

impl Decode for String {
    type Error = io::Error;

    async fn decode<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let len = reader.read_u32_le().await? as usize;
        let mut buf = vec![0; len];
        reader.read_exact(&mut buf).await?;

        String::from_utf8(buf).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}

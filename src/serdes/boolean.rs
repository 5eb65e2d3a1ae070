use std::{io, mem::size_of};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::serdes::{Decode, Encode};

impl Encode for bool {
    type Error = io::Error;

    async fn encode<W>(&self, writer: &mut W) -> Result<(), Self::Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_u8(u8::from(*self)).await
    }

    fn size(&self) -> usize {
        size_of::<u8>()
    }
}

impl Decode for bool {
    type Error = io::Error;

    async fn decode<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        match reader.read_u8().await? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid bool tag: {tag}"),
            )),
        }
    }
}

use std::{io, mem::size_of};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::serdes::{Decode, Encode};

impl Encode for Vec<u8> {
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

impl Decode for Vec<u8> {
    type Error = io::Error;

    async fn decode<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        let len = reader.read_u32_le().await? as usize;
        let mut items = vec![0; len];
        reader.read_exact(&mut items).await?;

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::serdes::{Decode, Encode};

    #[tokio::test]
    async fn test_u8_encode_decode() {
        let source = b"hello! spill".to_vec();

        let mut bytes = Vec::new();
        source.encode(&mut bytes).await.unwrap();
        Vec::<u8>::new().encode(&mut bytes).await.unwrap();

        let mut cursor = Cursor::new(bytes);
        assert_eq!(Vec::<u8>::decode(&mut cursor).await.unwrap(), source);
        assert!(Vec::<u8>::decode(&mut cursor).await.unwrap().is_empty());
    }
}

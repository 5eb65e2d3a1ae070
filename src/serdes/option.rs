use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Decode, Encode};

#[derive(Debug, Error)]
pub enum EncodeError<E>
where
    E: std::error::Error,
{
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("inner error: {0}")]
    Inner(#[source] E),
}

#[derive(Debug, Error)]
pub enum DecodeError<E>
where
    E: std::error::Error,
{
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid option tag: {0}")]
    Tag(u8),
    #[error("inner error: {0}")]
    Inner(#[source] E),
}

impl<V> Encode for Option<V>
where
    V: Encode + Sync,
{
    type Error = EncodeError<V::Error>;

    async fn encode<W>(&self, writer: &mut W) -> Result<(), Self::Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self {
            None => writer.write_u8(0).await?,
            Some(v) => {
                writer.write_u8(1).await?;
                v.encode(writer).await.map_err(EncodeError::Inner)?;
            }
        }
        Ok(())
    }

    fn size(&self) -> usize {
        match self {
            None => 1,
            Some(v) => 1 + v.size(),
        }
    }
}

impl<V> Decode for Option<V>
where
    V: Decode + Send,
{
    type Error = DecodeError<V::Error>;

    async fn decode<R>(reader: &mut R) -> Result<Self, Self::Error>
    where
        R: AsyncRead + Unpin + Send,
    {
        match reader.read_u8().await? {
            0 => Ok(None),
            1 => Ok(Some(V::decode(reader).await.map_err(DecodeError::Inner)?)),
            tag => Err(DecodeError::Tag(tag)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::DecodeError;
    use crate::serdes::{Decode, Encode};

    #[tokio::test]
    async fn test_encode_decode() {
        let source_0 = Some(1_u64);
        let source_1: Option<u64> = None;
        let source_2 = Some("Hello! spill".to_string());

        let mut bytes = Vec::new();
        source_0.encode(&mut bytes).await.unwrap();
        source_1.encode(&mut bytes).await.unwrap();
        source_2.encode(&mut bytes).await.unwrap();

        let mut cursor = Cursor::new(bytes);
        assert_eq!(Option::<u64>::decode(&mut cursor).await.unwrap(), source_0);
        assert_eq!(Option::<u64>::decode(&mut cursor).await.unwrap(), source_1);
        assert_eq!(Option::<String>::decode(&mut cursor).await.unwrap(), source_2);
    }

    #[tokio::test]
    async fn test_invalid_tag() {
        let err = Option::<u64>::decode(&mut Cursor::new(vec![7_u8]))
            .await
            .unwrap_err();

        assert!(matches!(err, DecodeError::Tag(7)));
    }
}

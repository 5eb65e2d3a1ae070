use std::{
    io,
    pin::Pin,
    task::{ready, Context, Poll},
};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Writer that folds every byte it forwards into a crc32.
pub(crate) struct HashWriter<W> {
    hasher: crc32fast::Hasher,
    writer: W,
}

impl<W: AsyncWrite + Unpin> HashWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
            writer,
        }
    }

    pub(crate) fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    pub(crate) fn inner(&self) -> &W {
        &self.writer
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for HashWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let written = ready!(Pin::new(&mut this.writer).poll_write(cx, buf))?;
        this.hasher.update(&buf[..written]);

        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().writer).poll_shutdown(cx)
    }
}

/// Reader that folds every byte it hands out into a crc32.
pub(crate) struct HashReader<R> {
    hasher: crc32fast::Hasher,
    reader: R,
}

impl<R: AsyncRead + Unpin> HashReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            hasher: crc32fast::Hasher::new(),
            reader,
        }
    }

    pub(crate) fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for HashReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let filled = buf.filled().len();
        ready!(Pin::new(&mut this.reader).poll_read(cx, buf))?;
        this.hasher.update(&buf.filled()[filled..]);

        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::{HashReader, HashWriter};

    #[tokio::test]
    async fn test_encode_decode() {
        let mut bytes = Vec::new();

        let mut writer = HashWriter::new(&mut bytes);
        writer.write_u64_le(4).await.unwrap();
        writer.write_u32_le(3).await.unwrap();
        writer.write_all(b"spill").await.unwrap();
        let written = writer.checksum();

        let mut reader = HashReader::new(Cursor::new(bytes.clone()));
        assert_eq!(reader.read_u64_le().await.unwrap(), 4);
        assert_eq!(reader.read_u32_le().await.unwrap(), 3);
        let mut tail = [0; 5];
        reader.read_exact(&mut tail).await.unwrap();

        assert_eq!(&tail, b"spill");
        assert_eq!(reader.checksum(), written);
        assert_eq!(written, crc32fast::hash(&bytes));
    }
}

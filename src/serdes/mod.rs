//! Byte-level encoding used for run files.
//!
//! Keys and values spilled to disk go through these traits. Every
//! implementation writes a self-delimiting representation, so a reader can
//! decode records back to back without an index.

mod boolean;
#[cfg(feature = "type_bytes")]
mod bytes;
mod num;
pub mod option;
mod string;
mod vec;

use std::{future::Future, io};

use tokio::io::{AsyncRead, AsyncWrite};

pub trait Encode {
    type Error: From<io::Error> + std::error::Error + Send + Sync + 'static;

    fn encode<W>(&self, writer: &mut W) -> impl Future<Output = Result<(), Self::Error>> + Send
    where
        W: AsyncWrite + Unpin + Send;

    /// Number of bytes `encode` writes for this value.
    fn size(&self) -> usize;
}

impl<T: Encode + Sync> Encode for &T {
    type Error = T::Error;

    async fn encode<W>(&self, writer: &mut W) -> Result<(), Self::Error>
    where
        W: AsyncWrite + Unpin + Send,
    {
        Encode::encode(*self, writer).await
    }

    fn size(&self) -> usize {
        Encode::size(*self)
    }
}

pub trait Decode: Sized {
    type Error: From<io::Error> + std::error::Error + Send + Sync + 'static;

    fn decode<R>(reader: &mut R) -> impl Future<Output = Result<Self, Self::Error>> + Send
    where
        R: AsyncRead + Unpin + Send;
}

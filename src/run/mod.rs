//! Immutable, key-sorted run files.
//!
//! A run is a flat sequence of records followed by a trailer:
//!
//! ```text
//! repeat: 0x01 | key | value
//! then:   0x00 | entry count (u64 le) | crc32 of every preceding byte (u32 le)
//! ```
//!
//! A key holding several values is written as repeated records, so merging
//! only ever deals with single `(key, value)` entries.

mod reader;
mod writer;

use std::{io, path::PathBuf};

pub(crate) use reader::RunStream;
pub(crate) use writer::RunWriter;

use crate::fs::RunId;

const ENTRY_TAG: u8 = 1;
const END_TAG: u8 = 0;

/// Handle to a finished run file.
#[derive(Debug, Clone)]
pub(crate) struct Run {
    id: RunId,
    path: PathBuf,
    entries: u64,
}

impl Run {
    pub(crate) fn id(&self) -> RunId {
        self.id
    }

    pub(crate) fn entries(&self) -> u64 {
        self.entries
    }

    pub(crate) async fn remove(self) -> io::Result<()> {
        tokio::fs::remove_file(&self.path).await
    }
}

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
/// Upper bound for the merge fan-in derived from a memory budget.
pub(crate) const MAX_DERIVED_NUMBER_OF_FILES: usize = 1000;

/// Configuration of one group-by invocation.
#[derive(Debug, Clone)]
pub struct GroupByOption {
    pub(crate) scratch_path: PathBuf,
    pub(crate) max_hashmap_entries: usize,
    pub(crate) max_number_of_files: usize,
    pub(crate) max_memory: Option<usize>,
    pub(crate) read_buffer_size: usize,
    pub(crate) write_buffer_size: usize,
}

impl<P> From<P> for GroupByOption
where
    P: Into<PathBuf>,
{
    fn from(path: P) -> Self {
        GroupByOption {
            scratch_path: path.into(),
            max_hashmap_entries: 10_000_000,
            max_number_of_files: 1000,
            max_memory: None,
            read_buffer_size: DEFAULT_BUFFER_SIZE,
            write_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl Default for GroupByOption {
    fn default() -> Self {
        GroupByOption::from(std::env::temp_dir())
    }
}

impl GroupByOption {
    /// Base directory under which each invocation creates its own scratch
    /// directory.
    pub fn scratch_path(self, scratch_path: impl Into<PathBuf>) -> Self {
        GroupByOption {
            scratch_path: scratch_path.into(),
            ..self
        }
    }

    /// Number of `(key, value)` entries held in memory before spilling a run.
    pub fn max_hashmap_entries(self, max_hashmap_entries: usize) -> Self {
        GroupByOption {
            max_hashmap_entries,
            ..self
        }
    }

    /// Maximum number of runs merged at once, and left on disk before the
    /// final merge.
    pub fn max_number_of_files(self, max_number_of_files: usize) -> Self {
        GroupByOption {
            max_number_of_files,
            ..self
        }
    }

    /// Memory budget in bytes. When set, both thresholds are derived from the
    /// encoded size of the first entry and the explicit values are ignored.
    pub fn max_memory(self, max_memory: usize) -> Self {
        GroupByOption {
            max_memory: Some(max_memory),
            ..self
        }
    }

    pub fn read_buffer_size(self, read_buffer_size: usize) -> Self {
        GroupByOption {
            read_buffer_size,
            ..self
        }
    }

    pub fn write_buffer_size(self, write_buffer_size: usize) -> Self {
        GroupByOption {
            write_buffer_size,
            ..self
        }
    }
}

impl GroupByOption {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hashmap_entries == 0 {
            return Err(ConfigError::MaxHashmapEntries(self.max_hashmap_entries));
        }
        if self.max_number_of_files < 2 {
            return Err(ConfigError::MaxNumberOfFiles(self.max_number_of_files));
        }
        if self.max_memory == Some(0) {
            return Err(ConfigError::MaxMemory);
        }
        if self.read_buffer_size == 0 {
            return Err(ConfigError::BufferSize { name: "read" });
        }
        if self.write_buffer_size == 0 {
            return Err(ConfigError::BufferSize { name: "write" });
        }
        Ok(())
    }

    pub(crate) fn base_path(&self) -> &Path {
        &self.scratch_path
    }

    /// Rewrites both thresholds from the memory budget, given the encoded size
    /// of one entry. Returns `false` when no budget is configured.
    pub(crate) fn apply_memory_budget(&mut self, entry_size: usize) -> bool {
        let Some(max_memory) = self.max_memory else {
            return false;
        };
        let budget = max_memory / entry_size.max(1);

        self.max_hashmap_entries = budget.max(1);
        self.max_number_of_files = budget.clamp(2, MAX_DERIVED_NUMBER_OF_FILES);
        true
    }
}

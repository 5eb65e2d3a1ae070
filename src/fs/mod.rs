//! Scratch storage of one group-by invocation.

pub(crate) mod checksum;

use std::{
    fmt::{Display, Formatter},
    io,
    path::{Path, PathBuf},
};

use log::Level;
use ulid::Ulid;

use crate::logging::{group_log, LogContext};

pub type RunId = Ulid;

pub(crate) enum FileType {
    Run,
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Run => write!(f, "run"),
        }
    }
}

/// Uniquely named directory holding the live runs of one invocation.
///
/// Removal happens once: either through [`ScratchDir::remove`] or, as a last
/// resort, when the value is dropped.
#[derive(Debug)]
pub(crate) struct ScratchDir {
    path: PathBuf,
    ctx: LogContext,
    removed: bool,
}

impl ScratchDir {
    pub(crate) async fn create(base: &Path, request: Ulid) -> io::Result<Self> {
        tokio::fs::create_dir_all(base).await?;

        let mut attempt = 0_usize;
        loop {
            let name = if attempt == 0 {
                format!("groupby-{request}")
            } else {
                format!("groupby-{request}-{attempt}")
            };
            let path = base.join(name);

            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    let ctx = LogContext::new(request);
                    group_log!(
                        Level::Debug,
                        ctx: ctx,
                        "scratch_created",
                        "path={}",
                        path.display()
                    );
                    return Ok(ScratchDir {
                        path,
                        ctx,
                        removed: false,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn run_path(&self, id: &RunId) -> PathBuf {
        self.path.join(format!("{}.{}", id, FileType::Run))
    }

    pub(crate) async fn remove(&mut self) -> io::Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        let result = ignore_not_found(tokio::fs::remove_dir_all(&self.path).await);
        self.log_removed(&result);
        result
    }

    /// Synchronous removal for contexts that cannot await, such as
    /// `Stream::poll_next`.
    pub(crate) fn remove_blocking(&mut self) -> io::Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        let result = ignore_not_found(std::fs::remove_dir_all(&self.path));
        self.log_removed(&result);
        result
    }

    fn log_removed(&self, result: &io::Result<()>) {
        match result {
            Ok(()) => group_log!(
                Level::Debug,
                ctx: self.ctx,
                "scratch_removed",
                "path={}",
                self.path.display()
            ),
            Err(err) => group_log!(
                Level::Warn,
                ctx: self.ctx,
                "scratch_remove_failed",
                "path={} error={}",
                self.path.display(),
                err
            ),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = self.remove_blocking();
    }
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use ulid::Ulid;

    use super::ScratchDir;

    #[tokio::test]
    async fn test_create_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let request = Ulid::new();

        let mut scratch = ScratchDir::create(temp_dir.path(), request).await.unwrap();
        assert!(scratch.path().is_dir());
        assert!(scratch
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with(&request.to_string()));

        let run_id = Ulid::new();
        let run_path = scratch.run_path(&run_id);
        tokio::fs::write(&run_path, b"run").await.unwrap();
        assert_eq!(run_path.extension().unwrap(), "run");

        scratch.remove().await.unwrap();
        assert!(!scratch.path().exists());
        // idempotent
        scratch.remove().await.unwrap();
        scratch.remove_blocking().unwrap();
    }

    #[tokio::test]
    async fn test_same_request_gets_distinct_directories() {
        let temp_dir = TempDir::new().unwrap();
        let request = Ulid::new();

        let first = ScratchDir::create(temp_dir.path(), request).await.unwrap();
        let second = ScratchDir::create(temp_dir.path(), request).await.unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[tokio::test]
    async fn test_drop_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = {
            let scratch = ScratchDir::create(temp_dir.path(), Ulid::new())
                .await
                .unwrap();
            tokio::fs::write(scratch.run_path(&Ulid::new()), b"run")
                .await
                .unwrap();
            scratch.path().to_path_buf()
        };

        assert!(!path.exists());
    }
}

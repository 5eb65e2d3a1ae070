//! A streaming group-by operator with bounded memory.
//!
//! [`group_by`] reads a stream of `(key, value)` pairs once and returns a
//! [`GroupByStream`] yielding one `(key, values)` group per distinct key.
//! Small inputs are grouped entirely in memory. Larger ones are spilled as
//! sorted runs into a per-invocation scratch directory, compacted down to a
//! bounded number of files and k-way merged lazily while the result is
//! polled.
//!
//! ```no_run
//! use std::convert::Infallible;
//!
//! use futures_util::{stream, TryStreamExt};
//! use spillgroup::{group_by, GroupByOption};
//!
//! # async fn run() -> Result<(), spillgroup::GroupByError> {
//! let input = stream::iter(
//!     vec![(1_u64, 3_u64), (4, 1), (1, 2), (4, 4), (100, 1)]
//!         .into_iter()
//!         .map(Ok::<_, Infallible>),
//! );
//! let option = GroupByOption::from("/tmp/spillgroup")
//!     .max_hashmap_entries(2)
//!     .max_number_of_files(8);
//!
//! let groups: Vec<_> = group_by(input, option).await?.try_collect().await?;
//! assert_eq!(groups, vec![(1, vec![3, 2]), (4, vec![1, 4]), (100, vec![1])]);
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod fs;
mod inmem;
mod logging;
mod option;
pub mod record;
mod run;
pub mod serdes;
mod spill;
mod stream;

pub use crate::{
    engine::group_by,
    error::{ConfigError, GroupByError},
    fs::RunId,
    option::GroupByOption,
    stream::{GroupByState, GroupByStats, GroupByStream},
};

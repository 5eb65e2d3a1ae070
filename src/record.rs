//! Bounds on the keys and values accepted by the operator.
//!
//! The accumulator groups by hashing, run files are ordered by `Ord`, and both
//! travel to disk through [`Encode`]/[`Decode`].

use std::{fmt::Debug, hash::Hash};

use crate::serdes::{Decode, Encode};

pub trait Key: 'static + Encode + Decode + Ord + Hash + Clone + Send + Sync + Debug {}

impl<T> Key for T where T: 'static + Encode + Decode + Ord + Hash + Clone + Send + Sync + Debug {}

pub trait Value: 'static + Encode + Decode + Send + Sync {}

impl<T> Value for T where T: 'static + Encode + Decode + Send + Sync {}

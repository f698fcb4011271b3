//! Core encoding engine module
//!
//! Encodes are CPU-heavy and long-running, so they never run on the request
//! path directly. Requests hand jobs to an [`EncodePool`], which runs at most
//! a fixed number at a time and turns requests away once its queue is full.

pub mod pool;

pub use pool::{EncodePool, PoolSettings};

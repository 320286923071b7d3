//! Filesystem utilities for the file store.

pub mod atomic;

pub use atomic::atomic_write;

//! Side-effectful implementations of `the-lib` interfaces for runtime hosts.

pub mod file_sink;

pub use file_sink::FileSink;

//! Tracing setup shared by the binaries in this workspace.

mod subscriber;

pub use subscriber::{LogFormat, init_tracing, init_tracing_with};

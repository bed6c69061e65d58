//! HTTP plumbing: transport seam, network paths, fallback client.

pub mod fallback;
pub mod http;
#[cfg(any(test, feature = "test-seams"))]
pub mod mock;
pub mod path;

//! Network-free building blocks of the Atrium download proxy: target URL
//! validation, filename resolution and the error taxonomy shared with the
//! HTTP layer.
pub mod errors;
pub mod filename;
pub mod target;

pub use errors::{ProxyError, ProxyResult};
pub use filename::{content_disposition, resolve_filename};
pub use target::{is_within_base, resolve_target, LocalTls, ResolvedTarget};

//! Common infrastructure for the routewatch route tracker.
//!
//! - [`error`]: the fetch / persistence / configuration error taxonomy
//! - [`shell`]: bounded shell command execution used by the local source
//!
//! # Example
//!
//! ```ignore
//! use routewatch_common::{shell, FetchResult};
//! use std::time::Duration;
//!
//! async fn local_routes() -> FetchResult<String> {
//!     shell::exec_or_fail("ip route show", Duration::from_secs(30)).await
//! }
//! ```

pub mod error;
pub mod shell;

pub use error::{ConfigError, ErrorKind, FetchError, FetchResult, PersistenceError};
pub use shell::ExecResult;

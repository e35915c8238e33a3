//! # franz-error
//!
//! One error type for every crate in the workspace.
//!
//! - [`ErrorKind`] says which part of a turn failed
//! - [`ErrorStatus`] says whether trying again could help
//! - `operation` and context pairs say where, `source` says why
//!
//! Errors are created once at the failure site and only gain operations and
//! context on the way up. Raw library errors go in through `set_source`, not
//! through `From`; `std::io::Error` is the one exception.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

pub type Result<T> = std::result::Result<T, Error>;

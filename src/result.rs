//!
//! The [`Result`] type alias bound to the crate [`Error`](crate::error::Error) enum.
//!

pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;

//! Bundled [`Connection`](crate::Connection) implementations.

#[cfg(feature = "postgres")]
mod placeholder;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

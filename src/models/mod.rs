//! Core data models for the blob mover.
//!
//! These entities describe blobs, containers, in-flight copies and the
//! signed grants used to authorise them. Rows owned by the local storage
//! account map to SQLite tables via `sqlx::FromRow`.

pub mod container;
pub mod copy;
pub mod grant;
pub mod object;

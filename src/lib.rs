//! Moves blobs between storage containers, possibly in different accounts.
//!
//! Blobs are chosen by comparing their last-modified time with a cutoff,
//! copied service-side under a short-lived read-only signed URI, and
//! deleted from the source only once the destination reports the copy
//! successful.

pub mod app;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod services;

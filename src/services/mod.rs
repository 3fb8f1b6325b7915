//! Storage-service layer.
//!
//! [`blob_service::BlobService`] is the seam every pipeline stage talks
//! through. [`local_store::LocalBlobStore`] implements it on top of SQLite
//! metadata and on-disk payloads.

pub mod blob_service;
pub mod connection;
pub mod local_store;
pub mod sas;

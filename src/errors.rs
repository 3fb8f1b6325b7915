//! Fatal errors that abort a migration run.
//!
//! Per-object copy failures and source-delete failures are not errors at
//! this level; they are recorded in the run's report and the run moves on.

use crate::services::blob_service::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("could not prepare container `{container}`: {source}")]
    Prepare {
        container: String,
        #[source]
        source: StoreError,
    },
    #[error("listing or selection in `{container}` failed: {source}")]
    Selection {
        container: String,
        #[source]
        source: StoreError,
    },
    #[error("could not read properties of `{name}`: {source}")]
    Properties {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("could not mint a read grant for `{name}`: {source}")]
    GrantMinting {
        name: String,
        #[source]
        source: StoreError,
    },
    #[error("grant for `{name}` carries `{permissions}`, expected read-only")]
    GrantScope { name: String, permissions: String },
}

pub type MoveResult<T> = Result<T, MoveError>;

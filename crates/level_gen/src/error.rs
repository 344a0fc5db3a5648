//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, partitioning that fails to converge, internally inconsistent
//! clusters, content collaborators that reuse item ids and missed deadlines.
use thiserror::Error;

use crate::content::ItemId;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("connection point partitioning did not converge after {passes} passes")]
    PartitionDiverged { passes: usize },

    #[error("cluster {cluster} is inconsistent: {reason}")]
    Inconsistent { cluster: u64, reason: String },

    #[error("content source reused item '{id}' after {attempts} attempts")]
    DuplicateItem { id: ItemId, attempts: usize },

    #[error("level generation exceeded its deadline")]
    DeadlineExceeded,
}

impl Error {
    pub(crate) fn inconsistent(cluster: u64, reason: impl Into<String>) -> Self {
        Error::Inconsistent {
            cluster,
            reason: reason.into(),
        }
    }
}

use thiserror::Error;

use crate::storage::buffer::BufferPoolError;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum HashIndexError {
    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Header page error: {0}")]
    Page(#[from] PageError),

    #[error("Page serialization failed: {0}")]
    Serialization(String),

    #[error("Bucket cannot split further, directory is at its depth limit")]
    DirectoryLimit,
}

use thiserror::Error;

use crate::storage::buffer::BufferPoolError;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum BTreeError {
    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Header page error: {0}")]
    Page(#[from] PageError),

    #[error("Node serialization failed: {0}")]
    Serialization(String),

    #[error("Node does not fit in a page")]
    NodeTooLarge,
}

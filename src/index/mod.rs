pub mod btree;
pub mod hash;
pub mod key;

pub use key::IndexKey;

use thiserror::Error;

/// Error surface shared by the two index kinds, for callers that hold a
/// handle to either
#[derive(Error, Debug)]
pub enum IndexError {
    #[error(transparent)]
    BTree(#[from] btree::BTreeError),

    #[error(transparent)]
    Hash(#[from] hash::HashIndexError),
}

pub mod bucket;
pub mod directory;
pub mod error;
pub mod table;

pub use bucket::{Bucket, Slot};
pub use directory::Directory;
pub use error::HashIndexError;
pub use table::{ExtendibleHashTable, DEFAULT_BUCKET_CAPACITY};

pub mod error;
pub mod manager;
pub mod replacer;
pub mod striped;

pub use error::BufferPoolError;
pub use manager::BufferPoolManager;
pub use striped::StripedBufferPoolManager;

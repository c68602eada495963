use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Not enough free space on page")]
    InsufficientSpace,

    #[error("Invalid slot number: {0}")]
    InvalidSlot(u32),

    #[error("Record not found")]
    RecordNotFound,

    #[error("Record serialization failed: {0}")]
    Serialization(String),
}

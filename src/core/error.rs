use thiserror::Error;

#[derive(Error, Debug)]
pub enum TyfsError {
    #[error("Segment full: no free block among the allocatable positions")]
    SegmentFull,

    #[error("Reserved block: block 0 holds the segment descriptor")]
    ReservedBlock,

    #[error("Double free: block {0} is not allocated")]
    DoubleFree(u8),

    #[error("Block {0} is not allocated")]
    BlockNotAllocated(u8),

    #[error("Block index {0} is outside the segment")]
    BlockOutOfRange(usize),

    #[error("Audit log full: {capacity} records already stored")]
    AuditLogFull { capacity: usize },

    #[error("Unknown operation id: {0}")]
    UnknownOperation(String),

    #[error("Operation {0} has no pending record to resolve")]
    OperationNotPending(String),

    #[error("Unknown attribute slot: {0}")]
    UnknownAttribute(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Corrupt metadata: {0}")]
    Corrupt(String),

    #[error("Access denied: user {user} lacks {authority} authority")]
    AccessDenied { user: u8, authority: String },

    #[error("Unknown segment: {0}")]
    UnknownSegment(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TyfsError>;

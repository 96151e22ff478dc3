//! Error taxonomy
//!
//! Typed error kinds shared across the core modules. The HTTP layer owns the
//! mapping to status codes; nothing here knows about responses or rendering.

/// Application error kinds
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The note id was never part of the index (pure lookup miss).
    #[error("note unavailable: {0} is not in the index")]
    NoteNotFound(String),

    /// The index claims the note exists but the file vanished from disk
    /// between the index build and the read (filesystem race).
    #[error("note unavailable: {0} is indexed but missing on disk")]
    ContentMissing(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("upstream error: {0}")]
    BadGateway(String),

    #[error("upstream fetch timed out")]
    GatewayTimeout,
}

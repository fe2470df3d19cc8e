//! Error types for watch registration and wait-for futures

use thiserror::Error;

/// Errors produced by [`Watchable`](crate::watchable::Watchable)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    /// Watch options were passed without a handler
    #[error("watch options require a handler")]
    MissingHandler,

    /// A typed watch was given a wildcard handler
    #[error("watching `{0}` requires a typed handler")]
    TypedHandlerRequired(String),

    /// A typed handler was given without an event type
    #[error("typed handler registered without an event type")]
    MissingEventType,

    /// A batch handler was registered without `deferred`
    #[error("wildcard batch handlers must be registered with deferred delivery")]
    BatchRequiresDeferred,

    /// A wildcard immediate handler was registered with `deferred`
    #[error("wildcard immediate handlers cannot use deferred delivery")]
    ImmediateHandlerDeferred,

    /// The cancellation signal fired before the event arrived
    #[error("wait was cancelled before the event fired")]
    Cancelled,

    /// The watchable was dropped before the event arrived
    #[error("watchable dropped before the event fired")]
    Closed,
}

/// Result alias for watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors produced by [`ObjectPath::assign`](crate::object_path::ObjectPath::assign)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// Assigning through an empty path
    #[error("cannot assign through an empty path")]
    Empty,

    /// A segment of the path runs into a value that cannot hold children
    #[error("segment {depth} of the path is a {found}, not an object or array")]
    NotContainer { depth: usize, found: &'static str },

    /// A name segment was used on an array
    #[error("segment {depth} indexes an array with the non-numeric key `{key}`")]
    InvalidIndex { depth: usize, key: String },
}

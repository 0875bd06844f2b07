/// Failures observed at the portal client boundary.
///
/// The plain client operations collapse these into `false` / empty results;
/// the `try_*` variants hand them to callers that want to tell
/// "nothing there" apart from "could not ask".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected http status: {0}")]
    Status(u16),

    #[error("token not found: {0}")]
    MissingToken(&'static str),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Core error type.
///
/// Adapter crates map their specific errors into this type so handlers can
/// turn failures into short user-facing notices.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("not logged in")]
    NotLoggedIn,

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every crate in the workspace.
///
/// Each variant is one of the abstract kinds the framework distinguishes:
/// registry lookups, codec mismatches, frame validation, endpoint
/// configuration, connection handling, and the broker RPC outcomes. Callers
/// match on the variant rather than inspecting a string, mirroring the
/// `ErrorKind`-tagged style the rest of the pack uses for cross-module
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("unknown codec '{0}'")]
    UnknownCodec(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("connect refused: {0}")]
    ConnectRefused(String),

    #[error("undeliverable")]
    Undeliverable,

    #[error("timeout")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("user callback error: {0}")]
    UserCallbackError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encode error: {0}")]
    EncodeError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EndpointError {
    /// True for errors that should trigger a reconnect rather than a hard
    /// stop, matching spec.md §7's "transport failures trigger reconnect".
    pub fn is_transient(&self) -> bool {
        matches!(self, EndpointError::ConnectRefused(_) | EndpointError::Io(_))
    }
}

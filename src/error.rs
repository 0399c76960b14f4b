pub type SpriteweaveResult<T> = Result<T, SpriteweaveError>;

#[derive(thiserror::Error, Debug)]
pub enum SpriteweaveError {
    /// An operation that requires at least one frame or instruction
    /// received none.
    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Connected-component selection requested a rank that does not exist.
    #[error("no region found: {0}")]
    NoRegionFound(String),

    /// Render was attempted on a committed frame with no instructions.
    #[error("empty frame: {0}")]
    EmptyFrame(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SpriteweaveError {
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn no_region_found(msg: impl Into<String>) -> Self {
        Self::NoRegionFound(msg.into())
    }

    pub fn empty_frame(msg: impl Into<String>) -> Self {
        Self::EmptyFrame(msg.into())
    }
}

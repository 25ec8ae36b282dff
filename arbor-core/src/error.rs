use thiserror::Error;

/// A rejected parameter, named with its botanical parameter name
/// (`Levels`, `BaseSize`, `1CurveRes`, ...).
#[derive(Clone, Debug, PartialEq, Error)]
#[error("invalid parameter `{name}`: {reason}")]
pub struct ParamError {
    pub name: String,
    pub reason: String,
}

impl ParamError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Why [`crate::tree::Tree::make`] did not produce a tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    InvalidParams(#[from] ParamError),

    /// The build was cancelled through its [`crate::progress::CancelToken`].
    /// No partial tree is returned.
    #[error("tree generation was cancelled")]
    Cancelled,
}

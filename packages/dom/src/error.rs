use thiserror::Error;

pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("Node has no parent to insert relative to")]
    DetachedReference,

    #[error("Unexpected end of markup at {pos}")]
    UnexpectedEof { pos: usize },

    #[error("Invalid markup at {pos}: {message}")]
    InvalidMarkup { pos: usize, message: String },
}

impl DomError {
    pub fn unexpected_eof(pos: usize) -> Self {
        Self::UnexpectedEof { pos }
    }

    pub fn invalid_markup(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidMarkup {
            pos,
            message: message.into(),
        }
    }
}

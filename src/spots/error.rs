use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpotError {
    #[error("Duplicate spot name: {0}")]
    DuplicateName(String),

    #[error("Spot '{0}' has an index but is not selected")]
    IndexWithoutSelection(String),

    #[error("Spot '{0}' is selected but has no index")]
    SelectionWithoutIndex(String),

    #[error("Selected indices must be 0..{expected} without gaps, found {found:?}")]
    IndexNotDense { expected: usize, found: Vec<usize> },
}

impl SpotError {
    /// Name of the offending spot, when the error is about a single spot.
    pub fn spot(&self) -> Option<&str> {
        match self {
            SpotError::DuplicateName(name)
            | SpotError::IndexWithoutSelection(name)
            | SpotError::SelectionWithoutIndex(name) => Some(name),
            SpotError::IndexNotDense { .. } => None,
        }
    }
}

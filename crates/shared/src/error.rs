use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("line has no stations")]
    EmptyLine,
    #[error("station index {idx} out of range for line of {len} stations")]
    InvalidIndex { idx: usize, len: usize },
}

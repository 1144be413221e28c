use crate::types::CodeId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid {kind} code: {value}")]
    InvalidCode { kind: &'static str, value: CodeId },
}

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid TaskId: {0}")]
    InvalidTaskId(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Error)]
pub enum TaskError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("DynamoDB error: {0}")]
    DynamoDb(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl TaskError {
    /// 入力検証で弾かれたエラーかどうか（リモート呼び出しは行われていない）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TaskError::Validation(_) | TaskError::Domain(DomainError::Validation(_))
        )
    }
}

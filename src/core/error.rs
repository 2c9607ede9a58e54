use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unit not found: {0:?}")]
    UnitNotFound(crate::core::types::UnitId),

    #[error("Task not found: {0:?}")]
    TaskNotFound(crate::core::types::TaskId),

    #[error("Position out of bounds: {0}")]
    OutOfBounds(crate::core::types::CubePos),

    #[error("No path to destination: {0}")]
    Unreachable(crate::core::types::CubePos),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

use crate::validate::StructuralError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device already registered: {0}")]
    DeviceExists(String),

    #[error("task has {} structural error(s); first: {}", .0.len(), first_message(.0))]
    InvalidTask(Vec<StructuralError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn first_message(errors: &[StructuralError]) -> String {
    errors
        .first()
        .map(|e| format!("{} ({})", e.message, e.path))
        .unwrap_or_else(|| "none".to_string())
}

pub type Result<T> = std::result::Result<T, CoreError>;

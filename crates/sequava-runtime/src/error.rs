use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no execution running")]
    NotRunning,

    #[error("runtime fault: {0}")]
    Fault(String),
}

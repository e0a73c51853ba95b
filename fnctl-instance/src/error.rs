use std::time::Duration;

use tonic::Status;

#[derive(thiserror::Error, Debug)]
pub enum InstanceError {
    #[error("instance state busy: lock not acquired within {0:?}")]
    LockTimeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
    #[error("reflection error: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),
    #[error("config error: {0}")]
    Config(#[from] envconfig::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("control read aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<InstanceError> for tonic::Status {
    fn from(value: InstanceError) -> Self {
        match value {
            InstanceError::LockTimeout(_) => {
                Status::unavailable(value.to_string())
            }
            _ => Status::internal(value.to_string()),
        }
    }
}

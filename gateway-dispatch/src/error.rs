/// Error taxonomy for dispatch attempts: transient transport failures are
/// retried by the caller, permanent failures are not. Nothing here ever
/// crosses a worker boundary; [`crate::Dispatcher::send`] always resolves
/// to a `bool`.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("transient transport failure: {0}")]
    Temporary(String),
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl DispatchError {
    pub fn is_temporary(&self) -> bool {
        matches!(self, DispatchError::Temporary(_))
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            DispatchError::Temporary(err.to_string())
        } else if let Some(status) = err.status() {
            if status.is_server_error() {
                DispatchError::Temporary(status.to_string())
            } else {
                DispatchError::Permanent(status.to_string())
            }
        } else {
            DispatchError::Temporary(err.to_string())
        }
    }
}

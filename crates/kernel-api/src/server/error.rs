#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("system failed to boot: {0}")]
    Bootstrap(#[from] BootstrapError),
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn invalid_query(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidQuery, message, details),
        }
    }

    fn invalid_command(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidCommand, message, details),
        }
    }

    fn from_bootstrap(err: BootstrapError) -> Self {
        error!(error = %err, "request failed");
        match err {
            BootstrapError::Identity(IdentityError::Missing) => Self {
                status: StatusCode::CONFLICT,
                error: ApiError::new(
                    ErrorCode::IdentityUnavailable,
                    "identity has been destroyed",
                    None,
                ),
            },
            BootstrapError::Identity(other) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::new(
                    ErrorCode::IdentityUnavailable,
                    "identity store failed",
                    Some(other.to_string()),
                ),
            },
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::new(
                    ErrorCode::PersistenceFailure,
                    "event log operation failed",
                    Some(other.to_string()),
                ),
            },
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

use http::StatusCode;
use std::error::Error;
use std::io;
use thiserror::Error;

/// The error handlers and middleware return. Its `Display` text becomes the body of the 500
/// response.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// What every [`Handler`](crate::Handler) invocation returns.
pub type HandlerResult = Result<(), BoxError>;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body has been consumed")]
    Consumed,

    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("failed to read request body: {reason}")]
    Read { reason: String },
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error(transparent)]
    Body(#[from] BodyError),

    #[error("invalid json body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid form body: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    #[error("validation failed: {}", .0.to_string().trim_end())]
    Validation(#[from] garde::Report),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query string: {0}")]
    Invalid(#[from] serde_qs::Error),
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    #[error("redirect status must be between 300 and 308, got {status}")]
    InvalidRedirect { status: StatusCode },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Body(#[from] BodyError),

    #[error("request content type is not multipart/form-data")]
    NotMultipart,

    #[error("invalid multipart body: {0}")]
    Multipart(#[from] multer::Error),

    #[error("form field `{name}` not found")]
    MissingField { name: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind listener: {source}")]
    Bind { source: io::Error },
}

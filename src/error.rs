use thiserror::Error;

// Errors surfaced by fetch operations and model accessors
#[derive(Error, Debug)]
pub enum GoodreadsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Missing data: {0}")]
    MissingData(String),

    #[error("Unparseable date: {0}")]
    UnparseableDate(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for GoodreadsError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key
        let err = err.without_url();
        match err.status() {
            Some(status) => GoodreadsError::ApiResponseError {
                status_code: status.as_u16(),
                message: err.to_string(),
            },
            None => GoodreadsError::NetworkError(err.to_string()),
        }
    }
}

impl From<quick_xml::DeError> for GoodreadsError {
    fn from(err: quick_xml::DeError) -> Self {
        GoodreadsError::DecodeError(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

pub type Result<T> = std::result::Result<T, GoodreadsError>;

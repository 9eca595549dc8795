use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned HTTP {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("Backend rejected {endpoint}: {message} ({code})")]
    Api {
        endpoint: String,
        code: String,
        message: String,
    },

    #[error("Backend response for {0} carried no result")]
    MissingResult(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Login redirect carried no access token")]
    MissingToken,
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector '{selector}': {reason}")]
    SelectorSyntax { selector: String, reason: String },

    #[error("Failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("{url} is not an HTML document (content-type: {content_type})")]
    NotHtml { url: String, content_type: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeadlineError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

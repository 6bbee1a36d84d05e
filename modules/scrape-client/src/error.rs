pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Scrape API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Empty content returned for {0}")]
    EmptyContent(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

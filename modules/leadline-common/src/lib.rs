pub mod config;
pub mod error;
pub mod export;
pub mod scoring;
pub mod sessions;
pub mod signals;
pub mod types;

pub use config::Config;
pub use error::LeadlineError;
pub use scoring::*;
pub use sessions::group_sessions;
pub use signals::{extract_signals, normalize_url, ContactSignals};
pub use types::*;

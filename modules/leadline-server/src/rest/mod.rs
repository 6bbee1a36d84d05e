pub mod admin;
pub mod analytics;
pub mod chat;
pub mod internal;
pub mod leads;
pub mod sessions;
pub mod telemetry;

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod i18n;
pub mod metrics;
pub mod response;
pub mod security;
pub mod server;
pub mod translation;

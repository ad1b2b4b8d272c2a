mod config;

pub use config::{APP_NAME, AppConfig, DEFAULT_LISTEN_ADDR};

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, ClientConfig, Environment, LogFormat, LoggingConfig, ServerConfig,
};

use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    DatabaseSettings, EnrollmentSettings, LoggingSettings, ServerSettings, Settings,
    StorageBackend, StorageSettings,
};

/// Looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "academia";

/// Prefix for environment overrides, e.g. `ACADEMIA__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "ACADEMIA";

/// Loads the application configuration.
///
/// Sources are layered: struct defaults, then the TOML file (an explicit `path`
/// must exist; the default `academia.toml` is optional), then environment
/// variables. The merged result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder();
    let builder = match path {
        Some(path) => builder.add_source(config::File::from(path)),
        None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let file = write_config(
            r#"
            [server]
            port = 8081

            [enrollment]
            max_retries = 5
            "#,
        );

        let settings = load_config(Some(file.path())).unwrap();
        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.enrollment.max_retries, 5);
        assert_eq!(settings.enrollment.retry_backoff_ms, 25);
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.storage.backend, StorageBackend::Postgres);
    }

    #[test]
    fn storage_backend_parses_lowercase_names() {
        let file = write_config(
            r#"
            [storage]
            backend = "memory"
            "#,
        );

        let settings = load_config(Some(file.path())).unwrap();
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let file = write_config(
            r#"
            [database]
            max_connections = 0
            "#,
        );

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn host_must_be_an_ip_address() {
        let settings = ServerSettings {
            host: "not an address".to_string(),
            port: 3000,
        };
        assert!(settings.socket_addr().is_err());
    }
}

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Tunables for the reference engine.
///
/// [`crate::MemoryEngine::new`] uses the built-in defaults and never touches
/// the filesystem; `load()` is for applications that configure the engine
/// from `config/config.toml` (section `[store]`) or `PURSER__STORE__*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Cap on concurrently open sessions; sessions are a scarce resource
    /// and leaks should surface early.
    #[serde(default = "default_max_open_sessions")]
    pub max_open_sessions: usize,
    /// First value handed out by a table's key sequence.
    #[serde(default = "default_sequence_start")]
    pub sequence_start: i64,
}

fn default_max_open_sessions() -> usize {
    8
}

fn default_sequence_start() -> i64 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_open_sessions: default_max_open_sessions(),
            sequence_start: default_sequence_start(),
        }
    }
}

impl EngineConfig {
    /// Load the engine configuration from `config/config.toml`, falling back to env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("config/config.toml").required(false))
            .add_source(Environment::with_prefix("PURSER").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An unreadable file (parse error, permissions) degrades to
                // env-only sources rather than failing outright.
                if std::path::Path::new("config/config.toml").exists() {
                    eprintln!(
                        "Warning: failed to load config file, falling back to env. Error: {}",
                        err
                    );
                }
                Config::builder()
                    .add_source(Environment::with_prefix("PURSER").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        settings.get::<EngineConfig>("store").map_err(|e| {
            ConfigError::Message(format!(
                "Store configuration could not be loaded from file or environment: {}",
                e
            ))
        })
    }
}

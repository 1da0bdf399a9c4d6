mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{HubSettings, LogSettings, ServerSettings, Settings};

/// Prefix of environment overrides, e.g. `GAMEHUB_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "GAMEHUB";

/// Loads the configuration from `config/default` and environment variables,
/// merged over the built-in defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Like [`load_config`] but reads the optional file at `path` (extension
/// may be omitted).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge())
}

#[cfg(test)]
mod tests;

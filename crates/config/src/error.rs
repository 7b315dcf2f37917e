/// Errors raised while loading or validating the gateway configuration.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The configuration file could not be opened.
    #[error("Failed to open configuration file: {0}")]
    ConfigOpen(#[from] std::io::Error),
    /// The configuration file is not valid TOML, or does not match the expected shape.
    #[error("Failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),
    /// An `{{ env.VAR }}` placeholder referenced a variable that isn't set.
    #[error("At {path} failed expanding environment variable: {reason}")]
    EnvVarSubstitution { path: String, reason: String },
}

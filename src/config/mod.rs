// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Environment variable prefix, e.g. `EXAM_HEALTH_MAIL_GATEWAY__CLIENT_ID`.
pub const ENV_PREFIX: &str = "EXAM_HEALTH";

/// Config file read when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = read_config(path.as_ref()).await?;
    config.validate()?;
    Ok(config)
}

/// Load the config file, then apply `EXAM_HEALTH_*` environment overrides.
///
/// An explicit `path` must exist. Without one, `DEFAULT_CONFIG_PATH` is read
/// if present; every dependency section is optional, so running from
/// environment variables alone is allowed.
pub async fn load_layered<P: AsRef<Path>>(path: Option<P>) -> Result<Config> {
    let explicit: Option<&Path> = path.as_ref().map(|p| p.as_ref());
    load_layered_with(
        explicit,
        Path::new(DEFAULT_CONFIG_PATH),
        ::config::Environment::with_prefix(ENV_PREFIX),
    )
    .await
}

async fn load_layered_with(
    explicit: Option<&Path>,
    fallback: &Path,
    env: ::config::Environment,
) -> Result<Config> {
    let base = match explicit {
        Some(path) => read_config(path).await?,
        None => {
            let exists = tokio::fs::try_exists(fallback)
                .await
                .with_context(|| format!("Failed to access config file {}", fallback.display()))?;
            if exists {
                read_config(fallback).await?
            } else {
                tracing::debug!(
                    path = %fallback.display(),
                    "default config file not found, using environment only"
                );
                Config::default()
            }
        }
    };

    let config = apply_env(base, env)?;
    config.validate()?;
    Ok(config)
}

async fn read_config(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(path, &contents)
}

fn parse_config(path: &Path, contents: &str) -> Result<Config> {
    let ext = path.extension().and_then(|s| s.to_str());
    let config: Config = if ext == Some("yaml") || ext == Some("yml") {
        serde_yaml::from_str(contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(contents).context("Failed to parse JSON config")?
    };
    Ok(config)
}

/// Layer environment variables on top of an already-parsed config.
fn apply_env(base: Config, env: ::config::Environment) -> Result<Config> {
    let base = serde_json::to_string(&base).context("Failed to serialize base config")?;

    let layered = ::config::Config::builder()
        .add_source(::config::File::from_str(&base, ::config::FileFormat::Json))
        // Values stay strings so secrets like "007123" survive intact;
        // numeric and bool fields are parsed during deserialization.
        .add_source(env.prefix_separator("_").separator("__"))
        .build()
        .context("Failed to read environment overrides")?;

    layered
        .try_deserialize::<Config>()
        .context("Failed to apply environment overrides")
}

//! Command implementations.

mod info;
mod publish;
mod run;
mod validate;

pub use info::run_info;
pub use publish::run_publish;
pub use run::run_stdin;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::LiveConfig;
use tracing::info;

/// Load a configuration file and apply CLI overrides
fn load_config(path: &Path, call_timeout_ms: Option<u64>) -> Result<LiveConfig> {
    info!(config = %path.display(), "Loading configuration");

    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(ms) = call_timeout_ms {
        info!(call_timeout_ms = ms, "Overriding call timeout from CLI");
        config.dispatcher.call_timeout_ms = (ms > 0).then_some(ms);
    }

    info!(
        rules = config.rules.len(),
        datasources = config.datasources.len(),
        call_timeout_ms = ?config.dispatcher.call_timeout_ms,
        "Configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_with_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[dispatcher]
call_timeout_ms = 250

[[rules]]
org_id = 1
channel = "weather"
converter = "json_auto"
"#
        )
        .unwrap();

        let config = load_config(file.path(), None).unwrap();
        assert_eq!(config.dispatcher.call_timeout_ms, Some(250));

        let config = load_config(file.path(), Some(0)).unwrap();
        assert_eq!(config.dispatcher.call_timeout_ms, None);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_config(Path::new("/nonexistent/live.toml"), None).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}

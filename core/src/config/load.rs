use std::path::{Path, PathBuf};

use anyhow::Context;

use super::types::AppConfig;

/// Get the default data directory: ~/.countdown
pub fn get_countdown_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".countdown"))
}

/// Load configuration from an explicit file, then apply env overrides.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)
        .with_context(|| format!("parse config {}", path.display()))?;
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: $COUNTDOWN_CONFIG
    if let Ok(v) = std::env::var("COUNTDOWN_CONFIG") {
        if !v.trim().is_empty() {
            return load_from_path(Path::new(v.trim()));
        }
    }

    // Priority 2: ~/.countdown/config.toml
    let home_config = get_countdown_data_dir()
        .map(|dir| dir.join("config.toml"))
        .ok()
        .filter(|p| p.exists());
    if let Some(path) = home_config {
        return load_from_path(&path);
    }

    // Priority 3: ./countdown.toml (current directory)
    let local_config = Path::new("countdown.toml");
    if local_config.exists() {
        return load_from_path(local_config);
    }

    let mut cfg = AppConfig::default();
    apply_env_overrides(&mut cfg)?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority)
fn apply_env_overrides(cfg: &mut AppConfig) -> anyhow::Result<()> {
    if let Ok(v) = std::env::var("COUNTDOWN_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v.trim().to_string();
        }
    }
    if let Ok(v) = std::env::var("COUNTDOWN_MAX_PARALLEL") {
        if !v.trim().is_empty() {
            let n: usize = v
                .trim()
                .parse()
                .with_context(|| format!("COUNTDOWN_MAX_PARALLEL must be a number, got '{v}'"))?;
            cfg.executor.max_parallel = Some(n.max(1));
        }
    }
    if let Ok(v) = std::env::var("COUNTDOWN_OUTPUT") {
        if !v.trim().is_empty() {
            cfg.executor.output = v.trim().to_string();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[executor]
max_parallel = 2

[pipeline]
products_per_video = 3
"#
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();

        assert_eq!(cfg.executor.max_parallel, Some(2));
        assert!(cfg.executor.validate_graph);
        assert_eq!(cfg.pipeline.products_per_video, 3);
        assert_eq!(cfg.pipeline.candidate_limit, 20);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "executor = 7").unwrap();

        let err = load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("parse config"));
    }
}

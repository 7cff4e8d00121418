//! XML configuration support.
//! - Loads settings from config.xml (quick_xml).
//! - Creates a secure template on first run (unless DIRTREE_CONFIG is set).
//!
//! Unknown XML fields are rejected so that typos surface instead of being ignored.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{default_config_path, env_config_path, path_has_symlink_ancestor};
use super::types::{Config, LogLevel};
use super::{CONFIG_ENV, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::platform::{set_dir_mode_0700, set_file_mode_0600, write_config_secure_new_0600};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    retry_attempts: Option<u32>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    retry_delay_ms: Option<u64>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    continue_on_error: Option<bool>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    skip_reparse_points: Option<bool>,
    #[serde(default, deserialize_with = "de_trimmed_opt")]
    ignore_read_only: Option<bool>,
}

/// Parse an optional scalar after trimming surrounding whitespace.
/// Blank elements count as absent; anything else must parse.
fn de_trimmed_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid value '{s}': {e}"))),
    }
}

/// Outcome of looking for a config file.
#[derive(Debug)]
pub enum LoadResult {
    /// Settings read from this file.
    Loaded(Config, PathBuf),
    /// No file; built-in defaults apply.
    Defaults,
    /// No file existed, so a template was written here; defaults apply.
    CreatedTemplate(PathBuf),
}

impl LoadResult {
    pub fn config(&self) -> Config {
        match self {
            LoadResult::Loaded(cfg, _) => cfg.clone(),
            LoadResult::Defaults | LoadResult::CreatedTemplate(_) => Config::default(),
        }
    }
}

/// Locate and load the config.
///
/// `DIRTREE_CONFIG` wins and must name an existing file. Otherwise the
/// platform default is read, or a template is created there on first run.
pub fn load_config() -> Result<LoadResult> {
    if let Some(path) = env_config_path() {
        if !path.is_file() {
            bail!(
                "{CONFIG_ENV} points at '{}', which is not a readable file",
                path.display()
            );
        }
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }

    let path = match default_config_path() {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "no default config location; using defaults");
            return Ok(LoadResult::Defaults);
        }
    };
    if path.exists() {
        let cfg = load_config_from_xml_path(&path)?;
        return Ok(LoadResult::Loaded(cfg, path));
    }

    match create_template_config(&path) {
        Ok(()) => Ok(LoadResult::CreatedTemplate(path)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not write template config");
            Ok(LoadResult::Defaults)
        }
    }
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    parse_config(&contents).with_context(|| format!("parse config xml '{}'", path.display()))
}

/// Parse config XML text; missing fields keep their defaults.
pub fn parse_config(contents: &str) -> Result<Config> {
    let parsed: XmlConfig = if contents.trim().is_empty() {
        XmlConfig::default()
    } else {
        from_xml_str(contents)?
    };
    xml_to_config(parsed)
}

fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(s) = parsed.log_level.as_deref() {
        let s = s.trim();
        if !s.is_empty() {
            cfg.log_level = LogLevel::parse(s).ok_or_else(|| anyhow!("invalid log_level '{s}'"))?;
        }
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }
    if let Some(n) = parsed.retry_attempts {
        cfg.retry_attempts = n;
    }
    if let Some(ms) = parsed.retry_delay_ms {
        cfg.retry_delay_ms = ms;
    }
    if let Some(b) = parsed.continue_on_error {
        cfg.continue_on_error = b;
    }
    if let Some(b) = parsed.skip_reparse_points {
        cfg.skip_reparse_points = b;
    }
    if let Some(b) = parsed.ignore_read_only {
        cfg.ignore_read_only = b;
    }
    Ok(cfg)
}

/// Create default template config file and parent directory (best-effort permissions).
/// Uses secure creation to avoid following attacker-controlled symlinks on Unix.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config directory '{}'", parent.display()))?;
        let _ = set_dir_mode_0700(parent);
    }

    write_config_secure_new_0600(path, template_contents().as_bytes())?;
    let _ = set_file_mode_0600(path);

    info!(path = %path.display(), "created template config");
    Ok(())
}

fn template_contents() -> String {
    format!(
        "<!--\n  dirtree configuration (XML)\n\n  log_level            -> quiet | normal | info | debug\n  log_file             -> optional path of a log file (console output is kept)\n  retry_attempts       -> removal attempts for a directory that keeps refilling (>= 1)\n  retry_delay_ms       -> pause between those attempts\n  continue_on_error    -> keep listing past unreadable directories\n  skip_reparse_points  -> do not descend into symlinks and junctions\n  ignore_read_only     -> clear read-only attributes instead of failing\n\n  CLI flags override these values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <log_file></log_file>\n  <retry_attempts>{DEFAULT_RETRY_ATTEMPTS}</retry_attempts>\n  <retry_delay_ms>{DEFAULT_RETRY_DELAY_MS}</retry_delay_ms>\n  <continue_on_error>false</continue_on_error>\n  <skip_reparse_points>true</skip_reparse_points>\n  <ignore_read_only>false</ignore_read_only>\n</config>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_to_defaults() {
        let cfg = parse_config(&template_contents()).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn whitespace_is_trimmed() {
        let cfg = parse_config(
            "<config>\n  <retry_attempts> 4 </retry_attempts>\n  <ignore_read_only>\n true\n</ignore_read_only>\n  <log_level> debug </log_level>\n</config>",
        )
        .unwrap();
        assert_eq!(cfg.retry_attempts, 4);
        assert!(cfg.ignore_read_only);
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_config("<config><retries>3</retries></config>").unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"), "{err:#}");
    }

    #[test]
    fn bad_number_is_rejected() {
        assert!(parse_config("<config><retry_delay_ms>soon</retry_delay_ms></config>").is_err());
    }

    #[test]
    fn empty_log_file_means_none() {
        let cfg = parse_config("<config><log_file>   </log_file></config>").unwrap();
        assert_eq!(cfg.log_file, None);
    }
}

//! Default path helpers and symlink checks.
//! Determines OS-appropriate config/log paths and detects symlinked ancestors for safety.

use anyhow::{Result, anyhow};
use dirs::{config_dir, data_dir};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::CONFIG_ENV;

const APP_DIR: &str = "dirtree";
const CONFIG_FILE: &str = "config.xml";

/// OS-appropriate default config path, ignoring the environment override.
pub fn default_config_path() -> Result<PathBuf> {
    if let Some(base) = config_dir() {
        return Ok(base.join(APP_DIR).join(CONFIG_FILE));
    }
    env::var_os("HOME")
        .map(|h| PathBuf::from(h).join(".config").join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| anyhow!("cannot determine a config directory (no config dir and HOME unset)"))
}

/// Config path named by `DIRTREE_CONFIG`, if set.
///
/// Relative values are taken from the current directory; a directory value
/// means `config.xml` inside it.
pub fn env_config_path() -> Option<PathBuf> {
    let raw = env::var_os(CONFIG_ENV).filter(|v| !v.is_empty())?;
    let mut p = PathBuf::from(raw);
    if p.is_relative() {
        if let Ok(cwd) = env::current_dir() {
            p = cwd.join(p);
        }
    }
    if p.is_dir() {
        p.push(CONFIG_FILE);
    }
    Some(p)
}

/// OS-appropriate default log file path (data dir).
pub fn default_log_path() -> Result<PathBuf> {
    if let Some(base) = data_dir() {
        return Ok(base.join(APP_DIR).join("dirtree.log"));
    }
    env::var_os("HOME")
        .map(|h| {
            PathBuf::from(h)
                .join(".local")
                .join("share")
                .join(APP_DIR)
                .join("dirtree.log")
        })
        .ok_or_else(|| anyhow!("cannot determine a data directory (no data dir and HOME unset)"))
}

/// Return true if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.as_os_str().is_empty() {
            break;
        }
        match fs::symlink_metadata(anc) {
            Ok(meta) if meta.file_type().is_symlink() => return Ok(true),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        p = anc.parent();
    }
    Ok(false)
}

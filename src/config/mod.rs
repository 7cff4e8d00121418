//! Configuration: types, default paths, XML loading and validation.

pub mod paths;
pub mod types;
mod validate;
pub mod xml;

pub use paths::{default_config_path, default_log_path, env_config_path, path_has_symlink_ancestor};
pub use types::{Config, LogLevel};
pub use xml::{LoadResult, create_template_config, load_config, load_config_from_xml_path, parse_config};

/// Environment variable naming an explicit config file (or its directory).
pub const CONFIG_ENV: &str = "DIRTREE_CONFIG";
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 10;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10;

//! Platform-specific helpers.
//! This module hides OS differences (Unix/Windows) behind a uniform API so
//! the native backend and the config/logging layers stay platform-agnostic.

#[cfg(unix)]
mod common_unix;
#[cfg(unix)]
mod unix;
#[cfg(not(unix))]
mod windows;

#[cfg(unix)]
pub use unix::{
    attributes_from_metadata, is_mount_point, open_log_file_secure_append, set_dir_mode_0700,
    set_file_mode_0600, set_read_only, unmount, volume_key, write_config_secure_new_0600,
};

#[cfg(not(unix))]
pub use windows::{
    attributes_from_metadata, is_mount_point, open_log_file_secure_append, set_dir_mode_0700,
    set_file_mode_0600, set_read_only, unmount, volume_key, write_config_secure_new_0600,
};

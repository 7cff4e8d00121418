//! Metadata carried over by the host copy: permissions always, timestamps on request.

use filetime::{FileTime, set_file_times};
use std::fs;
use std::io;
use std::path::Path;

pub(super) fn apply_source_metadata(
    src_meta: &fs::Metadata,
    dest: &Path,
    preserve_timestamps: bool,
) -> io::Result<()> {
    fs::set_permissions(dest, src_meta.permissions())?;

    if preserve_timestamps {
        let atime = FileTime::from_last_access_time(src_meta);
        let mtime = FileTime::from_last_modification_time(src_meta);
        set_file_times(dest, atime, mtime)?;
    }
    Ok(())
}

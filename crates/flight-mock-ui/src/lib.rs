//! Embedded mock frontend for Flight development builds.
//!
//! The real web frontend is produced by the JS toolchain and bundled into
//! the plugin package; this crate embeds a minimal stand-in so the server
//! can be run and tested without that build step.

use include_dir::{Dir, include_dir};
use std::io;
use std::path::{Path, PathBuf};

/// The embedded mock tree: `index.html`, `js/main.js`, `css/style.css`.
pub static MOCK_DIST: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Write the embedded tree under `target` and return the written root.
///
/// Existing files are overwritten, so repeated runs against the same
/// directory pick up whatever this build embeds.
pub fn materialize(target: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(target)?;
    MOCK_DIST.extract(target)?;
    Ok(target.to_path_buf())
}

use crate::error::ServeError;
use std::path::{Path, PathBuf};

/// A file successfully resolved under the content root.
#[derive(Debug)]
pub struct ResolvedFile {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Resolve `raw_path` against `root` and read the target.
///
/// The raw path may still carry a query string; everything from `?` on is
/// ignored. `/` and the empty path serve `index.html`. The content type
/// comes from the target's extension, with `application/octet-stream` for
/// anything unrecognized.
pub async fn resolve(root: &Path, raw_path: &str) -> Result<ResolvedFile, ServeError> {
    let target = sanitize(root, raw_path)?;
    let bytes = tokio::fs::read(&target).await.map_err(|err| {
        tracing::error!(path = %target.display(), error = %err, "read failed after resolve");
        ServeError::Read(err)
    })?;
    let mime = mime_guess::from_path(&target)
        .first_or_octet_stream()
        .to_string();
    Ok(ResolvedFile { bytes, mime })
}

/// Containment check: canonicalize both the root and the joined target and
/// require the target to stay under the root.
///
/// `Path::starts_with` compares whole segments, so a sibling like
/// `dist-old/` never passes for a root of `dist/`. Canonicalizing the
/// target also resolves symlinks, so a link pointing outside the root is
/// rejected rather than followed.
fn sanitize(root: &Path, raw_path: &str) -> Result<PathBuf, ServeError> {
    let path = raw_path.split('?').next().unwrap_or_default();
    let relative = path.trim_start_matches('/');
    let relative = if relative.is_empty() { "index.html" } else { relative };

    let canonical_root = root.canonicalize().map_err(|_| ServeError::NotFound)?;
    let canonical_target = canonical_root
        .join(relative)
        .canonicalize()
        .map_err(|_| ServeError::NotFound)?;

    if !canonical_target.starts_with(&canonical_root) {
        return Err(ServeError::Forbidden);
    }
    if !canonical_target.is_file() {
        return Err(ServeError::NotFound);
    }
    Ok(canonical_target)
}

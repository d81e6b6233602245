//! Content fingerprints for versioned asset file names.
//!
//! The hashed copy sits next to the original (`main.js` → `main.1a2b3c4d.js`);
//! the original stays in place so later steps can still find it by its
//! canonical name.

use std::fs;
use std::path::{Path, PathBuf};

/// Length of the hex digest embedded in file names.
pub const DIGEST_LEN: usize = 8;

/// Output of fingerprinting one asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub original_path: PathBuf,
    pub content_hash: String,
    pub final_path: PathBuf,
}

impl AssetRecord {
    /// File name of the hashed copy.
    pub fn final_name(&self) -> String {
        self.final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Truncated blake3 digest of `content`, as lowercase hex.
pub fn fingerprint(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hash.to_hex()[..DIGEST_LEN].to_string()
}

/// `main.js` + `1a2b3c4d` → `main.1a2b3c4d.js`.
pub fn hashed_path(path: &Path, digest: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{digest}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{digest}"),
    };
    path.with_file_name(name)
}

/// Hash `path` and copy it to its hash-suffixed name.
pub fn fingerprint_file(path: &Path) -> std::io::Result<AssetRecord> {
    let content = fs::read(path)?;
    let content_hash = fingerprint(&content);
    let final_path = hashed_path(path, &content_hash);
    fs::write(&final_path, &content)?;

    Ok(AssetRecord {
        original_path: path.to_path_buf(),
        content_hash,
        final_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint(b"console.log('app')");
        assert_eq!(a.len(), DIGEST_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(a, fingerprint(b"console.log('app')"));
    }

    #[test]
    fn test_fingerprint_is_sensitive() {
        assert_ne!(
            fingerprint(b"console.log('app')"),
            fingerprint(b"console.log('apq')")
        );
        assert_ne!(fingerprint(b""), fingerprint(b"\0"));
    }

    #[test]
    fn test_hashed_path() {
        assert_eq!(
            hashed_path(Path::new("/dist/main.js"), "deadbeef"),
            PathBuf::from("/dist/main.deadbeef.js")
        );
        assert_eq!(
            hashed_path(Path::new("/dist/bundle"), "deadbeef"),
            PathBuf::from("/dist/bundle.deadbeef")
        );
    }

    #[test]
    fn test_fingerprint_file_keeps_original() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("main.js");
        fs::write(&script, "var app = 1;").unwrap();

        let record = fingerprint_file(&script).unwrap();
        assert_eq!(record.original_path, script);
        assert_eq!(record.content_hash, fingerprint(b"var app = 1;"));
        assert_eq!(record.final_name(), format!("main.{}.js", record.content_hash));
        assert!(script.exists());
        assert_eq!(fs::read(&record.final_path).unwrap(), b"var app = 1;");
    }
}

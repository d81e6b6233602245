//! Route path type for the pages a build produces.
//!
//! A `RoutePath` is opaque to the pipeline apart from two things: equality
//! (a route is rendered at most once) and the output location it maps to.
//! Both are taken from the canonical form built by [`RoutePath::new`], so
//! `"about"`, `"/about"` and `"/about/"` name the same page.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Route rendered for the "page not found" output.
///
/// Always queued, whatever discovery returns; its output is moved to
/// `404.html` once the pool has drained.
pub const NOT_FOUND_ROUTE: &str = "/__pagesmith__/404";

/// File every route renders into, inside its own directory.
pub const PAGE_FILE: &str = "index.html";

/// File holding the page's serialized data payload, next to [`PAGE_FILE`].
pub const DATA_FILE: &str = "content.json";

/// Canonical route path.
///
/// Invariants:
/// - starts with `/`
/// - no trailing `/` except for the root route
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoutePath(Arc<str>);

impl RoutePath {
    /// Canonicalize a raw route string.
    ///
    /// Empty and `.` segments are dropped so every spelling of a page maps to
    /// one route. `..` is kept; [`relative_dir`](Self::relative_dir) rejects it.
    pub fn new(raw: &str) -> Self {
        let segments: Vec<_> = raw
            .trim()
            .split('/')
            .filter(|seg| !seg.is_empty() && *seg != ".")
            .collect();
        if segments.is_empty() {
            return Self(Arc::from("/"));
        }
        Self(Arc::from(format!("/{}", segments.join("/"))))
    }

    /// The synthetic not-found route.
    pub fn not_found() -> Self {
        Self::new(NOT_FOUND_ROUTE)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.as_str() == NOT_FOUND_ROUTE
    }

    /// Directory (relative to the output root) this route renders into.
    ///
    /// Returns `None` for routes that would escape the output root
    /// (`..`, absolute components, or backslash separators).
    pub fn relative_dir(&self) -> Option<PathBuf> {
        let rel = self.as_str().trim_start_matches('/');
        if rel.contains('\\') {
            return None;
        }
        let path = Path::new(rel);
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(seg) => out.push(seg),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(out)
    }

    /// Absolute output file for this route's markup under `output_root`.
    pub fn page_file(&self, output_root: &Path) -> Option<PathBuf> {
        self.relative_dir()
            .map(|dir| output_root.join(dir).join(PAGE_FILE))
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutePath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for RoutePath {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl Serialize for RoutePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RoutePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_forms_are_equal() {
        assert_eq!(RoutePath::new("about"), RoutePath::new("/about/"));
        assert_eq!(RoutePath::new("/blog/post-1").as_str(), "/blog/post-1");
        assert_eq!(RoutePath::new("").as_str(), "/");
        assert_eq!(RoutePath::new("///").as_str(), "/");
        assert_eq!(RoutePath::new("/./.").as_str(), "/");
    }

    #[test]
    fn test_same_output_means_same_route() {
        let root = Path::new("/dist");
        let spellings = ["/a/b", "/a//b", "/a/./b", "a/b/", "//a/b//"];
        for raw in spellings {
            let route = RoutePath::new(raw);
            assert_eq!(route, RoutePath::new("/a/b"), "{raw}");
            assert_eq!(route.page_file(root).unwrap(), PathBuf::from("/dist/a/b/index.html"));
        }
    }

    #[test]
    fn test_not_found_route() {
        let route = RoutePath::not_found();
        assert!(route.is_not_found());
        assert!(RoutePath::new("/__pagesmith__/404/").is_not_found());
        assert!(!RoutePath::new("/404").is_not_found());
    }

    #[test]
    fn test_page_file_layout() {
        let root = Path::new("/site/dist");
        assert_eq!(
            RoutePath::new("/").page_file(root).unwrap(),
            PathBuf::from("/site/dist/index.html")
        );
        assert_eq!(
            RoutePath::new("/blog/post-1").page_file(root).unwrap(),
            PathBuf::from("/site/dist/blog/post-1/index.html")
        );
    }

    #[test]
    fn test_escaping_routes_are_rejected() {
        assert!(RoutePath::new("/../etc").relative_dir().is_none());
        assert!(RoutePath::new("/a/../../b").relative_dir().is_none());
        assert!(RoutePath::new("/a\\b").relative_dir().is_none());
        assert_eq!(RoutePath::new("/a/../b").as_str(), "/a/../b");
        assert!(RoutePath::new("/a/./b").relative_dir().is_some());
    }

    #[test]
    fn test_serde_canonicalizes() {
        let routes: Vec<RoutePath> = serde_json::from_str(r#"["about/", "/x"]"#).unwrap();
        assert_eq!(routes, vec![RoutePath::new("/about"), RoutePath::new("/x")]);
        assert_eq!(serde_json::to_string(&routes[0]).unwrap(), r#""/about""#);
    }
}

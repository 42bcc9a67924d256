//! Storage-root containment for client-supplied paths.
//!
//! # Design
//! - Canonicalize the storage root once; resolution afterwards is lexical and touches no files.
//! - Treat every client path as root-relative, collapse `.`/`..`, and reject anything that
//!   would climb above the root instead of clamping it.
//! - Item names must be a single path segment.
//! - Symlinks are not consulted. A link inside the root that targets a directory outside it
//!   is followed by the filesystem calls made on the resolved path, so the storage root
//!   must not contain such links.

use std::path::{Component, Path, PathBuf, is_separator};

use crate::error::{ErrorKind, FsOpsError, FsOpsResult};

/// Maps logical client paths to absolute paths confined to the storage root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Build a resolver for an existing storage root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be canonicalized or is not a directory.
    pub fn new(root: impl AsRef<Path>) -> FsOpsResult<Self> {
        let root = root.as_ref();
        let canonical = std::fs::canonicalize(root).map_err(|source| {
            FsOpsError::io(ErrorKind::NotFound, "resolver.canonicalize_root", root, source)
        })?;
        if !canonical.is_dir() {
            return Err(FsOpsError::InvalidInput {
                field: "storage_root",
                reason: "not_a_directory",
                value: Some(canonical.to_string_lossy().into_owned()),
            });
        }
        Ok(Self { root: canonical })
    }

    /// Canonical storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path against the storage root.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::PathEscape`] when the path contains a null byte or its
    /// normalized form leaves the root.
    pub fn resolve(&self, logical: &str) -> FsOpsResult<PathBuf> {
        if logical.contains('\0') {
            return Err(FsOpsError::escape(logical));
        }

        let mut resolved = self.root.clone();
        for component in Path::new(logical).components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::ParentDir => {
                    if resolved == self.root {
                        return Err(FsOpsError::escape(logical));
                    }
                    resolved.pop();
                }
                Component::Normal(segment) => resolved.push(segment),
            }
        }

        if !resolved.starts_with(&self.root) {
            return Err(FsOpsError::escape(logical));
        }
        Ok(resolved)
    }

    /// Resolve a single entry name inside an already resolved directory.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::PathEscape`] when `name` is not exactly one normal path
    /// segment or `dir` is not inside the root.
    pub fn resolve_child(&self, dir: &Path, name: &str) -> FsOpsResult<PathBuf> {
        if !dir.starts_with(&self.root) || name.contains('\0') || name.chars().any(is_separator)
        {
            return Err(FsOpsError::escape(name));
        }

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(segment)), None) => Ok(dir.join(segment)),
            _ => Err(FsOpsError::escape(name)),
        }
    }

    /// Whether `path` is the storage root itself.
    #[must_use]
    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    fn resolver() -> Result<(TempDir, PathResolver)> {
        let temp = tempfile::Builder::new().prefix("fileman-resolver-").tempdir()?;
        let resolver = PathResolver::new(temp.path())?;
        Ok((temp, resolver))
    }

    #[test]
    fn resolves_plain_and_rooted_paths() -> Result<()> {
        let (_temp, resolver) = resolver()?;
        let root = resolver.root().to_path_buf();

        assert_eq!(resolver.resolve("")?, root);
        assert_eq!(resolver.resolve("/")?, root);
        assert_eq!(resolver.resolve("/a/b")?, root.join("a").join("b"));
        assert_eq!(resolver.resolve("a/./b/")?, root.join("a").join("b"));
        assert_eq!(resolver.resolve("/a/../b")?, root.join("b"));
        Ok(())
    }

    #[test]
    fn rejects_paths_that_climb_above_root() -> Result<()> {
        let (_temp, resolver) = resolver()?;
        for logical in ["..", "/..", "../etc/passwd", "/a/../../b", "a/b/../../../c"] {
            let err = resolver
                .resolve(logical)
                .err()
                .ok_or_else(|| anyhow::anyhow!("expected escape for {logical}"))?;
            assert_eq!(err.kind(), ErrorKind::PathEscape, "{logical}");
        }
        Ok(())
    }

    #[test]
    fn parent_segments_never_leave_root() -> Result<()> {
        let (_temp, resolver) = resolver()?;
        let inputs = [
            "a/../b",
            "a/b/../../c",
            "../a",
            "a/../../a",
            "./../../..",
            "x/y/z/../../../..",
            "x/../y/../z",
        ];
        for logical in inputs {
            if let Ok(path) = resolver.resolve(logical) {
                assert!(path.starts_with(resolver.root()), "{logical} -> {path:?}");
            }
        }
        Ok(())
    }

    #[test]
    fn rejects_null_bytes() -> Result<()> {
        let (_temp, resolver) = resolver()?;
        assert!(resolver.resolve("a\0b").is_err());
        Ok(())
    }

    #[test]
    fn child_names_must_be_single_segments() -> Result<()> {
        let (_temp, resolver) = resolver()?;
        let dir = resolver.resolve("/docs")?;
        assert_eq!(resolver.resolve_child(&dir, "a.txt")?, dir.join("a.txt"));

        for name in ["", ".", "..", "../x", "a/b", "/abs", "nul\0"] {
            let err = resolver
                .resolve_child(&dir, name)
                .err()
                .ok_or_else(|| anyhow::anyhow!("expected escape for {name:?}"))?;
            assert_eq!(err.kind(), ErrorKind::PathEscape);
        }
        Ok(())
    }

    #[test]
    fn child_of_foreign_directory_is_rejected() -> Result<()> {
        let (_temp, resolver) = resolver()?;
        assert!(resolver.resolve_child(Path::new("/"), "etc").is_err());
        Ok(())
    }

    #[test]
    fn new_rejects_missing_root() -> Result<()> {
        let (temp, _resolver) = resolver()?;
        let err = PathResolver::new(temp.path().join("missing"))
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected missing root rejection"))?;
        assert!(matches!(err, FsOpsError::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_inside_root_resolve_lexically() -> Result<()> {
        let (temp, resolver) = resolver()?;
        let outside = tempfile::tempdir()?;
        std::os::unix::fs::symlink(outside.path(), temp.path().join("link"))?;

        let resolved = resolver.resolve("/link/file.txt")?;
        assert_eq!(resolved, resolver.root().join("link").join("file.txt"));
        assert!(resolved.starts_with(resolver.root()));
        assert!(resolver.resolve("/link/../../etc").is_err());
        Ok(())
    }
}

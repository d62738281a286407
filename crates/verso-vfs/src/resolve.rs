//! Best-effort symlink resolution for paths, URIs and editor descriptors.
//!
//! Resolution only exists so that a file reached through a symlink and the same file
//! reached through its target compare equal. Every failure falls back to the input.

use std::path::Path;

use verso_core::{TextEditor, Uri, UriChange, WorkspaceFolder, FILE_SCHEME};

use crate::fs::{LocalFs, RealPathFs};
use crate::git_uri::{from_git_uri_resolved_with, GitUriError, GIT_SUFFIX};

#[derive(Debug, Clone, Default)]
pub struct PathResolver<F = LocalFs> {
    fs: F,
}

impl PathResolver<LocalFs> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<F: RealPathFs> PathResolver<F> {
    pub fn with_fs(fs: F) -> Self {
        Self { fs }
    }

    /// Returns the canonical form of `path`, or `path` itself if it cannot be resolved.
    pub fn resolve_path(&self, path: &str) -> String {
        let real = match self.fs.real_path(Path::new(path)) {
            Ok(real) => real,
            Err(err) => {
                tracing::debug!(
                    target: "verso.vfs",
                    path,
                    error = %err,
                    "failed to resolve path; keeping original"
                );
                return path.to_owned();
            }
        };

        match real.into_os_string().into_string() {
            Ok(real) => real,
            Err(real) => {
                tracing::debug!(
                    target: "verso.vfs",
                    path,
                    real = ?real,
                    "resolved path is not valid UTF-8; keeping original"
                );
                path.to_owned()
            }
        }
    }

    /// Returns `uri` with its path replaced by the resolved filesystem path.
    pub fn resolve_uri(&self, uri: &Uri) -> Uri {
        let fs_path = uri.fs_path();
        let resolved = self.resolve_path(&fs_path);
        if resolved == fs_path {
            return uri.clone();
        }
        uri.with_fs_path(&resolved)
    }

    /// Resolves a `git:` URI that may carry the cosmetic `.git` suffix.
    ///
    /// The suffix is stripped before resolving and re-appended afterwards. A non-empty query
    /// is re-encoded with its `path` resolved too. Any failure returns `uri` unchanged.
    pub fn resolve_git_uri(&self, uri: &Uri) -> Uri {
        match self.try_resolve_git_uri(uri) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!(
                    target: "verso.vfs",
                    uri = %uri,
                    error = %err,
                    "failed to resolve git uri; keeping original"
                );
                uri.clone()
            }
        }
    }

    fn try_resolve_git_uri(&self, uri: &Uri) -> Result<Uri, GitUriError> {
        let (base_path, suffix) = match strip_git_suffix(uri.path()) {
            Some(base) => (base, GIT_SUFFIX),
            None => (uri.path(), ""),
        };

        // The locator path mirrors the `file` URI it was encoded from, authority included.
        let source = Uri::from_parts(FILE_SCHEME, uri.authority(), base_path, "", "");
        let resolved = self.resolve_uri(&source);
        let mut change = UriChange::new();
        if resolved != source {
            change = change
                .authority(resolved.authority())
                .path(format!("{}{suffix}", resolved.path()));
        }

        if !uri.query().is_empty() {
            let params = from_git_uri_resolved_with(self, uri)?;
            change = change.query(params.to_query()?);
        }

        Ok(uri.with(change))
    }

    /// Resolves the URI of every folder. Order and all other fields are kept; `None` yields
    /// an empty list.
    pub fn resolve_workspace_folders(
        &self,
        folders: Option<&[WorkspaceFolder]>,
    ) -> Vec<WorkspaceFolder> {
        folders
            .unwrap_or_default()
            .iter()
            .map(|folder| folder.with_uri(self.resolve_uri(&folder.uri)))
            .collect()
    }

    /// Resolves the document URI of every editor. Order and all other fields are kept.
    pub fn resolve_text_editors(&self, editors: &[TextEditor]) -> Vec<TextEditor> {
        editors
            .iter()
            .map(|editor| {
                let document = &editor.document;
                editor.with_document(document.with_uri(self.resolve_uri(&document.uri)))
            })
            .collect()
    }
}

/// Resolves `path` against the local file system. See [`PathResolver::resolve_path`].
pub fn resolve_path(path: &str) -> String {
    PathResolver::new().resolve_path(path)
}

/// See [`PathResolver::resolve_uri`].
pub fn resolve_uri(uri: &Uri) -> Uri {
    PathResolver::new().resolve_uri(uri)
}

/// See [`PathResolver::resolve_git_uri`].
pub fn resolve_git_uri(uri: &Uri) -> Uri {
    PathResolver::new().resolve_git_uri(uri)
}

/// See [`PathResolver::resolve_workspace_folders`].
pub fn resolve_workspace_folders(folders: Option<&[WorkspaceFolder]>) -> Vec<WorkspaceFolder> {
    PathResolver::new().resolve_workspace_folders(folders)
}

/// See [`PathResolver::resolve_text_editors`].
pub fn resolve_text_editors(editors: &[TextEditor]) -> Vec<TextEditor> {
    PathResolver::new().resolve_text_editors(editors)
}

// Only a literal `.git` following a file name counts; `/repo/.git` is a path, not a suffix.
fn strip_git_suffix(path: &str) -> Option<&str> {
    let base = path.strip_suffix(GIT_SUFFIX)?;
    if base.is_empty() || base.ends_with('/') {
        return None;
    }
    Some(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFs;
    use crate::git_uri::{from_git_uri, to_git_uri, GitUriOptions};
    use verso_core::TextDocument;

    fn resolver() -> PathResolver<MemoryFs> {
        PathResolver::with_fs(
            MemoryFs::new()
                .with_file("/real/a.txt")
                .with_file("/real/b.txt")
                .with_link("/link/a.txt", "/real/a.txt")
                .with_link("/link/b.txt", "/real/b.txt")
                .with_link("/ws/link", "/ws/real")
                .with_link("//srv/share/a.txt", "/real/a.txt"),
        )
    }

    #[test]
    fn resolve_path_follows_links() {
        assert_eq!(resolver().resolve_path("/link/a.txt"), "/real/a.txt");
        assert_eq!(resolver().resolve_path("/real/a.txt"), "/real/a.txt");
    }

    #[test]
    fn resolve_path_falls_back_to_input() {
        assert_eq!(resolver().resolve_path("/nowhere/x.txt"), "/nowhere/x.txt");
    }

    #[test]
    fn resolve_path_missing_on_disk_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let missing = missing.to_str().unwrap();
        assert_eq!(resolve_path(missing), missing);
    }

    #[test]
    fn resolve_uri_replaces_only_the_path() {
        let uri: Uri = "vscode-remote://host/link/a.txt?q=1#f".parse().unwrap();
        let resolved = resolver().resolve_uri(&uri);

        assert_eq!(resolved.scheme(), "vscode-remote");
        assert_eq!(resolved.authority(), "host");
        assert_eq!(resolved.path(), "/real/a.txt");
        assert_eq!(resolved.query(), "q=1");
        assert_eq!(resolved.fragment(), "f");
    }

    #[test]
    fn unc_file_uri_resolving_to_local_path_drops_server() {
        let resolved = resolver().resolve_uri(&Uri::file("//srv/share/a.txt"));

        assert_eq!(resolved.authority(), "");
        assert_eq!(resolved.path(), "/real/a.txt");
        assert_eq!(resolved.fs_path(), "/real/a.txt");
        assert_eq!(resolved, resolver().resolve_uri(&Uri::file("/link/a.txt")));
    }

    #[test]
    fn unc_git_uri_resolves_path_and_query_alike() {
        let options = GitUriOptions {
            replace_file_extension: true,
            submodule_of: None,
        };
        let uri = to_git_uri(&Uri::file("//srv/share/a.txt"), "HEAD", &options).unwrap();
        assert_eq!(uri.authority(), "srv");

        let resolved = resolver().resolve_git_uri(&uri);
        assert_eq!(resolved.authority(), "");
        assert_eq!(resolved.path(), "/real/a.txt.git");
        assert_eq!(from_git_uri(&resolved).unwrap().path, "/real/a.txt");
    }

    #[test]
    fn resolve_git_uri_keeps_suffix_and_rewrites_query() {
        let source = Uri::file("/link/a.txt");
        let options = GitUriOptions {
            replace_file_extension: true,
            submodule_of: None,
        };
        let uri = to_git_uri(&source, "HEAD", &options).unwrap();
        assert_eq!(uri.path(), "/link/a.txt.git");

        let resolved = resolver().resolve_git_uri(&uri);
        assert_eq!(resolved.path(), "/real/a.txt.git");
        let params = from_git_uri(&resolved).unwrap();
        assert_eq!(params.path, "/real/a.txt");
        assert_eq!(params.git_ref, "HEAD");
    }

    #[test]
    fn resolve_git_uri_without_suffix_or_query() {
        let uri = Uri::from_parts("git", "", "/link/b.txt", "", "");
        let resolved = resolver().resolve_git_uri(&uri);
        assert_eq!(resolved.path(), "/real/b.txt");
        assert_eq!(resolved.query(), "");
    }

    #[test]
    fn resolve_git_uri_with_malformed_query_is_unchanged() {
        let uri = Uri::from_parts("git", "", "/link/a.txt.git", "{oops", "");
        assert_eq!(resolver().resolve_git_uri(&uri), uri);
    }

    #[test]
    fn git_suffix_must_follow_a_file_name() {
        assert_eq!(strip_git_suffix("/repo/a.txt.git"), Some("/repo/a.txt"));
        assert_eq!(strip_git_suffix("/repo/.git"), None);
        assert_eq!(strip_git_suffix("/repo/a.txtgit"), None);
        assert_eq!(strip_git_suffix(".git"), None);
    }

    #[test]
    fn workspace_folders_keep_order_and_fields() {
        let folders = vec![
            WorkspaceFolder::new(Uri::file("/ws/link"), "first", 0),
            WorkspaceFolder::new(Uri::file("/ws/other"), "second", 1),
        ];
        let resolved = resolver().resolve_workspace_folders(Some(folders.as_slice()));

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].uri.path(), "/ws/real");
        assert_eq!(resolved[0].name, "first");
        assert_eq!(resolved[0].index, 0);
        assert_eq!(resolved[1], folders[1]);
    }

    #[test]
    fn workspace_folders_absent_or_empty_yield_empty() {
        assert!(resolver().resolve_workspace_folders(None).is_empty());
        assert!(resolver()
            .resolve_workspace_folders(Some(&[][..]))
            .is_empty());
    }

    #[test]
    fn text_editors_resolve_inner_document_uri_only() {
        let mut dirty = TextDocument::new(Uri::file("/link/b.txt"), "plaintext", 7);
        dirty.is_dirty = true;
        let editors = vec![
            TextEditor::new(TextDocument::new(Uri::file("/link/a.txt"), "rust", 1), Some(1)),
            TextEditor::new(dirty, None),
        ];

        let resolved = resolver().resolve_text_editors(&editors);
        assert_eq!(resolved.len(), 2);

        assert_eq!(resolved[0].document.uri.path(), "/real/a.txt");
        assert_eq!(resolved[0].document.language_id, "rust");
        assert_eq!(resolved[0].view_column, Some(1));

        assert_eq!(resolved[1].document.uri.path(), "/real/b.txt");
        assert_eq!(resolved[1].document.version, 7);
        assert!(resolved[1].document.is_dirty);
        assert_eq!(resolved[1].view_column, None);

        // Inputs are untouched.
        assert_eq!(editors[0].document.uri.path(), "/link/a.txt");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_and_real_uris_compare_equal_after_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let real_dir = root.join("real");
        std::fs::create_dir(&real_dir).unwrap();
        std::fs::write(real_dir.join("a.txt"), "content").unwrap();
        std::os::unix::fs::symlink(&real_dir, root.join("link")).unwrap();

        let via_link = Uri::file(root.join("link/a.txt").to_str().unwrap());
        let via_real = Uri::file(real_dir.join("a.txt").to_str().unwrap());
        assert_ne!(via_link, via_real);
        assert_eq!(resolve_uri(&via_link), resolve_uri(&via_real));
    }

    #[cfg(unix)]
    #[test]
    fn git_uri_on_disk_keeps_suffix_after_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let target = root.join("target.rs");
        std::fs::write(&target, "fn main() {}").unwrap();
        let link = root.join("link.rs");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let options = GitUriOptions {
            replace_file_extension: true,
            submodule_of: None,
        };
        let uri = to_git_uri(&Uri::file(link.to_str().unwrap()), "HEAD~1", &options).unwrap();
        let resolved = resolve_git_uri(&uri);

        let expected = format!("{}.git", target.to_str().unwrap());
        assert_eq!(resolved.path(), expected);
        assert_eq!(from_git_uri(&resolved).unwrap().path, target.to_str().unwrap());
    }
}

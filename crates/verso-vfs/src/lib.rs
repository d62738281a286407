//! Virtual resource locators for version-controlled content.
//!
//! - [`git_uri`]: encode/decode `git:` URIs that name a file at a revision or merge stage.
//! - [`resolve`]: best-effort symlink resolution for paths, URIs and editor descriptors.
//! - [`RealPathFs`]: the filesystem port used for resolution.

mod fs;
pub mod git_uri;
pub mod resolve;

pub use fs::{LocalFs, MemoryFs, RealPathFs};
pub use git_uri::{
    from_git_uri, from_git_uri_resolved, from_git_uri_resolved_with, is_git_uri, to_git_uri,
    to_merge_uris, GitUriError, GitUriOptions, GitUriParams, MergeUris, BASE_REF, DIFF_SUFFIX,
    GIT_SCHEME, GIT_SUFFIX, OURS_REF, THEIRS_REF,
};
pub use resolve::{
    resolve_git_uri, resolve_path, resolve_text_editors, resolve_uri, resolve_workspace_folders,
    PathResolver,
};

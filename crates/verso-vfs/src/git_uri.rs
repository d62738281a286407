//! Encoding of version-controlled content (a file at a revision, a merge stage) as `git:`
//! URIs.
//!
//! The URI keeps the source path in its `path` component (optionally with a cosmetic
//! `.git`/`.diff` suffix for file-type detection) and carries the real location in a JSON
//! query: `{"path":"/repo/a.txt","ref":"HEAD","submoduleOf":"/repo"}`. Decoding always
//! reads the query, never the path component.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use verso_core::{Uri, UriChange};

use crate::fs::RealPathFs;
use crate::resolve::PathResolver;

/// Scheme reserved for virtual version-controlled content.
pub const GIT_SCHEME: &str = "git";

/// Suffix appended when [`GitUriOptions::replace_file_extension`] is set.
pub const GIT_SUFFIX: &str = ".git";

/// Suffix appended for submodule comparisons.
pub const DIFF_SUFFIX: &str = ".diff";

/// Index stage of the common ancestor during a conflicted merge.
pub const BASE_REF: &str = ":1";
/// Index stage of our side during a conflicted merge.
pub const OURS_REF: &str = ":2";
/// Index stage of their side during a conflicted merge.
pub const THEIRS_REF: &str = ":3";

#[derive(Debug, Error)]
pub enum GitUriError {
    #[error("invalid git uri query in {uri}: {source}")]
    InvalidQuery {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode git uri params for {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The payload of a `git:` URI.
///
/// Field order and names are part of the wire format.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitUriParams {
    /// Filesystem path of the file.
    pub path: String,
    /// Revision or index stage the content is taken from.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Root of the parent repository when comparing inside a submodule.
    #[serde(
        rename = "submoduleOf",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub submodule_of: Option<String>,
}

impl GitUriParams {
    pub fn new(path: impl Into<String>, git_ref: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            git_ref: git_ref.into(),
            submodule_of: None,
        }
    }

    /// Compact JSON form stored in the URI query.
    pub fn to_query(&self) -> Result<String, GitUriError> {
        serde_json::to_string(self).map_err(|source| GitUriError::Encode {
            path: self.path.clone(),
            source,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GitUriOptions {
    /// Append `.git` to the URI path. Takes precedence over the `.diff` suffix.
    pub replace_file_extension: bool,
    pub submodule_of: Option<String>,
}

/// The three sides of a conflicted merge, in base/ours/theirs order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeUris {
    pub base: Uri,
    pub ours: Uri,
    pub theirs: Uri,
}

impl MergeUris {
    pub fn into_array(self) -> [Uri; 3] {
        [self.base, self.ours, self.theirs]
    }
}

pub fn is_git_uri(uri: &Uri) -> bool {
    uri.scheme() == GIT_SCHEME
}

/// Encodes `uri` at revision `git_ref` as a `git:` URI.
///
/// Authority and fragment of `uri` are carried over unchanged.
pub fn to_git_uri(
    uri: &Uri,
    git_ref: &str,
    options: &GitUriOptions,
) -> Result<Uri, GitUriError> {
    let params = GitUriParams {
        path: uri.fs_path(),
        git_ref: git_ref.to_owned(),
        submodule_of: options.submodule_of.clone(),
    };

    let path = if options.replace_file_extension {
        format!("{}{GIT_SUFFIX}", uri.path())
    } else if options.submodule_of.is_some() {
        format!("{}{DIFF_SUFFIX}", uri.path())
    } else {
        uri.path().to_owned()
    };

    Ok(uri.with(
        UriChange::new()
            .scheme(GIT_SCHEME)
            .path(path)
            .query(params.to_query()?),
    ))
}

/// Decodes the params stored in the query of a `git:` URI.
///
/// A query that is not valid params JSON is an error; it is never replaced with defaults.
pub fn from_git_uri(uri: &Uri) -> Result<GitUriParams, GitUriError> {
    serde_json::from_str(uri.query()).map_err(|source| GitUriError::InvalidQuery {
        uri: uri.to_string(),
        source,
    })
}

/// Like [`from_git_uri`], but replaces `path` with its symlink-resolved form.
///
/// Decoding errors propagate; resolution failures keep the decoded path.
pub fn from_git_uri_resolved(uri: &Uri) -> Result<GitUriParams, GitUriError> {
    from_git_uri_resolved_with(&PathResolver::new(), uri)
}

pub fn from_git_uri_resolved_with<F: RealPathFs>(
    resolver: &PathResolver<F>,
    uri: &Uri,
) -> Result<GitUriParams, GitUriError> {
    let mut params = from_git_uri(uri)?;
    params.path = resolver.resolve_path(&params.path);
    Ok(params)
}

/// Builds the base/ours/theirs URIs used by a three-way merge view of `uri`.
pub fn to_merge_uris(uri: &Uri) -> Result<MergeUris, GitUriError> {
    let options = GitUriOptions::default();
    Ok(MergeUris {
        base: to_git_uri(uri, BASE_REF, &options)?,
        ours: to_git_uri(uri, OURS_REF, &options)?,
        theirs: to_git_uri(uri, THEIRS_REF, &options)?,
    })
}

//! Core shared types for Verso.
//!
//! This crate holds the generic resource identifier ([`Uri`]) and the editor-facing
//! descriptors that wrap it. It performs no filesystem access.

mod uri;
mod workspace;

pub use uri::{fs_path_to_uri_path, Uri, UriChange, UriError, FILE_SCHEME};
pub use workspace::{TextDocument, TextEditor, WorkspaceFolder};

use serde::{Deserialize, Serialize};

use crate::Uri;

/// A root folder opened in the editor workspace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFolder {
    pub uri: Uri,
    pub name: String,
    /// Position of this folder in the workspace's folder list.
    pub index: usize,
}

impl WorkspaceFolder {
    pub fn new(uri: Uri, name: impl Into<String>, index: usize) -> Self {
        Self {
            uri,
            name: name.into(),
            index,
        }
    }

    /// Returns a copy of this folder pointing at `uri`.
    pub fn with_uri(&self, uri: Uri) -> Self {
        Self {
            uri,
            ..self.clone()
        }
    }
}

/// A document as tracked by the editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocument {
    pub uri: Uri,
    pub language_id: String,
    pub version: i32,
    #[serde(default)]
    pub is_dirty: bool,
}

impl TextDocument {
    pub fn new(uri: Uri, language_id: impl Into<String>, version: i32) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version,
            is_dirty: false,
        }
    }

    pub fn with_uri(&self, uri: Uri) -> Self {
        Self {
            uri,
            ..self.clone()
        }
    }
}

/// An editor view showing a [`TextDocument`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEditor {
    pub document: TextDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_column: Option<u32>,
}

impl TextEditor {
    pub fn new(document: TextDocument, view_column: Option<u32>) -> Self {
        Self {
            document,
            view_column,
        }
    }

    pub fn with_document(&self, document: TextDocument) -> Self {
        Self {
            document,
            ..self.clone()
        }
    }
}

//! Document-box shapes exchanged with the tenant gateway.
//!
//! Timestamps are kept as the RFC 3339 strings the server sends.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBox {
    pub scope: String,
    pub created_at: String,
}

/// Paging and search parameters for listing document boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBoxesQuery {
    /// Filter on scope text.
    #[serde(default)]
    pub query: Option<String>,
    pub offset: u64,
    pub limit: u64,
}

impl DocumentBoxesQuery {
    pub fn page(offset: u64, limit: u64) -> Self {
        Self {
            query: None,
            offset,
            limit,
        }
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

impl Default for DocumentBoxesQuery {
    fn default() -> Self {
        Self::page(0, 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBoxesPage {
    pub results: Vec<DocumentBox>,
    /// Total matching boxes, ignoring paging.
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFolder {
    pub id: String,
    pub name: String,
    /// Parent folder. `None` for a box's root folder.
    #[serde(default)]
    pub folder_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFile {
    pub id: String,
    pub name: String,
    pub mime: String,
    pub folder_id: String,
    pub size: u64,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLink {
    pub id: String,
    pub name: String,
    pub value: String,
    pub folder_id: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderChildren {
    #[serde(default)]
    pub folders: Vec<DocFolder>,
    #[serde(default)]
    pub files: Vec<DocFile>,
    #[serde(default)]
    pub links: Vec<DocLink>,
}

/// A box together with its root folder contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDocumentBox {
    pub document_box: DocumentBox,
    pub root: DocFolder,
    pub children: FolderChildren,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFolder {
    pub folder: DocFolder,
    pub children: FolderChildren,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentBoxStats {
    pub total_files: u64,
    pub total_links: u64,
    pub total_folders: u64,
    /// Combined size of all files in bytes.
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFolder {
    pub name: String,
    /// Parent folder.
    pub folder_id: String,
}

/// A file to upload into a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub folder_id: String,
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

//! Document-box bindings for one tenant.
//!
//! The box/folder/file operations themselves belong to the document-box
//! client, reached through the tenant gateway. [`DocumentBoxApi`] is that
//! seam; [`DocboxBindings`] wraps it with cache keys from the tenant's branch
//! and the invalidations each write implies.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{AdminError, Result};
use crate::keys::DocboxKeys;
use crate::query::{KeyFilter, Mutation, QueryClient, QueryOptions, Subscription};
use crate::scope::{ScopeContext, TenantScope};
use crate::types::{
    CreateFolder, DocFile, DocFolder, DocumentBox, DocumentBoxStats, DocumentBoxesPage,
    DocumentBoxesQuery, ResolvedDocumentBox, ResolvedFolder, UploadFile,
};

/// Document-box operations for a single tenant.
#[async_trait]
pub trait DocumentBoxApi: Send + Sync {
    async fn list_boxes(&self, query: &DocumentBoxesQuery) -> Result<DocumentBoxesPage>;

    /// A box with its root folder contents.
    async fn get_box(&self, scope: &str) -> Result<ResolvedDocumentBox>;

    async fn box_stats(&self, scope: &str) -> Result<DocumentBoxStats>;

    async fn get_folder(&self, scope: &str, folder_id: &str) -> Result<ResolvedFolder>;

    async fn create_box(&self, scope: &str) -> Result<DocumentBox>;

    async fn create_folder(&self, scope: &str, request: &CreateFolder) -> Result<DocFolder>;

    async fn upload_file(&self, scope: &str, upload: &UploadFile) -> Result<DocFile>;
}

/// Read and write bindings for one tenant's document boxes.
#[derive(Clone)]
pub struct DocboxBindings {
    queries: QueryClient,
    tenant: TenantScope,
    keys: DocboxKeys,
    api: Arc<dyn DocumentBoxApi>,
}

impl DocboxBindings {
    pub fn new(queries: &QueryClient, tenant: TenantScope, api: Arc<dyn DocumentBoxApi>) -> Self {
        Self {
            queries: queries.clone(),
            keys: tenant.keys(),
            tenant,
            api,
        }
    }

    pub fn tenant(&self) -> &TenantScope {
        &self.tenant
    }

    pub fn keys(&self) -> &DocboxKeys {
        &self.keys
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn document_boxes_query(&self, query: DocumentBoxesQuery) -> QueryOptions<DocumentBoxesPage> {
        let api = Arc::clone(&self.api);
        QueryOptions::new(self.keys.boxes_query(&query), move || {
            let api = Arc::clone(&api);
            let query = query.clone();
            async move { api.list_boxes(&query).await }
        })
    }

    pub fn document_boxes(&self, query: DocumentBoxesQuery) -> Subscription<DocumentBoxesPage> {
        self.queries.subscribe(self.document_boxes_query(query))
    }

    /// The selected box. Disabled while no box is selected.
    pub fn document_box_query(&self, scope: Option<&str>) -> QueryOptions<ResolvedDocumentBox> {
        let api = Arc::clone(&self.api);
        let selected = scope.map(str::to_string);
        QueryOptions::new(self.keys.document_box(scope), move || {
            let api = Arc::clone(&api);
            let selected = selected.clone();
            async move { api.get_box(&require_scope(selected)?).await }
        })
        .enabled(scope.is_some())
    }

    pub fn document_box(&self, scope: Option<&str>) -> Subscription<ResolvedDocumentBox> {
        self.queries.subscribe(self.document_box_query(scope))
    }

    pub fn box_stats_query(&self, scope: Option<&str>) -> QueryOptions<DocumentBoxStats> {
        let api = Arc::clone(&self.api);
        let selected = scope.map(str::to_string);
        QueryOptions::new(self.keys.box_stats(scope), move || {
            let api = Arc::clone(&api);
            let selected = selected.clone();
            async move { api.box_stats(&require_scope(selected)?).await }
        })
        .enabled(scope.is_some())
    }

    pub fn box_stats(&self, scope: Option<&str>) -> Subscription<DocumentBoxStats> {
        self.queries.subscribe(self.box_stats_query(scope))
    }

    /// A folder in the selected box. `folder_id` of `None` is the box root.
    pub fn folder_query(
        &self,
        scope: Option<&str>,
        folder_id: Option<&str>,
    ) -> QueryOptions<ResolvedFolder> {
        let api = Arc::clone(&self.api);
        let selected = scope.map(str::to_string);
        let folder = folder_id.map(str::to_string);
        QueryOptions::new(self.keys.folder(scope, folder_id), move || {
            let api = Arc::clone(&api);
            let selected = selected.clone();
            let folder = folder.clone();
            async move {
                let scope = require_scope(selected)?;
                match folder {
                    Some(folder_id) => api.get_folder(&scope, &folder_id).await,
                    None => {
                        let resolved = api.get_box(&scope).await?;
                        Ok(ResolvedFolder {
                            folder: resolved.root,
                            children: resolved.children,
                        })
                    }
                }
            }
        })
        .enabled(scope.is_some())
    }

    pub fn folder(&self, scope: Option<&str>, folder_id: Option<&str>) -> Subscription<ResolvedFolder> {
        self.queries.subscribe(self.folder_query(scope, folder_id))
    }

    /// The folder selected in `context`.
    ///
    /// Fails if `context` belongs to a different tenant than these bindings.
    pub fn selected_folder(&self, context: &ScopeContext) -> Result<Subscription<ResolvedFolder>> {
        if context.tenant != self.tenant {
            return Err(AdminError::InvalidInput(format!(
                "selection for tenant {} does not match bindings for {}",
                context.tenant, self.tenant
            )));
        }
        Ok(self.folder(context.document_box.as_deref(), context.folder_id.as_deref()))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    pub fn create_document_box(&self) -> Mutation<String, DocumentBox> {
        let api = Arc::clone(&self.api);
        let boxes = self.keys.boxes();
        Mutation::new(&self.queries, "create_document_box", move |scope: String| {
            let api = Arc::clone(&api);
            async move { api.create_box(&scope).await }
        })
        .invalidates(move |_| vec![boxes.clone().into()])
    }

    pub fn create_folder(&self, scope: &str) -> Mutation<CreateFolder, DocFolder> {
        let api = Arc::clone(&self.api);
        let keys = self.keys.clone();
        let scope = scope.to_string();
        let target = scope.clone();
        Mutation::new(&self.queries, "create_folder", move |request: CreateFolder| {
            let api = Arc::clone(&api);
            let scope = target.clone();
            async move { api.create_folder(&scope, &request).await }
        })
        .invalidates(move |request| folder_changed(&keys, &scope, &request.folder_id))
    }

    /// Upload a file. On completion the containing folder, the box and its
    /// stats refetch.
    pub fn upload_file(&self, scope: &str) -> Mutation<UploadFile, DocFile> {
        let api = Arc::clone(&self.api);
        let keys = self.keys.clone();
        let scope = scope.to_string();
        let target = scope.clone();
        Mutation::new(&self.queries, "upload_file", move |upload: UploadFile| {
            let api = Arc::clone(&api);
            let scope = target.clone();
            async move { api.upload_file(&scope, &upload).await }
        })
        .invalidates(move |upload| folder_changed(&keys, &scope, &upload.folder_id))
    }
}

/// Keys made stale by a change inside `folder_id`.
///
/// The root folder is also reachable through the `None` folder key and the
/// box key, so both go too.
fn folder_changed(keys: &DocboxKeys, scope: &str, folder_id: &str) -> Vec<KeyFilter> {
    vec![
        KeyFilter::Exact(keys.folder(Some(scope), Some(folder_id))),
        KeyFilter::Exact(keys.folder(Some(scope), None)),
        KeyFilter::Exact(keys.document_box(Some(scope))),
        KeyFilter::Exact(keys.box_stats(Some(scope))),
    ]
}

fn require_scope(scope: Option<String>) -> Result<String> {
    scope.ok_or_else(|| AdminError::InvalidInput("no document box selected".to_string()))
}

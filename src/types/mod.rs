//! Wire types for the admin API and the document-box gateway.

mod auth;
mod docbox;
mod root;
mod tenant;

pub use auth::{AuthenticateRequest, IsAuthenticatedResponse};
pub use docbox::{
    CreateFolder, DocFile, DocFolder, DocLink, DocumentBox, DocumentBoxStats, DocumentBoxesPage,
    DocumentBoxesQuery, FolderChildren, ResolvedDocumentBox, ResolvedFolder, UploadFile,
};
pub use root::{IsInitializedResponse, MigrateTenants, TenantWithMigrations};
pub use tenant::{CreateTenant, Tenant};

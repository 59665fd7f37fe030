//! Key registry.
//!
//! Pure constructors for every cache key the admin client uses. Keys for a
//! child scope always extend the parent's key, so a prefix invalidation of a
//! parent reaches every child. Absent scope values become
//! [`KeySegment::Null`] rather than being omitted.

use crate::query::{KeySegment, QueryKey};
use crate::scope::TenantScope;
use crate::types::DocumentBoxesQuery;

pub mod auth {
    use super::*;

    pub fn root() -> QueryKey {
        QueryKey::new(["auth"])
    }

    pub fn is_authenticated() -> QueryKey {
        root().child("is-authenticated")
    }
}

pub mod root {
    use super::*;

    pub fn root() -> QueryKey {
        QueryKey::new(["root"])
    }

    pub fn initialized() -> QueryKey {
        root().child("initialized")
    }

    /// Pending migrations across all tenants.
    pub fn migrations() -> QueryKey {
        root().child("migrations")
    }
}

pub mod tenant {
    use super::*;

    pub fn root() -> QueryKey {
        QueryKey::new(["tenant"])
    }

    pub fn list() -> QueryKey {
        root().child("list")
    }

    /// Detail keys live under their own branch so an environment named
    /// `list` cannot collide with the tenant list.
    pub fn details() -> QueryKey {
        root().child("detail")
    }

    pub fn detail(env: &str, tenant_id: &str) -> QueryKey {
        details().extend([env, tenant_id])
    }
}

pub mod docbox {
    use super::*;

    /// Every docbox key for every tenant.
    pub fn root() -> QueryKey {
        QueryKey::new(["docbox"])
    }

    pub fn instance(scope: &TenantScope) -> DocboxKeys {
        DocboxKeys {
            root: root().extend([scope.env.as_str(), scope.tenant_id.as_str()]),
        }
    }
}

/// Keys for one tenant's document boxes.
///
/// Rooted at `["docbox", env, tenant_id]`. Environment and tenant id are
/// separate segments, so no two tenants share a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocboxKeys {
    root: QueryKey,
}

impl DocboxKeys {
    pub fn root(&self) -> QueryKey {
        self.root.clone()
    }

    /// Every document box listing, regardless of query.
    pub fn boxes(&self) -> QueryKey {
        self.root.child("boxes")
    }

    pub fn boxes_query(&self, query: &DocumentBoxesQuery) -> QueryKey {
        self.boxes().child(KeySegment::params(query))
    }

    /// A single box. `None` is the "no box selected" key.
    pub fn document_box(&self, scope: Option<&str>) -> QueryKey {
        self.root.child("box").child(KeySegment::optional(scope))
    }

    pub fn box_stats(&self, scope: Option<&str>) -> QueryKey {
        self.document_box(scope).child("stats")
    }

    /// A folder within a box. `None` is the box's root folder.
    pub fn folder(&self, scope: Option<&str>, folder_id: Option<&str>) -> QueryKey {
        self.document_box(scope)
            .child("folder")
            .child(KeySegment::optional(folder_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::KeyFilter;

    fn acme() -> TenantScope {
        TenantScope::new("prod", "acme")
    }

    #[test]
    fn static_keys() {
        assert_eq!(auth::is_authenticated().to_string(), r#"["auth", "is-authenticated"]"#);
        assert_eq!(root::migrations().to_string(), r#"["root", "migrations"]"#);
        assert_eq!(tenant::list().to_string(), r#"["tenant", "list"]"#);
    }

    #[test]
    fn tenant_detail_does_not_collide_with_list() {
        let list = tenant::list();
        let odd = tenant::detail("list", "x");
        assert!(!KeyFilter::Exact(list.clone()).matches(&odd));
        assert!(!odd.starts_with(&list));
    }

    #[test]
    fn docbox_keys_extend_instance_root() {
        let keys = docbox::instance(&acme());
        let folder = keys.folder(Some("inbox"), Some("f1"));
        assert!(folder.starts_with(&keys.document_box(Some("inbox"))));
        assert!(folder.starts_with(&keys.root()));
        assert!(folder.starts_with(&docbox::root()));
        assert!(keys.box_stats(Some("inbox")).starts_with(&keys.document_box(Some("inbox"))));
    }

    #[test]
    fn absent_scope_is_distinct_from_empty() {
        let keys = docbox::instance(&acme());
        assert_ne!(keys.document_box(None), keys.document_box(Some("")));
        assert_eq!(keys.document_box(None).len(), keys.document_box(Some("")).len());
        assert_ne!(keys.folder(Some("a"), None), keys.folder(Some("a"), Some("")));
    }

    #[test]
    fn composite_identity_does_not_collide() {
        let a = docbox::instance(&TenantScope::new("ab", "c"));
        let b = docbox::instance(&TenantScope::new("a", "bc"));
        assert_ne!(a.root(), b.root());
        assert!(!a.boxes().starts_with(&b.root()));
    }

    #[test]
    fn box_queries_are_keyed_by_value() {
        let keys = docbox::instance(&acme());
        let first = keys.boxes_query(&DocumentBoxesQuery::page(0, 100));
        let second = keys.boxes_query(&DocumentBoxesQuery::page(100, 100));
        assert_ne!(first, second);
        assert_eq!(first, keys.boxes_query(&DocumentBoxesQuery::page(0, 100)));
        assert!(first.starts_with(&keys.boxes()));
    }
}

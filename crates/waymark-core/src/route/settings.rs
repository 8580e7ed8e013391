//! Group settings overlay

use crate::middleware::{Middleware, MiddlewareChain};
use std::sync::Arc;
use waymark_pattern::Constraints;

/// Separator between namespace parts, `App\Controllers`
pub const NAMESPACE_SEPARATOR: &str = "\\";

/// Settings a group passes down to everything registered inside it.
///
/// Merging a child overlay onto a parent concatenates prefix, namespace,
/// middleware and name prefix, while the innermost domain wins.
/// Constraints accumulate with the child overriding the same name.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub(crate) prefix: Option<String>,
    pub(crate) namespace: Option<String>,
    pub(crate) domain: Option<String>,
    pub(crate) middleware: MiddlewareChain,
    pub(crate) name_prefix: String,
    pub(crate) constraints: Constraints,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// A namespace starting with `\` replaces the inherited one
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Host pattern, e.g. `{account}.example.com`
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.add(middleware);
        self
    }

    pub fn middleware_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Prepended to the names of routes registered in the group
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix.push_str(&prefix.into());
        self
    }

    /// Constraint for a parameter that has no inline regex
    pub fn where_param(mut self, name: impl Into<String>, regex: impl Into<String>) -> Self {
        self.constraints.insert(name.into(), regex.into());
        self
    }

    /// Full URL prefix, `/` when none is set
    pub fn prefix_url(&self) -> String {
        join_url(self.prefix.as_deref().unwrap_or(""), "")
    }

    pub fn namespace_str(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn domain_str(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn middleware_chain(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Overlay `child` onto these settings
    pub fn merge(&self, child: &Settings) -> Settings {
        let prefix = match (&self.prefix, &child.prefix) {
            (Some(outer), Some(inner)) => Some(join_url(outer, inner)),
            (outer, inner) => inner.clone().or_else(|| outer.clone()),
        };

        let mut middleware = self.middleware.clone();
        middleware.extend(&child.middleware);

        let mut constraints = self.constraints.clone();
        constraints.extend(child.constraints.clone());

        Settings {
            prefix,
            namespace: join_namespace(self.namespace.as_deref(), child.namespace.as_deref()),
            domain: child.domain.clone().or_else(|| self.domain.clone()),
            middleware,
            name_prefix: format!("{}{}", self.name_prefix, child.name_prefix),
            constraints,
        }
    }
}

/// Join URL parts with single slashes: `/api/` + `/v1` = `/api/v1`
pub fn join_url(base: &str, tail: &str) -> String {
    let parts: Vec<&str> = [base, tail]
        .into_iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect();

    format!("/{}", parts.join("/"))
}

/// Join namespaces with [`NAMESPACE_SEPARATOR`].
///
/// A child starting with the separator is absolute and replaces the parent.
pub fn join_namespace(parent: Option<&str>, child: Option<&str>) -> Option<String> {
    let trim = |ns: &str| ns.trim_matches('\\').to_string();
    let parent = parent.map(trim).filter(|ns| !ns.is_empty());

    match child {
        Some(child) if child.starts_with(NAMESPACE_SEPARATOR) => {
            Some(trim(child)).filter(|ns| !ns.is_empty())
        }
        Some(child) if !trim(child).is_empty() => match parent {
            Some(parent) => Some(format!("{}{}{}", parent, NAMESPACE_SEPARATOR, trim(child))),
            None => Some(trim(child)),
        },
        _ => parent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("/api", "/v1"), "/api/v1");
        assert_eq!(join_url("/api/", "users/{id}"), "/api/users/{id}");
        assert_eq!(join_url("", "/"), "/");
        assert_eq!(join_url("/", ""), "/");
    }

    #[test]
    fn test_join_namespace() {
        assert_eq!(join_namespace(Some("App"), Some("Api")).as_deref(), Some("App\\Api"));
        assert_eq!(join_namespace(None, Some("Api")).as_deref(), Some("Api"));
        assert_eq!(join_namespace(Some("App"), None).as_deref(), Some("App"));
        assert_eq!(
            join_namespace(Some("App"), Some("\\Other\\Ns")).as_deref(),
            Some("Other\\Ns")
        );
        assert_eq!(join_namespace(None, None), None);
    }

    #[test]
    fn test_merge_nested() {
        let outer = Settings::new()
            .prefix("/api")
            .namespace("App")
            .domain("api.example.com")
            .name_prefix("api.")
            .where_param("id", "\\d+");
        let inner = Settings::new()
            .prefix("/v1")
            .namespace("Api")
            .name_prefix("v1.")
            .where_param("slug", "[a-z-]+");

        let merged = outer.merge(&inner);
        assert_eq!(merged.prefix_url(), "/api/v1");
        assert_eq!(merged.namespace_str(), Some("App\\Api"));
        assert_eq!(merged.domain_str(), Some("api.example.com"));
        assert_eq!(merged.name_prefix, "api.v1.");
        assert_eq!(merged.constraints.len(), 2);

        let deeper = merged.merge(&Settings::new().domain("admin.example.com"));
        assert_eq!(deeper.domain_str(), Some("admin.example.com"));
        assert_eq!(deeper.prefix_url(), "/api/v1");
    }
}

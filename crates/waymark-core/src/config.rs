//! Router configuration

/// How many matching routes a request dispatches to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Stop at the first route that matches
    #[default]
    FirstMatch,
    /// Dispatch every matching route in registration order, appending outputs
    AllMatches,
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// First-match or all-matches dispatch
    pub render_mode: RenderMode,
    /// Namespace for class callbacks on routes that inherit none
    pub default_namespace: Option<String>,
    /// URL returned when generation finds no route
    pub fallback_url: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::FirstMatch,
            default_namespace: None,
            fallback_url: "/".to_string(),
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    pub fn default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = Some(namespace.into());
        self
    }

    pub fn fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_url = url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builder() {
        let config = RouterConfig::default();
        assert_eq!(config.render_mode, RenderMode::FirstMatch);
        assert_eq!(config.fallback_url, "/");
        assert!(config.default_namespace.is_none());

        let config = RouterConfig::new()
            .render_mode(RenderMode::AllMatches)
            .default_namespace("App\\Controllers")
            .fallback_url("/home");
        assert_eq!(config.render_mode, RenderMode::AllMatches);
        assert_eq!(config.default_namespace.as_deref(), Some("App\\Controllers"));
        assert_eq!(config.fallback_url, "/home");
    }
}

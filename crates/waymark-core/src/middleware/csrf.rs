//! CSRF (Cross-Site Request Forgery) verification
//!
//! Double-submit check: the token sent in a header or form field must equal
//! the token stored in the CSRF cookie. Runs once per request, before route
//! middleware, for state-changing methods only.

use super::Middleware;
use crate::{Error, Request, Result};

/// CSRF configuration
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    /// Cookie name for CSRF token
    pub cookie_name: String,
    /// Header name for CSRF token
    pub header_name: String,
    /// Query/form field name for CSRF token
    pub field_name: String,
    /// URLs skipped by the check; a trailing `*` matches any suffix
    pub except: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "csrf_token".to_string(),
            header_name: "X-CSRF-Token".to_string(),
            field_name: "csrf_token".to_string(),
            except: vec![],
        }
    }
}

impl CsrfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    pub fn except(mut self, url: impl Into<String>) -> Self {
        self.except.push(url.into());
        self
    }
}

/// Token-mismatch verifier for POST, PUT, PATCH and DELETE
#[derive(Debug, Clone, Default)]
pub struct CsrfVerifier {
    config: CsrfConfig,
}

impl CsrfVerifier {
    pub fn new(config: CsrfConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    fn is_excluded_path(&self, path: &str) -> bool {
        let path = normalize(path);
        self.config.except.iter().any(|rule| match rule.strip_suffix('*') {
            Some(prefix) => path.starts_with(normalize(prefix)),
            None => normalize(rule) == path,
        })
    }

    fn get_token_from_request(&self, req: &Request) -> Option<String> {
        if let Some(token) = req.header(&self.config.header_name) {
            return Some(token.to_string());
        }

        req.query_params()
            .get(&self.config.field_name)
            .map(|token| token.to_string())
    }

    fn get_cookie_token(&self, req: &Request) -> Option<String> {
        let cookie_header = req.header("cookie")?;
        let cookie_prefix = format!("{}=", self.config.cookie_name);

        cookie_header
            .split(';')
            .map(str::trim)
            .find_map(|part| part.strip_prefix(&cookie_prefix))
            .map(|token| token.to_string())
    }
}

impl Middleware for CsrfVerifier {
    fn handle(&self, req: &mut Request) -> Result<()> {
        if !req.method.is_state_changing() || self.is_excluded_path(&req.path) {
            return Ok(());
        }

        let request_token = self.get_token_from_request(req);
        let cookie_token = self.get_cookie_token(req);

        match (request_token, cookie_token) {
            (Some(sent), Some(stored))
                if !sent.is_empty() && constant_time_eq(sent.as_bytes(), stored.as_bytes()) =>
            {
                Ok(())
            }
            _ => {
                tracing::debug!(path = %req.path, method = %req.method, "csrf token mismatch");
                Err(Error::TokenMismatch)
            }
        }
    }
}

fn normalize(path: &str) -> &str {
    match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Method, RequestBuilder};

    fn post(path: &str) -> RequestBuilder {
        RequestBuilder::new(Method::Post, path)
    }

    #[test]
    fn test_safe_methods_skip_check() {
        let verifier = CsrfVerifier::default();
        let mut req = Request::new(Method::Get, "/form");
        assert!(verifier.handle(&mut req).is_ok());
    }

    #[test]
    fn test_matching_tokens_pass() {
        let verifier = CsrfVerifier::default();
        let mut req = post("/form")
            .header("X-CSRF-Token", "abc123")
            .header("Cookie", "session=1; csrf_token=abc123")
            .build();
        assert!(verifier.handle(&mut req).is_ok());

        let mut req = post("/form")
            .query("csrf_token=abc123")
            .header("Cookie", "csrf_token=abc123")
            .build();
        assert!(verifier.handle(&mut req).is_ok());
    }

    #[test]
    fn test_mismatch_and_missing_tokens_fail() {
        let verifier = CsrfVerifier::default();

        let mut req = post("/form")
            .header("X-CSRF-Token", "abc123")
            .header("Cookie", "csrf_token=zzz999")
            .build();
        assert!(matches!(verifier.handle(&mut req), Err(Error::TokenMismatch)));

        let mut req = post("/form").header("Cookie", "csrf_token=abc123").build();
        assert!(matches!(verifier.handle(&mut req), Err(Error::TokenMismatch)));

        let mut req = post("/form").header("X-CSRF-Token", "abc123").build();
        assert!(matches!(verifier.handle(&mut req), Err(Error::TokenMismatch)));
    }

    #[test]
    fn test_excluded_paths() {
        let verifier = CsrfVerifier::new(CsrfConfig::new().except("/api/*").except("/webhook"));

        let mut req = post("/api/v1/users").build();
        assert!(verifier.handle(&mut req).is_ok());

        let mut req = post("/webhook/").build();
        assert!(verifier.handle(&mut req).is_ok());

        let mut req = post("/webhooks").build();
        assert!(verifier.handle(&mut req).is_err());
    }
}

//! HTTP Request types

use crate::route::Route;
use crate::{Error, Result};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::sync::Arc;
use waymark_pattern::Params;

/// HTTP Methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl Method {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }

    /// POST, PUT, PATCH and DELETE change server state
    pub fn is_state_changing(&self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch | Method::Delete)
    }
}

impl std::str::FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(Error::InvalidMethod(s.to_string())),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP Request as seen by the router
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Request path (without query string)
    pub path: String,
    /// Host header value, port included if sent
    pub host: String,
    /// Query string (without leading ?)
    pub query: Option<String>,
    /// Request headers (stack-allocated for small header counts)
    pub headers: SmallVec<[(String, String); 16]>,
    /// Request body
    pub body: bytes::Bytes,
    /// Route parameters of the route being dispatched
    pub params: Params,
    /// Every route matched for this request, in dispatch order
    pub loaded_routes: Vec<Arc<Route>>,
}

impl Request {
    /// Create a new request. A `?query` suffix on `path` is split off.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path, None),
        };

        Self {
            method,
            path,
            host: String::new(),
            query,
            headers: SmallVec::new(),
            body: bytes::Bytes::new(),
            params: Params::new(),
            loaded_routes: Vec::new(),
        }
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get a route parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Parse query string into key-value pairs
    pub fn query_params(&self) -> Params {
        let mut params = Params::new();
        if let Some(query) = &self.query {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                params.insert(decode_component(key), decode_component(value));
            }
        }
        params
    }

    /// The route currently (or last) dispatched
    pub fn loaded_route(&self) -> Option<&Arc<Route>> {
        self.loaded_routes.last()
    }
}

/// Builder for constructing requests
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Create a new builder
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request: Request::new(method, path),
        }
    }

    /// Set host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.request.host = host.into();
        self
    }

    /// Set query string
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.request.query = Some(query.into());
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Set body
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.request.body = body.into();
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

/// Form-style decoding: `+` is a space, invalid escapes are kept verbatim
fn decode_component(s: &str) -> String {
    let spaced = s.replace('+', " ");
    let decoded = urlencoding::decode(&spaced).map(Cow::into_owned);
    decoded.unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert!("INVALID".parse::<Method>().is_err());
    }

    #[test]
    fn test_state_changing_methods() {
        assert!(Method::Post.is_state_changing());
        assert!(Method::Delete.is_state_changing());
        assert!(!Method::Get.is_state_changing());
        assert!(!Method::Options.is_state_changing());
    }

    #[test]
    fn test_path_query_split() {
        let req = Request::new(Method::Get, "/search?q=rust");
        assert_eq!(req.path, "/search");
        assert_eq!(req.query.as_deref(), Some("q=rust"));
    }

    #[test]
    fn test_request_header() {
        let req = RequestBuilder::new(Method::Get, "/")
            .header("Content-Type", "application/json")
            .host("example.com")
            .build();

        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(req.host, "example.com");
    }

    #[test]
    fn test_query_params() {
        let req = RequestBuilder::new(Method::Get, "/")
            .query("foo=bar&baz=qux%20quux&plus=a+b&flag")
            .build();

        let params = req.query_params();
        assert_eq!(params.get("foo"), Some("bar"));
        assert_eq!(params.get("baz"), Some("qux quux"));
        assert_eq!(params.get("plus"), Some("a b"));
        assert_eq!(params.get("flag"), Some(""));
    }
}

//! Controller convention routes

use super::settings::join_url;
use crate::{Method, Result};
use std::sync::Arc;
use waymark_pattern::{CompiledPattern, Constraints, Params, PatternCache, PatternKind};

const ACTION_SEGMENTS: &str = "{action?}/{args?:.*}";
const DEFAULT_ACTION: &str = "index";
const VERB_PREFIXES: [&str; 8] = ["get", "post", "put", "patch", "delete", "options", "head", "any"];

/// `METHOD /url/{action}/{args...}` dispatches to `{method}{Action}` on one class.
///
/// `GET /users` calls `getIndex`, `POST /users/profile/7` calls
/// `postProfile` with the positional parameter `"0" => "7"`.
#[derive(Debug, Clone)]
pub struct ControllerRoute {
    class: String,
    actions: Arc<CompiledPattern>,
}

impl ControllerRoute {
    pub(crate) fn new(
        class: &str,
        base: &str,
        constraints: &Constraints,
        patterns: &PatternCache,
    ) -> Result<Self> {
        Ok(Self {
            class: class.to_string(),
            actions: compile_actions(base, constraints, patterns)?,
        })
    }

    pub(crate) fn rebuild(
        &mut self,
        base: &str,
        constraints: &Constraints,
        patterns: &PatternCache,
    ) -> Result<()> {
        self.actions = compile_actions(base, constraints, patterns)?;
        Ok(())
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Resolve the class method for `method` and `path`
    pub(crate) fn probe(&self, method: Method, path: &str) -> Option<(Params, String)> {
        let captures = self.actions.captures(path)?;
        let action = captures.get("action").unwrap_or(DEFAULT_ACTION);
        let target = format!("{}{}", method.as_str().to_ascii_lowercase(), ucfirst(action));

        let mut params: Params = captures
            .iter()
            .filter(|(name, _)| *name != "action" && *name != "args")
            .collect();

        if let Some(args) = captures.get("args") {
            let positional = args.split('/').filter(|arg| !arg.is_empty());
            for (index, arg) in positional.enumerate() {
                params.insert(index.to_string(), arg);
            }
        }

        Some((params, target))
    }

    /// Build the URL for `method` (`getProfile`, `profile` or `None` for the index).
    ///
    /// Base parameters come from `params` by name, positional arguments
    /// from the keys `"0"`, `"1"`, ...
    pub(crate) fn reverse(&self, base: &CompiledPattern, method: Option<&str>, params: &Params) -> Result<String> {
        let mut url = base.reverse(params)?;
        let mut segments = Vec::new();

        if let Some(action) = method.map(action_name).filter(|a| a != DEFAULT_ACTION) {
            segments.push(action);
        }
        for index in 0.. {
            match params.get(&index.to_string()) {
                Some(arg) => segments.push(urlencoding::encode(arg).into_owned()),
                None => break,
            }
        }

        for segment in segments {
            if !url.ends_with('/') {
                url.push('/');
            }
            url.push_str(&segment);
        }

        Ok(url)
    }
}

fn compile_actions(base: &str, constraints: &Constraints, patterns: &PatternCache) -> Result<Arc<CompiledPattern>> {
    let raw = join_url(base, ACTION_SEGMENTS);
    Ok(patterns.get_or_compile(&raw, PatternKind::Path, constraints)?)
}

/// `getProfile` becomes `profile`; names without a verb prefix are kept
fn action_name(method: &str) -> String {
    let action = VERB_PREFIXES
        .iter()
        .find_map(|verb| {
            method
                .strip_prefix(verb)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
        })
        .unwrap_or(method);

    lcfirst(action)
}

fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lcfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_pattern::compile;

    fn controller(base: &str) -> ControllerRoute {
        ControllerRoute::new("UserController", base, &Constraints::new(), &PatternCache::new()).unwrap()
    }

    #[test]
    fn test_probe_index_and_actions() {
        let route = controller("/users");

        let (params, method) = route.probe(Method::Get, "/users").unwrap();
        assert_eq!(method, "getIndex");
        assert!(params.is_empty());

        let (params, method) = route.probe(Method::Post, "/users/profile/7/edit").unwrap();
        assert_eq!(method, "postProfile");
        assert_eq!(params.get("0"), Some("7"));
        assert_eq!(params.get("1"), Some("edit"));

        assert!(route.probe(Method::Get, "/accounts").is_none());
    }

    #[test]
    fn test_reverse() {
        let route = controller("/users");
        let base = compile("/users", PatternKind::Path).unwrap();

        assert_eq!(route.reverse(&base, None, &Params::new()).unwrap(), "/users");
        assert_eq!(route.reverse(&base, Some("getIndex"), &Params::new()).unwrap(), "/users");
        assert_eq!(
            route.reverse(&base, Some("getProfile"), &Params::new()).unwrap(),
            "/users/profile"
        );

        let args = Params::from_iter([("0", "7"), ("1", "a b")]);
        assert_eq!(
            route.reverse(&base, Some("settings"), &args).unwrap(),
            "/users/settings/7/a%20b"
        );
    }

    #[test]
    fn test_action_name() {
        assert_eq!(action_name("getProfile"), "profile");
        assert_eq!(action_name("anyThing"), "thing");
        assert_eq!(action_name("getaway"), "getaway");
        assert_eq!(action_name("Profile"), "profile");
    }
}

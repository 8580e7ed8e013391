//! Controller class resolution
//!
//! `"Class@method"` callbacks are resolved at dispatch time: the router
//! qualifies the class with the route namespace, asks the [`ClassLoader`]
//! for an instance and calls the method on it by name.

use crate::route::{HandlerFn, NAMESPACE_SEPARATOR};
use crate::{Error, Request, Response, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// A controller instance whose methods are invoked by name
pub trait Controller: Send + Sync {
    /// Route parameters are available on `req.params`
    fn call(&self, method: &str, req: &mut Request) -> Result<Response>;
}

/// Resolves fully-qualified class names to controller instances
pub trait ClassLoader: Send + Sync {
    /// Fails with [`Error::ClassNotFound`] when `class` is unknown
    fn load_class(&self, class: &str) -> Result<Arc<dyn Controller>>;
}

/// Map-backed class loader
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    classes: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `controller` under its fully-qualified class name
    pub fn register<C: Controller + 'static>(mut self, class: &str, controller: C) -> Self {
        self.classes.insert(normalize_class(class), Arc::new(controller));
        self
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(&normalize_class(class))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassLoader for ControllerRegistry {
    fn load_class(&self, class: &str) -> Result<Arc<dyn Controller>> {
        self.classes
            .get(&normalize_class(class))
            .cloned()
            .ok_or_else(|| Error::ClassNotFound(class.to_string()))
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<&String> = self.classes.keys().collect();
        classes.sort();
        f.debug_struct("ControllerRegistry")
            .field("classes", &classes)
            .finish()
    }
}

/// Controller built from closures, one per method.
///
/// Method lookup ignores ASCII case, so `getIndex` and `getindex` resolve
/// to the same action.
#[derive(Clone)]
pub struct MethodController {
    class: String,
    methods: HashMap<String, Arc<HandlerFn>>,
}

impl MethodController {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            methods: HashMap::new(),
        }
    }

    pub fn method<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.methods.insert(name.to_ascii_lowercase(), Arc::new(handler));
        self
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(&name.to_ascii_lowercase())
    }
}

impl Controller for MethodController {
    fn call(&self, method: &str, req: &mut Request) -> Result<Response> {
        match self.methods.get(&method.to_ascii_lowercase()) {
            Some(handler) => handler(req),
            None => Err(Error::MethodNotFound {
                class: self.class.clone(),
                method: method.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for MethodController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodController")
            .field("class", &self.class)
            .field("methods", &self.methods.len())
            .finish()
    }
}

fn normalize_class(class: &str) -> String {
    class.trim_start_matches(NAMESPACE_SEPARATOR).to_string()
}

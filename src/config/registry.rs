// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backends::local::LocalElementFactory;
use crate::errors::ElementMapError;
use crate::traits::{Element, ElementInit};

/// Builds one element instance from its construction context.
pub type ElementConstructor =
    Arc<dyn Fn(&ElementInit) -> Result<Arc<dyn Element>, String> + Send + Sync>;

/// Maps implementation binding names to element constructors.
///
/// Bindings registered explicitly take precedence; anything else falls back
/// to the built-in local element library, so a pipeline can override a
/// library element by registering the same binding name.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use streamwood::backends::local::LocalElementFactory;
/// use streamwood::config::ElementRegistry;
/// use streamwood::traits::ElementInit;
///
/// let mut registry = ElementRegistry::new();
/// assert!(registry.is_available("increment"));
/// assert!(!registry.is_available("double_increment"));
///
/// // Alias a library element under a new binding name
/// registry.register(
///     "double_increment",
///     Arc::new(|init: &ElementInit| {
///         let mut init = init.clone();
///         init.class_name = "increment".to_string();
///         init.parameters.insert("increment".to_string(), 2.into());
///         LocalElementFactory::create_element(&init).map_err(|e| e.to_string())
///     }),
/// );
/// assert!(registry.is_available("double_increment"));
/// ```
#[derive(Clone, Default)]
pub struct ElementRegistry {
    constructors: HashMap<String, ElementConstructor>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class_name: impl Into<String>, constructor: ElementConstructor) {
        self.constructors.insert(class_name.into(), constructor);
    }

    pub fn is_available(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
            || LocalElementFactory::is_implementation_available(class_name)
    }

    /// Every binding name this registry can construct, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .constructors
            .keys()
            .cloned()
            .chain(
                LocalElementFactory::list_available_implementations()
                    .into_iter()
                    .map(str::to_string),
            )
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn create(&self, init: &ElementInit) -> Result<Arc<dyn Element>, ElementMapError> {
        match self.constructors.get(&init.class_name) {
            Some(constructor) => {
                constructor(init).map_err(|reason| ElementMapError::ElementCreationFailed {
                    element: init.name.clone(),
                    class_name: init.class_name.clone(),
                    reason,
                })
            }
            None => LocalElementFactory::create_element(init),
        }
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<&String> = self.constructors.keys().collect();
        registered.sort();
        f.debug_struct("ElementRegistry")
            .field("registered", &registered)
            .finish()
    }
}

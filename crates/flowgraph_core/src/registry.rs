// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of named factories, the stock [`BindingResolver`].
//!
//! An application registers its static methods, bindable instance types,
//! handler types and custom port types up front. Documents then refer to
//! them by identity string.

use crate::binding::{BindingError, BindingResolver, InvokeError, NodeBehavior, StaticMethod};
use crate::handler::NodeHandler;
use crate::node::Node;
use crate::port::PortType;
use crate::signature::Signature;
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Creates a bindable instance
pub type InstanceFactory = Arc<dyn Fn() -> Box<dyn NodeBehavior> + Send + Sync>;

/// Creates a handler
pub type HandlerFactory = Arc<dyn Fn() -> Box<dyn NodeHandler> + Send + Sync>;

/// Registry of available callables, types and handlers
#[derive(Default)]
pub struct Registry {
    /// Custom port types by identity
    types: IndexMap<String, PortType>,
    /// Static methods by container, then by method name
    containers: IndexMap<String, IndexMap<String, StaticMethod>>,
    /// Instance factories by type identity
    instances: IndexMap<String, InstanceFactory>,
    /// Handler factories by type identity
    handlers: IndexMap<String, HandlerFactory>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom port type and return it.
    ///
    /// Built-in identities cannot be shadowed; the built-in type is returned
    /// instead.
    pub fn register_type(&mut self, identity: impl Into<String>) -> PortType {
        let identity = identity.into();
        if let Some(builtin) = PortType::from_builtin(&identity) {
            tracing::warn!("Port type '{identity}' is built in, not registering it");
            return builtin;
        }
        let port_type = PortType::Custom(identity.clone());
        self.types.insert(identity, port_type.clone());
        port_type
    }

    /// Register a static method
    pub fn register_static(&mut self, method: StaticMethod) {
        let methods = self
            .containers
            .entry(method.container().to_string())
            .or_default();
        if let Some(previous) = methods.insert(method.name().to_string(), method) {
            tracing::warn!(
                "Replaced static method '{}.{}'",
                previous.container(),
                previous.name()
            );
        }
    }

    /// Register a static function
    pub fn register_function<F>(
        &mut self,
        container: &str,
        name: &str,
        signature: Signature,
        function: F,
    ) where
        F: Fn(&[Value], &mut [Option<Value>]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        self.register_static(StaticMethod::new(container, name, signature, function));
    }

    /// Register a bindable instance type
    pub fn register_instance<F>(&mut self, identity: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NodeBehavior> + Send + Sync + 'static,
    {
        let identity = identity.into();
        if self
            .instances
            .insert(identity.clone(), Arc::new(factory))
            .is_some()
        {
            tracing::warn!("Replaced instance type '{identity}'");
        }
    }

    /// Register a handler type
    pub fn register_handler<F>(&mut self, identity: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn NodeHandler> + Send + Sync + 'static,
    {
        let identity = identity.into();
        if self
            .handlers
            .insert(identity.clone(), Arc::new(factory))
            .is_some()
        {
            tracing::warn!("Replaced handler type '{identity}'");
        }
    }

    /// Get a static method
    pub fn get(&self, container: &str, method: &str) -> Option<&StaticMethod> {
        self.containers.get(container)?.get(method)
    }

    /// Registered container identities
    pub fn containers(&self) -> impl Iterator<Item = &str> {
        self.containers.keys().map(String::as_str)
    }

    /// Static methods of a container
    pub fn methods(&self, container: &str) -> impl Iterator<Item = &StaticMethod> {
        self.containers
            .get(container)
            .into_iter()
            .flat_map(IndexMap::values)
    }

    /// Registered instance type identities
    pub fn instance_types(&self) -> impl Iterator<Item = &str> {
        self.instances.keys().map(String::as_str)
    }

    /// Create a detached node bound to a static method
    pub fn static_node(&self, container: &str, method: &str) -> Result<Node, BindingError> {
        Node::from_static(self.resolve_static(container, method)?)
    }

    /// Create a detached node bound to a method of a fresh instance
    pub fn instance_node(&self, identity: &str, method: &str) -> Result<Node, BindingError> {
        Node::from_instance(self.create_instance(identity)?, method)
    }
}

impl BindingResolver for Registry {
    fn resolve_type(&self, identity: &str) -> Result<PortType, BindingError> {
        PortType::from_builtin(identity)
            .or_else(|| self.types.get(identity).cloned())
            .ok_or_else(|| BindingError::UnknownType(identity.to_string()))
    }

    fn resolve_static(&self, container: &str, method: &str) -> Result<StaticMethod, BindingError> {
        let methods = self
            .containers
            .get(container)
            .ok_or_else(|| BindingError::UnknownType(container.to_string()))?;
        methods
            .get(method)
            .cloned()
            .ok_or_else(|| BindingError::UnknownMethod {
                container: container.to_string(),
                method: method.to_string(),
            })
    }

    fn create_instance(&self, identity: &str) -> Result<Box<dyn NodeBehavior>, BindingError> {
        let factory = self
            .instances
            .get(identity)
            .ok_or_else(|| BindingError::NotConstructible(identity.to_string()))?;
        Ok(factory())
    }

    fn create_handler(&self, identity: &str) -> Result<Box<dyn NodeHandler>, BindingError> {
        let factory = self
            .handlers
            .get(identity)
            .ok_or_else(|| BindingError::UnknownHandler(identity.to_string()))?;
        Ok(factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_function(
            "math",
            "one",
            Signature::new().returns(PortType::Int),
            |_, _| Ok(Value::Int(1)),
        );
        registry
    }

    #[test]
    fn test_resolve_static() {
        let registry = registry();
        assert_eq!(registry.resolve_static("math", "one").unwrap().name(), "one");
        assert!(matches!(
            registry.resolve_static("math", "two"),
            Err(BindingError::UnknownMethod { .. })
        ));
        assert!(matches!(
            registry.resolve_static("physics", "one"),
            Err(BindingError::UnknownType(_))
        ));
        assert_eq!(registry.containers().collect::<Vec<_>>(), vec!["math"]);
        assert_eq!(registry.methods("math").count(), 1);
        assert_eq!(registry.methods("physics").count(), 0);
    }

    #[test]
    fn test_resolve_types() {
        let mut registry = registry();
        assert_eq!(registry.resolve_type("int").unwrap(), PortType::Int);
        assert!(registry.resolve_type("pose").is_err());

        let pose = registry.register_type("pose");
        assert_eq!(registry.resolve_type("pose").unwrap(), pose);
    }

    #[test]
    fn test_builtin_type_is_not_shadowed() {
        let mut registry = registry();
        assert_eq!(registry.register_type("int"), PortType::Int);
        assert_eq!(registry.resolve_type("int").unwrap(), PortType::Int);
    }

    #[test]
    fn test_unknown_factories() {
        let registry = registry();
        assert!(matches!(
            registry.create_instance("Counter"),
            Err(BindingError::NotConstructible(_))
        ));
        assert!(matches!(
            registry.create_handler("Layout"),
            Err(BindingError::UnknownHandler(_))
        ));
    }

    #[test]
    fn test_static_node() {
        let registry = registry();
        let node = registry.static_node("math", "one").unwrap();
        assert_eq!(node.name(), "math.one");
        assert_eq!(node.outputs().len(), 1);
        assert!(node.binding().is_static());
    }
}

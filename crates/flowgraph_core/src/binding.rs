// SPDX-License-Identifier: MIT OR Apache-2.0
//! Callables bound to nodes and the resolver that recreates them on load.
//!
//! A node is bound either to a [`StaticMethod`] (a registered free function
//! identified by container and method name) or to a method of a
//! [`NodeBehavior`] instance. Instances may keep their own state, persist it
//! through the custom-data block and observe link/evaluation events.

use crate::handler::{DataBlock, NodeHandler};
use crate::port::{InPortId, OutPortId, OutputPort, PortType};
use crate::signature::Signature;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Function body of a static method.
///
/// Receives the input values in declared order and one slot per
/// out-parameter (initialized to `None`); returns the return value, which is
/// ignored when the signature has no return type.
pub type StaticFn =
    dyn Fn(&[Value], &mut [Option<Value>]) -> Result<Value, InvokeError> + Send + Sync;

/// Failure raised by a callable
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvokeError {
    /// An argument had an unexpected value
    #[error("Argument {index} expected {expected}, got {found}")]
    ArgumentType {
        /// Input position
        index: usize,
        /// Declared type
        expected: PortType,
        /// Kind of value received
        found: &'static str,
    },

    /// The instance does not expose the method
    #[error("Method '{0}' is not callable on this instance")]
    UnknownMethod(String),

    /// Callable-specific failure
    #[error("{0}")]
    Failed(String),
}

impl InvokeError {
    /// Argument type error for the input at `index`
    pub fn expected(index: usize, expected: PortType, found: &Value) -> Self {
        Self::ArgumentType {
            index,
            expected,
            found: found.kind(),
        }
    }
}

/// Error when resolving or binding a callable
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingError {
    /// Type identity not known to the resolver
    #[error("The type '{0}' is not found")]
    UnknownType(String),

    /// Method not found on a container or instance type
    #[error("The process method '{method}' is not found in '{container}'")]
    UnknownMethod {
        /// Declaring type identity
        container: String,
        /// Method identity
        method: String,
    },

    /// The saved declaring type is not the type of the created instance
    #[error("The declaring type '{container}' doesn't match the instance type '{instance_type}'")]
    ContainerMismatch {
        /// Saved declaring type identity
        container: String,
        /// Identity reported by the instance
        instance_type: String,
    },

    /// No factory registered for an instance type
    #[error("Failed to create an instance of type '{0}'")]
    NotConstructible(String),

    /// No factory registered for a handler type
    #[error("Failed to create a node handler of type '{0}'")]
    UnknownHandler(String),

    /// Empty method identity
    #[error("Empty process method name")]
    EmptyMethodName,

    /// Malformed parameter list
    #[error("Invalid signature for '{method}': {reason}")]
    InvalidSignature {
        /// Method identity
        method: String,
        /// What is wrong
        reason: String,
    },

    /// Neither inputs nor outputs
    #[error("Neither in ports nor out ports in '{0}'")]
    NoPorts(String),
}

/// A registered free function
#[derive(Clone)]
pub struct StaticMethod {
    container: String,
    name: String,
    signature: Signature,
    function: Arc<StaticFn>,
}

impl StaticMethod {
    /// Create a static method
    pub fn new<F>(
        container: impl Into<String>,
        name: impl Into<String>,
        signature: Signature,
        function: F,
    ) -> Self
    where
        F: Fn(&[Value], &mut [Option<Value>]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        Self {
            container: container.into(),
            name: name.into(),
            signature,
            function: Arc::new(function),
        }
    }

    /// Declaring type identity
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Method identity
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter list
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Call the function
    pub fn invoke(
        &self,
        inputs: &[Value],
        outputs: &mut [Option<Value>],
    ) -> Result<Value, InvokeError> {
        (self.function)(inputs, outputs)
    }
}

impl fmt::Debug for StaticMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticMethod")
            .field("container", &self.container)
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Stateful object a node can be bound to.
///
/// The hooks are the node-level counterparts of [`NodeHandler`]; they run
/// before the handler's hooks and cannot veto anything.
pub trait NodeBehavior: Send {
    /// Stable type identity, used to recreate the instance on load
    fn type_name(&self) -> &str;

    /// Parameter list of a method, `None` if the method does not exist
    fn signature(&self, method: &str) -> Option<Signature>;

    /// Call a method. Same slot conventions as [`StaticFn`].
    fn invoke(
        &mut self,
        method: &str,
        inputs: &[Value],
        outputs: &mut [Option<Value>],
    ) -> Result<Value, InvokeError>;

    /// Called after one of the node's outputs was linked
    fn on_link(&mut self, _from: OutPortId, _to: InPortId) {}

    /// Called after one of the node's outputs was unlinked
    fn on_unlink(&mut self, _from: OutPortId, _to: InPortId) {}

    /// Called after the node's outputs were reset or recomputed
    fn on_outputs_changed(&mut self, _outputs: &[OutputPort]) {}

    /// Write instance state into the node's custom-data block
    fn save_custom_data(&self, _data: &mut DataBlock) {}

    /// Restore instance state from the node's custom-data block
    fn load_custom_data(&mut self, _data: &DataBlock) -> serde_json::Result<()> {
        Ok(())
    }
}

/// What a node invokes
pub enum Binding {
    /// Unbound function
    Static(StaticMethod),
    /// Method of an owned instance
    Instance {
        /// Method identity
        method: String,
        /// Bound instance
        behavior: Box<dyn NodeBehavior>,
    },
}

impl Binding {
    /// Declaring type identity
    pub fn container(&self) -> &str {
        match self {
            Self::Static(method) => method.container(),
            Self::Instance { behavior, .. } => behavior.type_name(),
        }
    }

    /// Method identity
    pub fn method(&self) -> &str {
        match self {
            Self::Static(method) => method.name(),
            Self::Instance { method, .. } => method,
        }
    }

    /// Whether no instance is bound
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }

    /// Instance type identity, `None` for static bindings
    pub fn instance_type(&self) -> Option<&str> {
        match self {
            Self::Static(_) => None,
            Self::Instance { behavior, .. } => Some(behavior.type_name()),
        }
    }

    /// Bound instance
    pub fn behavior(&self) -> Option<&dyn NodeBehavior> {
        match self {
            Self::Static(_) => None,
            Self::Instance { behavior, .. } => Some(behavior.as_ref()),
        }
    }

    /// Bound instance, mutably
    pub fn behavior_mut(&mut self) -> Option<&mut (dyn NodeBehavior + 'static)> {
        match self {
            Self::Static(_) => None,
            Self::Instance { behavior, .. } => Some(behavior.as_mut()),
        }
    }

    pub(crate) fn signature(&self) -> Result<Signature, BindingError> {
        match self {
            Self::Static(method) => Ok(method.signature().clone()),
            Self::Instance { method, behavior } => {
                behavior
                    .signature(method)
                    .ok_or_else(|| BindingError::UnknownMethod {
                        container: behavior.type_name().to_string(),
                        method: method.clone(),
                    })
            }
        }
    }

    pub(crate) fn invoke(
        &mut self,
        inputs: &[Value],
        outputs: &mut [Option<Value>],
    ) -> Result<Value, InvokeError> {
        match self {
            Self::Static(method) => method.invoke(inputs, outputs),
            Self::Instance { method, behavior } => behavior.invoke(method, inputs, outputs),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(method) => f.debug_tuple("Static").field(method).finish(),
            Self::Instance { method, behavior } => f
                .debug_struct("Instance")
                .field("type", &behavior.type_name())
                .field("method", method)
                .finish(),
        }
    }
}

/// Maps stored identities back to callables, types and handlers.
///
/// The core never constructs anything itself beyond these calls.
pub trait BindingResolver {
    /// Resolve a port type identity
    fn resolve_type(&self, identity: &str) -> Result<PortType, BindingError>;

    /// Resolve a static method on a declaring type
    fn resolve_static(&self, container: &str, method: &str) -> Result<StaticMethod, BindingError>;

    /// Create a fresh instance of a bindable type
    fn create_instance(&self, identity: &str) -> Result<Box<dyn NodeBehavior>, BindingError>;

    /// Create a fresh handler
    fn create_handler(&self, identity: &str) -> Result<Box<dyn NodeHandler>, BindingError>;
}

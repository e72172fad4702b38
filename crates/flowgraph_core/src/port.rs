// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::node::NodeId;
use crate::value::OutputValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of an input port: owning node plus position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InPortId {
    /// Owning node
    pub node: NodeId,
    /// Index into the node's input ports
    pub index: usize,
}

impl InPortId {
    /// Create a new input port address
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Address of an output port: owning node plus position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPortId {
    /// Owning node
    pub node: NodeId,
    /// Index into the node's output ports
    pub index: usize,
}

impl OutPortId {
    /// Create a new output port address
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Data type that can flow through ports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// Color (RGBA)
    Color,
    /// String value
    String,
    /// Type registered by the embedding application, named by its identity
    Custom(String),
}

impl PortType {
    /// Stable identity string used in saved documents
    pub fn identity(&self) -> &str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Vector2 => "vector2",
            Self::Vector3 => "vector3",
            Self::Vector4 => "vector4",
            Self::Color => "color",
            Self::String => "string",
            Self::Custom(identity) => identity,
        }
    }

    /// Parse a built-in identity. Custom identities need a resolver.
    pub fn from_builtin(identity: &str) -> Option<Self> {
        let ty = match identity {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "float" => Self::Float,
            "vector2" => Self::Vector2,
            "vector3" => Self::Vector3,
            "vector4" => Self::Vector4,
            "color" => Self::Color,
            "string" => Self::String,
            _ => return None,
        };
        Some(ty)
    }

    /// Check if an output of this type can drive an input of `other`.
    ///
    /// Ports are compared as reference views, so there is no widening and
    /// no implicit conversion: the declared types must be identical.
    pub fn can_connect_to(&self, other: &PortType) -> bool {
        self == other
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identity())
    }
}

/// Shared description of a port
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    owner: NodeId,
    name: Option<String>,
    port_type: PortType,
    direction: PortDirection,
}

impl Port {
    pub(crate) fn new(
        owner: NodeId,
        name: Option<String>,
        port_type: PortType,
        direction: PortDirection,
    ) -> Self {
        Self {
            owner,
            name,
            port_type,
            direction,
        }
    }

    /// Node this port belongs to
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    /// Port name, `None` for the return-value output
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared value type
    pub fn port_type(&self) -> &PortType {
        &self.port_type
    }

    /// Port direction
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Name used in diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<Ret>")
    }
}

/// An input port, driven by at most one output
#[derive(Debug, Clone)]
pub struct InputPort {
    port: Port,
    source: Option<OutPortId>,
}

impl InputPort {
    pub(crate) fn new(owner: NodeId, name: impl Into<String>, port_type: PortType) -> Self {
        Self {
            port: Port::new(owner, Some(name.into()), port_type, PortDirection::Input),
            source: None,
        }
    }

    /// Port description
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Port name
    pub fn name(&self) -> &str {
        self.port.display_name()
    }

    /// Declared value type
    pub fn port_type(&self) -> &PortType {
        &self.port.port_type
    }

    /// The output driving this input, if linked
    pub fn source(&self) -> Option<OutPortId> {
        self.source
    }

    /// Whether this input is linked
    pub fn is_linked(&self) -> bool {
        self.source.is_some()
    }

    pub(crate) fn set_source(&mut self, source: Option<OutPortId>) {
        self.source = source;
    }
}

/// An output port, feeding any number of inputs
#[derive(Debug, Clone)]
pub struct OutputPort {
    port: Port,
    targets: Vec<InPortId>,
    value: OutputValue,
}

impl OutputPort {
    pub(crate) fn new(owner: NodeId, name: Option<String>, port_type: PortType) -> Self {
        Self {
            port: Port::new(owner, name, port_type, PortDirection::Output),
            targets: Vec::new(),
            value: OutputValue::Unset,
        }
    }

    /// Port description
    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Port name, `None` for the return-value port
    pub fn name(&self) -> Option<&str> {
        self.port.name()
    }

    /// Declared value type
    pub fn port_type(&self) -> &PortType {
        &self.port.port_type
    }

    /// Whether this port carries the callable's return value
    pub fn is_return_value(&self) -> bool {
        self.port.name.is_none()
    }

    /// Inputs fed by this output, in link order
    pub fn targets(&self) -> &[InPortId] {
        &self.targets
    }

    /// Whether any input is fed by this output
    pub fn is_linked(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Current value
    pub fn value(&self) -> &OutputValue {
        &self.value
    }

    pub(crate) fn add_target(&mut self, target: InPortId) {
        self.targets.push(target);
    }

    pub(crate) fn remove_target(&mut self, target: InPortId) {
        self.targets.retain(|t| *t != target);
    }

    pub(crate) fn set_value(&mut self, value: OutputValue) {
        self.value = value;
    }
}

/// Error when looking up a port on a node
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// The node has no input ports at all
    #[error("No in port exists in '{0}'")]
    NoInPort(String),

    /// The node has no output ports at all
    #[error("No out port exists in '{0}'")]
    NoOutPort(String),

    /// Unnamed lookup with several inputs
    #[error("No default in port in '{0}': multiple in ports exist")]
    AmbiguousInPort(String),

    /// Unnamed lookup with several outputs and no return-value port
    #[error("No default out port in '{0}': multiple out ports exist")]
    AmbiguousOutPort(String),

    /// Named input not found
    #[error("In port '{port}' not found in '{node}'")]
    InPortNotFound {
        /// Node name
        node: String,
        /// Requested port name
        port: String,
    },

    /// Named output not found
    #[error("Out port '{port}' not found in '{node}'")]
    OutPortNotFound {
        /// Node name
        node: String,
        /// Requested port name
        port: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_identities() {
        for ty in [
            PortType::Bool,
            PortType::Int,
            PortType::Float,
            PortType::Vector2,
            PortType::Vector3,
            PortType::Vector4,
            PortType::Color,
            PortType::String,
        ] {
            assert_eq!(PortType::from_builtin(ty.identity()), Some(ty.clone()));
        }
        assert_eq!(PortType::from_builtin("matrix"), None);
        assert_eq!(PortType::Custom("matrix".into()).identity(), "matrix");
    }

    #[test]
    fn test_no_implicit_conversion() {
        assert!(PortType::Int.can_connect_to(&PortType::Int));
        assert!(!PortType::Int.can_connect_to(&PortType::Float));
        assert!(!PortType::Color.can_connect_to(&PortType::Vector4));
        assert!(PortType::Custom("pose".into()).can_connect_to(&PortType::Custom("pose".into())));
        assert!(!PortType::Custom("pose".into()).can_connect_to(&PortType::Custom("mesh".into())));
    }

    #[test]
    fn test_output_targets() {
        let owner = NodeId::new();
        let other = NodeId::new();
        let mut output = OutputPort::new(owner, None, PortType::Int);
        assert!(output.is_return_value());
        assert!(!output.is_linked());

        output.add_target(InPortId::new(other, 0));
        output.add_target(InPortId::new(other, 1));
        output.remove_target(InPortId::new(other, 0));
        assert_eq!(output.targets(), &[InPortId::new(other, 1)]);
        assert_eq!(output.port().display_name(), "<Ret>");
    }
}

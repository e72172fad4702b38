// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::binding::{Binding, BindingError, InvokeError, NodeBehavior, StaticMethod};
use crate::handler::NodeHandler;
use crate::port::{InPortId, InputPort, OutPortId, OutputPort, PortError};
use crate::value::{OutputValue, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of computation: a bound callable and the ports derived from it.
///
/// Ports are fixed at construction. Links and values are managed by the
/// [`Graph`](crate::Graph) that owns the node.
pub struct Node {
    id: NodeId,
    name: String,
    binding: Binding,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    handler: Option<Box<dyn NodeHandler>>,
    attached: bool,
}

impl Node {
    /// Create a node bound to a callable.
    ///
    /// The name defaults to `container.method`.
    pub fn new(binding: Binding, name: Option<&str>) -> Result<Self, BindingError> {
        if binding.method().is_empty() {
            return Err(BindingError::EmptyMethodName);
        }

        let signature = binding.signature()?;
        signature.validate(binding.method())?;

        let id = NodeId::new();
        let (inputs, outputs) = signature.derive_ports(id);
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{}.{}", binding.container(), binding.method()),
        };

        Ok(Self {
            id,
            name,
            binding,
            inputs,
            outputs,
            handler: None,
            attached: false,
        })
    }

    /// Create a node bound to a static method
    pub fn from_static(method: StaticMethod) -> Result<Self, BindingError> {
        Self::new(Binding::Static(method), None)
    }

    /// Create a node bound to a method of an instance
    pub fn from_instance(
        behavior: Box<dyn NodeBehavior>,
        method: impl Into<String>,
    ) -> Result<Self, BindingError> {
        Self::new(
            Binding::Instance {
                method: method.into(),
                behavior,
            },
            None,
        )
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a handler
    pub fn with_handler(mut self, handler: Box<dyn NodeHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the node
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Bound callable
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Attached handler
    pub fn handler(&self) -> Option<&dyn NodeHandler> {
        self.handler.as_deref()
    }

    /// Replace the handler, returning the previous one
    pub fn set_handler(
        &mut self,
        handler: Option<Box<dyn NodeHandler>>,
    ) -> Option<Box<dyn NodeHandler>> {
        std::mem::replace(&mut self.handler, handler)
    }

    /// Whether the node currently belongs to a graph
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Input ports
    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    /// Output ports
    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&InputPort> {
        self.inputs.get(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&OutputPort> {
        self.outputs.get(index)
    }

    /// Find an input port.
    ///
    /// Without a name, the node must have exactly one input.
    pub fn in_port(&self, name: Option<&str>) -> Result<InPortId, PortError> {
        if self.inputs.is_empty() {
            return Err(PortError::NoInPort(self.name.clone()));
        }

        match name.filter(|n| !n.is_empty()) {
            None if self.inputs.len() == 1 => Ok(InPortId::new(self.id, 0)),
            None => Err(PortError::AmbiguousInPort(self.name.clone())),
            Some(name) => self
                .inputs
                .iter()
                .position(|p| p.name() == name)
                .map(|index| InPortId::new(self.id, index))
                .ok_or_else(|| PortError::InPortNotFound {
                    node: self.name.clone(),
                    port: name.to_string(),
                }),
        }
    }

    /// Find an output port.
    ///
    /// Without a name, resolves to the sole output, or else to the
    /// return-value port.
    pub fn out_port(&self, name: Option<&str>) -> Result<OutPortId, PortError> {
        if self.outputs.is_empty() {
            return Err(PortError::NoOutPort(self.name.clone()));
        }

        let name = name.filter(|n| !n.is_empty());
        if name.is_none() && self.outputs.len() == 1 {
            return Ok(OutPortId::new(self.id, 0));
        }

        self.outputs
            .iter()
            .position(|p| p.name() == name)
            .map(|index| OutPortId::new(self.id, index))
            .ok_or_else(|| match name {
                None => PortError::AmbiguousOutPort(self.name.clone()),
                Some(name) => PortError::OutPortNotFound {
                    node: self.name.clone(),
                    port: name.to_string(),
                },
            })
    }

    /// Value of the return-value port, if the callable has one
    pub fn return_value(&self) -> Option<&OutputValue> {
        self.outputs
            .iter()
            .find(|p| p.is_return_value())
            .map(OutputPort::value)
    }

    /// Index of the first input without a driver
    pub fn first_unlinked_input(&self) -> Option<usize> {
        self.inputs.iter().position(|p| !p.is_linked())
    }

    /// Whether every input has a driver
    pub fn all_inputs_linked(&self) -> bool {
        self.first_unlinked_input().is_none()
    }

    /// Whether no output feeds anything
    pub fn no_outputs_linked(&self) -> bool {
        self.outputs.iter().all(|p| !p.is_linked())
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    pub(crate) fn input_mut(&mut self, index: usize) -> Option<&mut InputPort> {
        self.inputs.get_mut(index)
    }

    pub(crate) fn output_mut(&mut self, index: usize) -> Option<&mut OutputPort> {
        self.outputs.get_mut(index)
    }

    /// Clear every output to [`OutputValue::Unset`]
    pub(crate) fn reset_outputs(&mut self) {
        for output in &mut self.outputs {
            output.set_value(OutputValue::Unset);
        }
        self.notify_outputs_changed();
    }

    /// Call the bound callable and store its results
    pub(crate) fn invoke(&mut self, inputs: &[Value]) -> Result<(), InvokeError> {
        let out_params = self.outputs.iter().filter(|p| !p.is_return_value()).count();
        let mut slots = vec![None; out_params];

        let returned = self.binding.invoke(inputs, &mut slots)?;

        let mut returned = Some(returned);
        let mut slots = slots.into_iter();
        for output in &mut self.outputs {
            let value = if output.is_return_value() {
                returned.take().unwrap_or_default()
            } else {
                slots.next().flatten().unwrap_or_default()
            };
            output.set_value(OutputValue::Set(value));
        }

        self.notify_outputs_changed();
        Ok(())
    }

    pub(crate) fn notify_link(&mut self, from: OutPortId, to: InPortId) {
        if let Some(behavior) = self.binding.behavior_mut() {
            behavior.on_link(from, to);
        }
        if let Some(handler) = self.handler.as_mut() {
            handler.on_link(from, to);
        }
    }

    pub(crate) fn notify_unlink(&mut self, from: OutPortId, to: InPortId) {
        if let Some(behavior) = self.binding.behavior_mut() {
            behavior.on_unlink(from, to);
        }
        if let Some(handler) = self.handler.as_mut() {
            handler.on_unlink(from, to);
        }
    }

    fn notify_outputs_changed(&mut self) {
        if let Binding::Instance { behavior, .. } = &mut self.binding {
            behavior.on_outputs_changed(&self.outputs);
        }
        if let Some(mut handler) = self.handler.take() {
            handler.on_outputs_changed(self);
            self.handler = Some(handler);
        }
    }

    /// `Node.port` label of an input
    pub(crate) fn in_label(&self, index: usize) -> String {
        match self.inputs.get(index) {
            Some(port) => format!("{}.{}", self.name, port.name()),
            None => format!("{}.#{index}", self.name),
        }
    }

    /// `Node.port` label of an output
    pub(crate) fn out_label(&self, index: usize) -> String {
        match self.outputs.get(index) {
            Some(port) => format!("{}.{}", self.name, port.port().display_name()),
            None => format!("{}.#{index}", self.name),
        }
    }

    pub(crate) fn behavior_mut(&mut self) -> Option<&mut (dyn NodeBehavior + 'static)> {
        self.binding.behavior_mut()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("binding", &self.binding)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("handler", &self.handler.as_ref().map(|h| h.type_name()))
            .field("attached", &self.attached)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

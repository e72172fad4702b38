// SPDX-License-Identifier: MIT OR Apache-2.0
//! Callable signatures and the ports derived from them.

use crate::binding::BindingError;
use crate::node::NodeId;
use crate::port::{InputPort, OutputPort, PortType};
use std::collections::HashSet;

/// A named, typed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub port_type: PortType,
}

/// Parameter list of a callable.
///
/// Inputs become input ports in order. Out-parameters become output ports in
/// order, followed by one unnamed output for the return value when the
/// callable has a return type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
    returns: Option<PortType>,
}

impl Signature {
    /// Create an empty signature
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input parameter
    pub fn input(mut self, name: impl Into<String>, port_type: PortType) -> Self {
        self.inputs.push(PortSpec {
            name: name.into(),
            port_type,
        });
        self
    }

    /// Add an out-parameter
    pub fn output(mut self, name: impl Into<String>, port_type: PortType) -> Self {
        self.outputs.push(PortSpec {
            name: name.into(),
            port_type,
        });
        self
    }

    /// Set the return type
    pub fn returns(mut self, port_type: PortType) -> Self {
        self.returns = Some(port_type);
        self
    }

    /// Input parameters
    pub fn inputs(&self) -> &[PortSpec] {
        &self.inputs
    }

    /// Out-parameters
    pub fn outputs(&self) -> &[PortSpec] {
        &self.outputs
    }

    /// Return type
    pub fn return_type(&self) -> Option<&PortType> {
        self.returns.as_ref()
    }

    /// Number of output ports this signature produces
    pub fn output_port_count(&self) -> usize {
        self.outputs.len() + usize::from(self.returns.is_some())
    }

    /// Check parameter names and port count
    pub fn validate(&self, method: &str) -> Result<(), BindingError> {
        let invalid = |reason: String| BindingError::InvalidSignature {
            method: method.to_string(),
            reason,
        };

        for (kind, params) in [("input", &self.inputs), ("output", &self.outputs)] {
            let mut seen = HashSet::new();
            for param in params {
                if param.name.is_empty() {
                    return Err(invalid(format!("unnamed {kind} parameter")));
                }
                if !seen.insert(param.name.as_str()) {
                    return Err(invalid(format!("duplicate {kind} parameter '{}'", param.name)));
                }
            }
        }

        if self.inputs.is_empty() && self.output_port_count() == 0 {
            return Err(BindingError::NoPorts(method.to_string()));
        }

        Ok(())
    }

    pub(crate) fn derive_ports(&self, owner: NodeId) -> (Vec<InputPort>, Vec<OutputPort>) {
        let inputs = self
            .inputs
            .iter()
            .map(|p| InputPort::new(owner, p.name.clone(), p.port_type.clone()))
            .collect();

        let outputs = self
            .outputs
            .iter()
            .map(|p| OutputPort::new(owner, Some(p.name.clone()), p.port_type.clone()))
            .chain(
                self.returns
                    .iter()
                    .map(|ty| OutputPort::new(owner, None, ty.clone())),
            )
            .collect();

        (inputs, outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_port_order() {
        let signature = Signature::new()
            .input("a", PortType::Int)
            .input("b", PortType::Int)
            .output("remainder", PortType::Int)
            .returns(PortType::Int);

        let (inputs, outputs) = signature.derive_ports(NodeId::new());
        assert_eq!(inputs.len(), 2);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].name(), Some("remainder"));
        assert!(outputs[1].is_return_value());
        assert_eq!(signature.output_port_count(), 2);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            Signature::new().validate("noop"),
            Err(BindingError::NoPorts(_))
        ));

        let duplicate = Signature::new()
            .input("a", PortType::Int)
            .input("a", PortType::Float);
        assert!(matches!(
            duplicate.validate("dup"),
            Err(BindingError::InvalidSignature { .. })
        ));

        let unnamed = Signature::new().output("", PortType::Int);
        assert!(unnamed.validate("unnamed").is_err());

        // An input and an output may share a name
        let shared = Signature::new()
            .input("value", PortType::Int)
            .output("value", PortType::Int);
        assert!(shared.validate("shared").is_ok());
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node library.
//!
//! Static containers (`math`, `logic`, `text`), bindable instance types
//! (`Constant`, `Accumulator`) and the `Layout` handler, all registered by
//! [`create_standard_registry`].

pub mod instances;
pub mod layout;
pub mod logic;
pub mod math;
pub mod text;

pub use instances::{Accumulator, Constant};
pub use layout::LayoutHandler;

use crate::binding::InvokeError;
use crate::port::PortType;
use crate::registry::Registry;
use crate::value::Value;

static NULL: Value = Value::Null;

/// Create a registry holding the whole built-in library
pub fn create_standard_registry() -> Registry {
    let mut registry = Registry::new();
    math::register(&mut registry);
    logic::register(&mut registry);
    text::register(&mut registry);
    instances::register(&mut registry);
    layout::register(&mut registry);
    registry
}

fn arg(inputs: &[Value], index: usize) -> &Value {
    inputs.get(index).unwrap_or(&NULL)
}

pub(crate) fn int_arg(inputs: &[Value], index: usize) -> Result<i64, InvokeError> {
    let value = arg(inputs, index);
    value
        .as_int()
        .ok_or_else(|| InvokeError::expected(index, PortType::Int, value))
}

pub(crate) fn float_arg(inputs: &[Value], index: usize) -> Result<f64, InvokeError> {
    let value = arg(inputs, index);
    value
        .as_float()
        .ok_or_else(|| InvokeError::expected(index, PortType::Float, value))
}

pub(crate) fn bool_arg(inputs: &[Value], index: usize) -> Result<bool, InvokeError> {
    let value = arg(inputs, index);
    value
        .as_bool()
        .ok_or_else(|| InvokeError::expected(index, PortType::Bool, value))
}

pub(crate) fn str_arg(inputs: &[Value], index: usize) -> Result<&str, InvokeError> {
    let value = arg(inputs, index);
    value
        .as_str()
        .ok_or_else(|| InvokeError::expected(index, PortType::String, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingResolver;

    #[test]
    fn test_standard_registry_contents() {
        let registry = create_standard_registry();
        let containers: Vec<&str> = registry.containers().collect();
        assert_eq!(containers, vec!["math", "logic", "text"]);
        assert!(registry.resolve_static("math", "divide").is_ok());
        assert!(registry.create_instance("Accumulator").is_ok());
        assert!(registry.create_handler("Layout").is_ok());
    }

    #[test]
    fn test_argument_errors() {
        let inputs = [Value::Int(1), Value::from("x")];
        assert_eq!(int_arg(&inputs, 0), Ok(1));
        assert!(matches!(
            int_arg(&inputs, 1),
            Err(InvokeError::ArgumentType { index: 1, found: "string", .. })
        ));
        assert!(matches!(
            float_arg(&inputs, 5),
            Err(InvokeError::ArgumentType { found: "null", .. })
        ));
    }
}

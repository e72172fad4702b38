// SPDX-License-Identifier: MIT OR Apache-2.0
//! Boolean and comparison nodes, container `logic`.

use super::{bool_arg, int_arg};
use crate::port::PortType;
use crate::registry::Registry;
use crate::signature::Signature;
use crate::value::Value;

/// Container identity
pub const CONTAINER: &str = "logic";

fn binary_bool() -> Signature {
    Signature::new()
        .input("a", PortType::Bool)
        .input("b", PortType::Bool)
        .returns(PortType::Bool)
}

/// Register the `logic` container
pub fn register(registry: &mut Registry) {
    registry.register_function(CONTAINER, "and", binary_bool(), |inputs, _| {
        Ok(Value::Bool(bool_arg(inputs, 0)? && bool_arg(inputs, 1)?))
    });

    registry.register_function(CONTAINER, "or", binary_bool(), |inputs, _| {
        Ok(Value::Bool(bool_arg(inputs, 0)? || bool_arg(inputs, 1)?))
    });

    registry.register_function(
        CONTAINER,
        "not",
        Signature::new()
            .input("value", PortType::Bool)
            .returns(PortType::Bool),
        |inputs, _| Ok(Value::Bool(!bool_arg(inputs, 0)?)),
    );

    // Two out-parameters and no return value
    registry.register_function(
        CONTAINER,
        "compare",
        Signature::new()
            .input("a", PortType::Int)
            .input("b", PortType::Int)
            .output("less", PortType::Bool)
            .output("equal", PortType::Bool),
        |inputs, outputs| {
            let (a, b) = (int_arg(inputs, 0)?, int_arg(inputs, 1)?);
            outputs[0] = Some(Value::Bool(a < b));
            outputs[1] = Some(Value::Bool(a == b));
            Ok(Value::Null)
        },
    );

    registry.register_function(
        CONTAINER,
        "select",
        Signature::new()
            .input("condition", PortType::Bool)
            .input("if_true", PortType::Int)
            .input("if_false", PortType::Int)
            .returns(PortType::Int),
        |inputs, _| {
            let index = if bool_arg(inputs, 0)? { 1 } else { 2 };
            Ok(Value::Int(int_arg(inputs, index)?))
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingResolver;

    #[test]
    fn test_compare_fills_both_outputs() {
        let mut registry = Registry::new();
        register(&mut registry);

        let compare = registry.resolve_static(CONTAINER, "compare").unwrap();
        assert_eq!(compare.signature().output_port_count(), 2);

        let mut outputs = vec![None, None];
        compare
            .invoke(&[Value::Int(1), Value::Int(2)], &mut outputs)
            .unwrap();
        assert_eq!(outputs, vec![Some(Value::Bool(true)), Some(Value::Bool(false))]);
    }

    #[test]
    fn test_select() {
        let mut registry = Registry::new();
        register(&mut registry);

        let select = registry.resolve_static(CONTAINER, "select").unwrap();
        let result = select.invoke(&[Value::Bool(false), Value::Int(1), Value::Int(2)], &mut []);
        assert_eq!(result, Ok(Value::Int(2)));
    }
}

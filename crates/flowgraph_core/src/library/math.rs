// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic nodes, container `math`.

use super::{float_arg, int_arg};
use crate::binding::InvokeError;
use crate::port::PortType;
use crate::registry::Registry;
use crate::signature::Signature;
use crate::value::Value;

/// Container identity
pub const CONTAINER: &str = "math";

fn overflow(op: &str) -> InvokeError {
    InvokeError::Failed(format!("integer overflow in {op}"))
}

fn binary_int() -> Signature {
    Signature::new()
        .input("a", PortType::Int)
        .input("b", PortType::Int)
        .returns(PortType::Int)
}

fn unary_int() -> Signature {
    Signature::new()
        .input("value", PortType::Int)
        .returns(PortType::Int)
}

/// Register the `math` container
pub fn register(registry: &mut Registry) {
    // ========================================================================
    // Integer
    // ========================================================================

    registry.register_function(CONTAINER, "add", binary_int(), |inputs, _| {
        let (a, b) = (int_arg(inputs, 0)?, int_arg(inputs, 1)?);
        a.checked_add(b).map(Value::Int).ok_or_else(|| overflow("add"))
    });

    registry.register_function(CONTAINER, "subtract", binary_int(), |inputs, _| {
        let (a, b) = (int_arg(inputs, 0)?, int_arg(inputs, 1)?);
        a.checked_sub(b)
            .map(Value::Int)
            .ok_or_else(|| overflow("subtract"))
    });

    registry.register_function(CONTAINER, "multiply", binary_int(), |inputs, _| {
        let (a, b) = (int_arg(inputs, 0)?, int_arg(inputs, 1)?);
        a.checked_mul(b)
            .map(Value::Int)
            .ok_or_else(|| overflow("multiply"))
    });

    // Quotient as return value, remainder as out-parameter
    registry.register_function(
        CONTAINER,
        "divide",
        Signature::new()
            .input("a", PortType::Int)
            .input("b", PortType::Int)
            .output("remainder", PortType::Int)
            .returns(PortType::Int),
        |inputs, outputs| {
            let (a, b) = (int_arg(inputs, 0)?, int_arg(inputs, 1)?);
            if b == 0 {
                return Err(InvokeError::Failed("division by zero".into()));
            }
            let quotient = a.checked_div(b).ok_or_else(|| overflow("divide"))?;
            outputs[0] = Some(Value::Int(a.wrapping_rem(b)));
            Ok(Value::Int(quotient))
        },
    );

    registry.register_function(CONTAINER, "negate", unary_int(), |inputs, _| {
        int_arg(inputs, 0)?
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| overflow("negate"))
    });

    registry.register_function(CONTAINER, "double", unary_int(), |inputs, _| {
        int_arg(inputs, 0)?
            .checked_mul(2)
            .map(Value::Int)
            .ok_or_else(|| overflow("double"))
    });

    // ========================================================================
    // Float
    // ========================================================================

    registry.register_function(
        CONTAINER,
        "to_float",
        Signature::new()
            .input("value", PortType::Int)
            .returns(PortType::Float),
        |inputs, _| Ok(Value::Float(int_arg(inputs, 0)? as f64)),
    );

    registry.register_function(
        CONTAINER,
        "scale",
        Signature::new()
            .input("value", PortType::Float)
            .input("factor", PortType::Float)
            .returns(PortType::Float),
        |inputs, _| Ok(Value::Float(float_arg(inputs, 0)? * float_arg(inputs, 1)?)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::BindingResolver;

    fn call(method: &str, inputs: &[Value]) -> (Result<Value, InvokeError>, Vec<Option<Value>>) {
        let mut registry = Registry::new();
        register(&mut registry);
        let method = registry.resolve_static(CONTAINER, method).unwrap();
        let mut outputs = vec![None; method.signature().outputs().len()];
        let result = method.invoke(inputs, &mut outputs);
        (result, outputs)
    }

    #[test]
    fn test_divide() {
        let (result, outputs) = call("divide", &[Value::Int(17), Value::Int(5)]);
        assert_eq!(result, Ok(Value::Int(3)));
        assert_eq!(outputs, vec![Some(Value::Int(2))]);

        let (result, _) = call("divide", &[Value::Int(1), Value::Int(0)]);
        assert!(matches!(result, Err(InvokeError::Failed(_))));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let (result, _) = call("add", &[Value::Int(i64::MAX), Value::Int(1)]);
        assert!(matches!(result, Err(InvokeError::Failed(_))));
    }

    #[test]
    fn test_double_and_scale() {
        assert_eq!(call("double", &[Value::Int(21)]).0, Ok(Value::Int(42)));
        assert_eq!(
            call("scale", &[Value::Float(1.5), Value::Float(2.0)]).0,
            Ok(Value::Float(3.0))
        );
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! String nodes, container `text`.

use super::{int_arg, str_arg};
use crate::port::PortType;
use crate::registry::Registry;
use crate::signature::Signature;
use crate::value::Value;

/// Container identity
pub const CONTAINER: &str = "text";

/// Register the `text` container
pub fn register(registry: &mut Registry) {
    registry.register_function(
        CONTAINER,
        "concat",
        Signature::new()
            .input("a", PortType::String)
            .input("b", PortType::String)
            .returns(PortType::String),
        |inputs, _| {
            let mut joined = str_arg(inputs, 0)?.to_string();
            joined.push_str(str_arg(inputs, 1)?);
            Ok(Value::String(joined))
        },
    );

    registry.register_function(
        CONTAINER,
        "format_int",
        Signature::new()
            .input("value", PortType::Int)
            .returns(PortType::String),
        |inputs, _| Ok(Value::String(int_arg(inputs, 0)?.to_string())),
    );

    registry.register_function(
        CONTAINER,
        "length",
        Signature::new()
            .input("value", PortType::String)
            .returns(PortType::Int),
        |inputs, _| {
            let length = str_arg(inputs, 0)?.chars().count();
            Ok(Value::Int(i64::try_from(length).unwrap_or(i64::MAX)))
        },
    );
}

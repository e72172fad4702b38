// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bindable instance types.
//!
//! Both types keep state between evaluations and persist it through the
//! node's custom-data block.

use super::int_arg;
use crate::binding::{InvokeError, NodeBehavior};
use crate::handler::DataBlock;
use crate::port::PortType;
use crate::registry::Registry;
use crate::signature::Signature;
use crate::value::Value;

/// Register [`Constant`] and [`Accumulator`]
pub fn register(registry: &mut Registry) {
    registry.register_instance(Constant::TYPE_NAME, || Box::new(Constant::default()));
    registry.register_instance(Accumulator::TYPE_NAME, || Box::new(Accumulator::default()));
}

/// Source node producing a fixed integer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constant {
    /// Produced value
    pub value: i64,
}

impl Constant {
    /// Type identity
    pub const TYPE_NAME: &'static str = "Constant";
    /// Method producing the value
    pub const METHOD: &'static str = "value";

    /// Create a constant
    pub fn new(value: i64) -> Self {
        Self { value }
    }
}

impl NodeBehavior for Constant {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn signature(&self, method: &str) -> Option<Signature> {
        (method == Self::METHOD).then(|| Signature::new().returns(PortType::Int))
    }

    fn invoke(
        &mut self,
        method: &str,
        _inputs: &[Value],
        _outputs: &mut [Option<Value>],
    ) -> Result<Value, InvokeError> {
        if method != Self::METHOD {
            return Err(InvokeError::UnknownMethod(method.to_string()));
        }
        Ok(Value::Int(self.value))
    }

    fn save_custom_data(&self, data: &mut DataBlock) {
        data.insert("value".into(), self.value.into());
    }

    fn load_custom_data(&mut self, data: &DataBlock) -> serde_json::Result<()> {
        if let Some(value) = data.get("value") {
            self.value = serde_json::from_value(value.clone())?;
        }
        Ok(())
    }
}

/// Running sum of every value it has been invoked with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Accumulator {
    /// Sum so far
    pub total: i64,
}

impl Accumulator {
    /// Type identity
    pub const TYPE_NAME: &'static str = "Accumulator";
    /// Method adding its input to the total
    pub const METHOD: &'static str = "accumulate";
}

impl NodeBehavior for Accumulator {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn signature(&self, method: &str) -> Option<Signature> {
        (method == Self::METHOD).then(|| {
            Signature::new()
                .input("value", PortType::Int)
                .returns(PortType::Int)
        })
    }

    fn invoke(
        &mut self,
        method: &str,
        inputs: &[Value],
        _outputs: &mut [Option<Value>],
    ) -> Result<Value, InvokeError> {
        if method != Self::METHOD {
            return Err(InvokeError::UnknownMethod(method.to_string()));
        }
        self.total = self
            .total
            .checked_add(int_arg(inputs, 0)?)
            .ok_or_else(|| InvokeError::Failed("accumulator overflow".into()))?;
        Ok(Value::Int(self.total))
    }

    fn save_custom_data(&self, data: &mut DataBlock) {
        data.insert("total".into(), self.total.into());
    }

    fn load_custom_data(&mut self, data: &DataBlock) -> serde_json::Result<()> {
        if let Some(total) = data.get("total") {
            self.total = serde_json::from_value(total.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_keeps_state() {
        let mut accumulator = Accumulator::default();
        for value in [1, 2, 3] {
            accumulator
                .invoke(Accumulator::METHOD, &[Value::Int(value)], &mut [])
                .unwrap();
        }
        assert_eq!(accumulator.total, 6);

        assert!(matches!(
            accumulator.invoke("reset", &[], &mut []),
            Err(InvokeError::UnknownMethod(_))
        ));
        assert!(accumulator.signature("reset").is_none());
    }

    #[test]
    fn test_custom_data() {
        let mut data = DataBlock::new();
        Constant::new(42).save_custom_data(&mut data);

        let mut restored = Constant::default();
        restored.load_custom_data(&data).unwrap();
        assert_eq!(restored, Constant::new(42));

        data.insert("value".into(), "forty-two".into());
        assert!(restored.load_custom_data(&data).is_err());
    }
}

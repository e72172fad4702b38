// SPDX-License-Identifier: MIT OR Apache-2.0
//! Handler storing where a node sits on a canvas.

use crate::handler::{DataBlock, NodeHandler};
use crate::node::Node;
use crate::registry::Registry;

/// Register [`LayoutHandler`]
pub fn register(registry: &mut Registry) {
    registry.register_handler(LayoutHandler::TYPE_NAME, || Box::new(LayoutHandler::default()));
}

/// Canvas position of a node, persisted in the handler-data block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutHandler {
    /// Position in canvas coordinates
    pub position: [f32; 2],
}

impl LayoutHandler {
    /// Type identity
    pub const TYPE_NAME: &'static str = "Layout";

    /// Create a handler at a position
    pub fn at(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

impl NodeHandler for LayoutHandler {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn on_save(&self, node: &Node, data: &mut DataBlock) {
        // NaN and infinities would be written as null
        if !self.position.iter().all(|c| c.is_finite()) {
            tracing::warn!(
                "Node '{}' has a non-finite position {:?}, not saving it",
                node.name(),
                self.position
            );
            return;
        }
        if let Ok(position) = serde_json::to_value(self.position) {
            data.insert("position".into(), position);
        }
    }

    fn on_load(&mut self, node: &Node, data: &DataBlock) -> serde_json::Result<()> {
        if let Some(position) = data.get("position") {
            self.position = serde_json::from_value(position.clone())?;
            tracing::trace!("Node '{}' placed at {:?}", node.name(), self.position);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::StaticMethod;
    use crate::port::PortType;
    use crate::signature::Signature;
    use crate::value::Value;

    fn node() -> Node {
        Node::from_static(StaticMethod::new(
            "test",
            "one",
            Signature::new().returns(PortType::Int),
            |_, _| Ok(Value::Int(1)),
        ))
        .unwrap()
    }

    #[test]
    fn test_position_round_trip() {
        let node = node();

        let mut data = DataBlock::new();
        LayoutHandler::at(120.0, -8.5).on_save(&node, &mut data);

        let mut restored = LayoutHandler::default();
        restored.on_load(&node, &data).unwrap();
        assert_eq!(restored, LayoutHandler::at(120.0, -8.5));

        // A missing block keeps the default
        let mut fresh = LayoutHandler::default();
        fresh.on_load(&node, &DataBlock::new()).unwrap();
        assert_eq!(fresh.position, [0.0, 0.0]);
    }

    #[test]
    fn test_non_finite_position_is_not_saved() {
        let node = node();
        let mut data = DataBlock::new();
        LayoutHandler::at(f32::NAN, 1.0).on_save(&node, &mut data);
        assert!(data.get("position").is_none());

        // The block still loads, keeping the default position
        let mut restored = LayoutHandler::default();
        restored.on_load(&node, &data).unwrap();
        assert_eq!(restored.position, [0.0, 0.0]);
    }
}

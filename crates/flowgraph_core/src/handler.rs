// SPDX-License-Identifier: MIT OR Apache-2.0
//! External per-node observer.
//!
//! An embedding layer (an editor, a scheduler) attaches a handler to a node
//! to follow structural changes, react to new output values and persist data
//! that is unrelated to the graph topology, such as a widget position.

use crate::node::Node;
use crate::port::{InPortId, OutPortId};

/// Free-form block of persisted data owned by a hook
pub type DataBlock = serde_json::Map<String, serde_json::Value>;

/// Observer and extension point attached to a node.
///
/// Structural notifications are fire-and-forget and run after the change
/// has been committed. While a hook runs, the handler is detached from the
/// node it observes, so `node.handler()` returns `None` inside the hook.
pub trait NodeHandler: Send {
    /// Stable type identity, used to recreate the handler on load
    fn type_name(&self) -> &str;

    /// An output of the node was linked
    fn on_link(&mut self, _from: OutPortId, _to: InPortId) {}

    /// An output of the node was unlinked
    fn on_unlink(&mut self, _from: OutPortId, _to: InPortId) {}

    /// The node's outputs were reset or recomputed
    fn on_outputs_changed(&mut self, _node: &Node) {}

    /// Write the handler's block
    fn on_save(&self, _node: &Node, _data: &mut DataBlock) {}

    /// Read the handler's block
    fn on_load(&mut self, _node: &Node, _data: &DataBlock) -> serde_json::Result<()> {
        Ok(())
    }
}

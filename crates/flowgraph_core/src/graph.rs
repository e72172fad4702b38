// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning nodes.

use crate::connection::LinkError;
use crate::node::{Node, NodeId};
use crate::port::{InPortId, OutPortId};
use crate::value::OutputValue;
use indexmap::IndexMap;

/// A dataflow graph.
///
/// Nodes are kept in insertion order; that order is the addressing scheme
/// used by saved documents.
#[derive(Debug, Default)]
pub struct Graph {
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Add a detached node to the graph
    pub fn add_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        let id = node.id();
        if node.is_attached() || self.nodes.contains_key(&id) {
            return Err(GraphError::NodeAlreadyAdded(node.name().to_string()));
        }

        tracing::debug!("Adding node '{}' ({})", node.name(), id);
        node.set_attached(true);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Sever every link of a node and take it out of the graph
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphError::NodeNotFound(node_id));
        }

        self.remove_links(node_id)?;

        let mut node = self
            .nodes
            .shift_remove(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.set_attached(false);
        tracing::debug!("Removed node '{}' ({})", node.name(), node_id);
        Ok(node)
    }

    /// Remove every node. Clearing an empty graph does nothing.
    pub fn clear(&mut self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in &ids {
            self.remove_links(*id)?;
        }
        for (_, mut node) in self.nodes.drain(..) {
            node.set_attached(false);
        }
        tracing::debug!("Cleared {} nodes", ids.len());
        Ok(())
    }

    /// Unlink every input (through its driver) and every output of a node
    fn remove_links(&mut self, node_id: NodeId) -> Result<(), LinkError> {
        let node = self.node_or_err(node_id)?;

        let incoming: Vec<(OutPortId, InPortId)> = node
            .inputs()
            .iter()
            .enumerate()
            .filter_map(|(index, p)| p.source().map(|s| (s, InPortId::new(node_id, index))))
            .collect();
        let outgoing: Vec<(OutPortId, InPortId)> = node
            .outputs()
            .iter()
            .enumerate()
            .flat_map(|(index, p)| {
                p.targets()
                    .iter()
                    .map(move |t| (OutPortId::new(node_id, index), *t))
            })
            .collect();

        for (from, to) in incoming.into_iter().chain(outgoing) {
            self.unlink(from, to)?;
        }
        Ok(())
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Find the first node with the given display name
    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name() == name)
    }

    /// Get all nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs, in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the graph owns a node
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Position of a node in insertion order
    pub fn index_of(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.get_index_of(&node_id)
    }

    /// Current value of an output port
    pub fn output_value(&self, port: OutPortId) -> Option<&OutputValue> {
        self.node(port.node)?.output(port.index).map(|p| p.value())
    }

    /// Evaluation roots: nodes with no linked output and every input linked
    pub fn result_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.no_outputs_linked() && n.all_inputs_linked())
            .map(Node::id)
            .collect()
    }

    pub(crate) fn node_or_err(&self, node_id: NodeId) -> Result<&Node, LinkError> {
        self.nodes.get(&node_id).ok_or(LinkError::NodeNotFound(node_id))
    }

    pub(crate) fn node_mut_or_err(&mut self, node_id: NodeId) -> Result<&mut Node, LinkError> {
        self.nodes
            .get_mut(&node_id)
            .ok_or(LinkError::NodeNotFound(node_id))
    }

    pub(crate) fn in_label(&self, port: InPortId) -> String {
        match self.nodes.get(&port.node) {
            Some(node) => node.in_label(port.index),
            None => format!("{}.#{}", port.node, port.index),
        }
    }

    pub(crate) fn out_label(&self, port: OutPortId) -> String {
        match self.nodes.get(&port.node) {
            Some(node) => node.out_label(port.index),
            None => format!("{}.#{}", port.node, port.index),
        }
    }
}

/// Error when changing the node set of a graph
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Node already belongs to a graph
    #[error("The node '{0}' already belongs to a graph")]
    NodeAlreadyAdded(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Link bookkeeping failed while severing links
    #[error(transparent)]
    Link(#[from] LinkError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::StaticMethod;
    use crate::port::PortType;
    use crate::signature::Signature;
    use crate::value::Value;

    fn source() -> Node {
        Node::from_static(StaticMethod::new(
            "test",
            "five",
            Signature::new().returns(PortType::Int),
            |_, _| Ok(Value::Int(5)),
        ))
        .unwrap()
    }

    fn sink() -> Node {
        Node::from_static(StaticMethod::new(
            "test",
            "sink",
            Signature::new().input("value", PortType::Int),
            |_, _| Ok(Value::Null),
        ))
        .unwrap()
    }

    #[test]
    fn test_add_and_remove() {
        let mut graph = Graph::new();
        let a = graph.add_node(source()).unwrap();
        let b = graph.add_node(sink()).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert!(graph.node(a).unwrap().is_attached());
        assert_eq!(graph.index_of(b), Some(1));

        let removed = graph.remove_node(a).unwrap();
        assert!(!removed.is_attached());
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.index_of(b), Some(0));

        assert!(matches!(
            graph.remove_node(a),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_removed_node_can_be_added_again() {
        let mut graph = Graph::new();
        let a = graph.add_node(source()).unwrap();
        let node = graph.remove_node(a).unwrap();

        let mut other = Graph::new();
        assert_eq!(other.add_node(node).unwrap(), a);
    }

    #[test]
    fn test_remove_severs_links() {
        let mut graph = Graph::new();
        let a = graph.add_node(source()).unwrap();
        let b = graph.add_node(sink()).unwrap();
        graph
            .link(OutPortId::new(a, 0), InPortId::new(b, 0))
            .unwrap();

        graph.remove_node(a).unwrap();
        assert!(!graph.node(b).unwrap().inputs()[0].is_linked());
        assert!(graph.links().is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut graph = Graph::new();
        let a = graph.add_node(source()).unwrap();
        let b = graph.add_node(sink()).unwrap();
        graph
            .link(OutPortId::new(a, 0), InPortId::new(b, 0))
            .unwrap();

        graph.clear().unwrap();
        assert!(graph.is_empty());
        graph.clear().unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_graph_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Graph>();
    }

    #[test]
    fn test_result_nodes() {
        let mut graph = Graph::new();
        let a = graph.add_node(source()).unwrap();
        let b = graph.add_node(sink()).unwrap();

        // Unlinked sink is not a root, the unlinked source is
        assert_eq!(graph.result_nodes(), vec![a]);

        graph
            .link(OutPortId::new(a, 0), InPortId::new(b, 0))
            .unwrap();
        assert_eq!(graph.result_nodes(), vec![b]);
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Links between output and input ports.
//!
//! A link is recorded on both ends: the output keeps the input in its
//! target list and the input keeps the output as its source. Every
//! mutation checks that both records agree.

use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::{InPortId, OutPortId, PortError, PortType};
use std::collections::{HashSet, VecDeque};

/// A link from an output port to an input port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Driving output
    pub from: OutPortId,
    /// Driven input
    pub to: InPortId,
}

impl Connection {
    /// Create a new connection
    pub fn new(from: OutPortId, to: InPortId) -> Self {
        Self { from, to }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from.node == node_id || self.to.node == node_id
    }
}

impl Graph {
    /// Link an output to an input, on behalf of the output's owner
    pub fn link(&mut self, from: OutPortId, to: InPortId) -> Result<(), LinkError> {
        self.link_from(from.node, from, to)
    }

    /// Link an output of `node` to an input.
    ///
    /// Fails without changing anything if the output belongs to another
    /// node, the link exists, the input already has a driver, the link
    /// would close a cycle or the port types differ.
    pub fn link_from(
        &mut self,
        node: NodeId,
        from: OutPortId,
        to: InPortId,
    ) -> Result<(), LinkError> {
        self.check_linkable(node, from, to)?;

        self.node_mut_or_err(from.node)?
            .output_mut(from.index)
            .ok_or_else(|| LinkError::PortNotFound(format!("{}.#{}", from.node, from.index)))?
            .add_target(to);
        self.node_mut_or_err(to.node)?
            .input_mut(to.index)
            .ok_or_else(|| LinkError::PortNotFound(format!("{}.#{}", to.node, to.index)))?
            .set_source(Some(from));

        tracing::debug!("Linked '{}' -> '{}'", self.out_label(from), self.in_label(to));

        self.node_mut_or_err(from.node)?.notify_link(from, to);
        Ok(())
    }

    /// Link the default output of one node to the default input of another
    pub fn link_default(&mut self, from_node: NodeId, to_node: NodeId) -> Result<(), LinkError> {
        let from = self.node_or_err(from_node)?.out_port(None)?;
        let to = self.node_or_err(to_node)?.in_port(None)?;
        self.link(from, to)
    }

    /// Advisory check: whether [`Graph::link`] would succeed
    pub fn is_linkable(&self, from: OutPortId, to: InPortId) -> bool {
        self.check_linkable(from.node, from, to).is_ok()
    }

    /// Run every check performed by [`Graph::link_from`]
    pub fn check_linkable(
        &self,
        node: NodeId,
        from: OutPortId,
        to: InPortId,
    ) -> Result<(), LinkError> {
        let owner = self.node_or_err(node)?;

        if from.node != node {
            return Err(LinkError::ForeignOutPort {
                port: self.out_label(from),
                node: owner.name().to_string(),
            });
        }

        let output = owner
            .output(from.index)
            .ok_or_else(|| LinkError::PortNotFound(self.out_label(from)))?;
        let input = self
            .node_or_err(to.node)?
            .input(to.index)
            .ok_or_else(|| LinkError::PortNotFound(self.in_label(to)))?;

        if output.targets().contains(&to) {
            if input.source() != Some(from) {
                return Err(self.corrupt(from, to, "the target port doesn't link back"));
            }
            return Err(LinkError::AlreadyLinked {
                from: self.out_label(from),
                to: self.in_label(to),
            });
        }

        if let Some(driver) = input.source() {
            if driver == from {
                return Err(self.corrupt(from, to, "the in port considers the link exists"));
            }
            return Err(LinkError::InputAlreadyLinked {
                to: self.in_label(to),
                driver: self.out_label(driver),
            });
        }

        if self.reaches(to.node, from.node) {
            return Err(LinkError::CycleDetected {
                from: self.out_label(from),
                to: self.in_label(to),
            });
        }

        if !output.port_type().can_connect_to(input.port_type()) {
            return Err(LinkError::IncompatibleTypes {
                from: self.out_label(from),
                to: self.in_label(to),
                from_type: output.port_type().clone(),
                to_type: input.port_type().clone(),
            });
        }

        Ok(())
    }

    /// Unlink an output from an input. A missing link is a no-op.
    pub fn unlink(&mut self, from: OutPortId, to: InPortId) -> Result<(), LinkError> {
        self.unlink_from(from.node, from, to)
    }

    /// Unlink an output of `node` from an input. A missing link is a no-op.
    pub fn unlink_from(
        &mut self,
        node: NodeId,
        from: OutPortId,
        to: InPortId,
    ) -> Result<(), LinkError> {
        let owner = self.node_or_err(node)?;
        if from.node != node {
            return Err(LinkError::ForeignOutPort {
                port: self.out_label(from),
                node: owner.name().to_string(),
            });
        }

        let output = owner
            .output(from.index)
            .ok_or_else(|| LinkError::PortNotFound(self.out_label(from)))?;
        if !output.targets().contains(&to) {
            return Ok(());
        }

        let links_back = self
            .node(to.node)
            .and_then(|n| n.input(to.index))
            .is_some_and(|p| p.source() == Some(from));
        if !links_back {
            return Err(self.corrupt(from, to, "the target in port doesn't link back"));
        }

        self.node_mut_or_err(to.node)?
            .input_mut(to.index)
            .ok_or_else(|| LinkError::PortNotFound(format!("{}.#{}", to.node, to.index)))?
            .set_source(None);
        let owner = self.node_mut_or_err(from.node)?;
        if let Some(output) = owner.output_mut(from.index) {
            output.remove_target(to);
        }

        tracing::debug!("Unlinked '{}' -> '{}'", self.out_label(from), self.in_label(to));

        self.node_mut_or_err(from.node)?.notify_unlink(from, to);
        Ok(())
    }

    /// Whether `from` currently drives `to`
    pub fn is_linked(&self, from: OutPortId, to: InPortId) -> bool {
        self.node(from.node)
            .and_then(|n| n.output(from.index))
            .is_some_and(|p| p.targets().contains(&to))
    }

    /// Every link, ordered by source node, output port and link order
    pub fn links(&self) -> Vec<Connection> {
        self.nodes()
            .flat_map(|node| {
                let id = node.id();
                node.outputs().iter().enumerate().flat_map(move |(index, p)| {
                    p.targets()
                        .iter()
                        .map(move |to| Connection::new(OutPortId::new(id, index), *to))
                })
            })
            .collect()
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.nodes()
            .flat_map(|n| n.outputs())
            .map(|p| p.targets().len())
            .sum()
    }

    /// Breadth-first search along outgoing links from `start`
    fn reaches(&self, start: NodeId, goal: NodeId) -> bool {
        if start == goal {
            return true;
        }

        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            let Some(node) = self.node(id) else {
                continue;
            };
            for target in node.outputs().iter().flat_map(|p| p.targets()) {
                if target.node == goal {
                    return true;
                }
                if visited.insert(target.node) {
                    queue.push_back(target.node);
                }
            }
        }

        false
    }

    fn corrupt(&self, from: OutPortId, to: InPortId, reason: &'static str) -> LinkError {
        LinkError::CorruptLink {
            from: self.out_label(from),
            to: self.in_label(to),
            reason,
        }
    }
}

/// Error when creating or removing a link
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port address out of range
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Named port lookup failed
    #[error(transparent)]
    Port(#[from] PortError),

    /// The output does not belong to the node performing the call
    #[error("The out port '{port}' doesn't belong to node '{node}'")]
    ForeignOutPort {
        /// Output label
        port: String,
        /// Calling node
        node: String,
    },

    /// The link already exists
    #[error("The link '{from} -> {to}' already exists")]
    AlreadyLinked {
        /// Output label
        from: String,
        /// Input label
        to: String,
    },

    /// The input already has a different driver
    #[error("The in port '{to}' is already linked to '{driver}'")]
    InputAlreadyLinked {
        /// Input label
        to: String,
        /// Current driver label
        driver: String,
    },

    /// The link would close a cycle
    #[error("Circular dependency detected from '{from} -> {to}'")]
    CycleDetected {
        /// Output label
        from: String,
        /// Input label
        to: String,
    },

    /// Declared types differ
    #[error("Unmatched port types of '{from} -> {to}' ({from_type} -> {to_type})")]
    IncompatibleTypes {
        /// Output label
        from: String,
        /// Input label
        to: String,
        /// Output type
        from_type: PortType,
        /// Input type
        to_type: PortType,
    },

    /// The two ends of a link disagree
    #[error("A bad existing link '{from} -> {to}' found ({reason})")]
    CorruptLink {
        /// Output label
        from: String,
        /// Input label
        to: String,
        /// Which side is inconsistent
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::StaticMethod;
    use crate::node::Node;
    use crate::signature::Signature;
    use crate::value::Value;

    fn pass(ty: PortType) -> Node {
        Node::from_static(StaticMethod::new(
            "test",
            "pass",
            Signature::new().input("value", ty.clone()).returns(ty),
            |inputs, _| Ok(inputs[0].clone()),
        ))
        .unwrap()
    }

    fn chain(graph: &mut Graph, count: usize) -> Vec<NodeId> {
        let ids: Vec<NodeId> = (0..count)
            .map(|_| graph.add_node(pass(PortType::Int)).unwrap())
            .collect();
        for pair in ids.windows(2) {
            graph.link_default(pair[0], pair[1]).unwrap();
        }
        ids
    }

    #[test]
    fn test_link_is_symmetric() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 2);
        let from = OutPortId::new(ids[0], 0);
        let to = InPortId::new(ids[1], 0);

        assert!(graph.is_linked(from, to));
        assert_eq!(graph.node(ids[1]).unwrap().inputs()[0].source(), Some(from));
        assert_eq!(graph.links(), vec![Connection::new(from, to)]);
        assert_eq!(graph.link_count(), 1);
    }

    #[test]
    fn test_duplicate_link() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 2);
        let result = graph.link(OutPortId::new(ids[0], 0), InPortId::new(ids[1], 0));
        assert!(matches!(result, Err(LinkError::AlreadyLinked { .. })));
    }

    #[test]
    fn test_foreign_out_port() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 3);
        let result = graph.link_from(ids[2], OutPortId::new(ids[0], 0), InPortId::new(ids[1], 0));
        assert!(matches!(result, Err(LinkError::ForeignOutPort { .. })));
    }

    #[test]
    fn test_self_link_is_a_cycle() {
        let mut graph = Graph::new();
        let a = graph.add_node(pass(PortType::Int)).unwrap();
        let result = graph.link(OutPortId::new(a, 0), InPortId::new(a, 0));
        assert!(matches!(result, Err(LinkError::CycleDetected { .. })));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut graph = Graph::new();
        let top = graph.add_node(pass(PortType::Int)).unwrap();
        let join = graph
            .add_node(
                Node::from_static(StaticMethod::new(
                    "test",
                    "join",
                    Signature::new()
                        .input("a", PortType::Int)
                        .input("b", PortType::Int),
                    |_, _| Ok(Value::Null),
                ))
                .unwrap(),
            )
            .unwrap();
        let left = graph.add_node(pass(PortType::Int)).unwrap();
        let right = graph.add_node(pass(PortType::Int)).unwrap();

        graph.link_default(top, left).unwrap();
        graph.link_default(top, right).unwrap();
        graph.link(OutPortId::new(left, 0), InPortId::new(join, 0)).unwrap();
        graph.link(OutPortId::new(right, 0), InPortId::new(join, 1)).unwrap();
        assert_eq!(graph.link_count(), 4);
        assert_eq!(graph.node(top).unwrap().outputs()[0].targets().len(), 2);
    }

    #[test]
    fn test_incompatible_types() {
        let mut graph = Graph::new();
        let a = graph.add_node(pass(PortType::Int)).unwrap();
        let b = graph.add_node(pass(PortType::Float)).unwrap();

        assert!(!graph.is_linkable(OutPortId::new(a, 0), InPortId::new(b, 0)));
        let result = graph.link_default(a, b);
        assert!(matches!(result, Err(LinkError::IncompatibleTypes { .. })));
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_unlink_missing_is_noop() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 2);
        let from = OutPortId::new(ids[0], 0);
        let to = InPortId::new(ids[1], 0);

        graph.unlink(from, to).unwrap();
        assert!(!graph.is_linked(from, to));
        graph.unlink(from, to).unwrap();
        assert!(graph.is_linkable(from, to));
    }

    #[test]
    fn test_unlink_detects_corruption() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 2);
        let from = OutPortId::new(ids[0], 0);
        let to = InPortId::new(ids[1], 0);

        // Break the back-reference behind the graph's back
        graph
            .node_mut(ids[1])
            .unwrap()
            .input_mut(0)
            .unwrap()
            .set_source(None);

        assert!(matches!(
            graph.unlink(from, to),
            Err(LinkError::CorruptLink { .. })
        ));
        assert!(matches!(
            graph.link(from, to),
            Err(LinkError::CorruptLink { .. })
        ));
    }

    #[test]
    fn test_missing_node() {
        let mut graph = Graph::new();
        let ids = chain(&mut graph, 1);
        let ghost = NodeId::new();
        let result = graph.link(OutPortId::new(ids[0], 0), InPortId::new(ghost, 0));
        assert!(matches!(result, Err(LinkError::NodeNotFound(id)) if id == ghost));
    }
}

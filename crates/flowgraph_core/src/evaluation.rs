// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! Evaluation runs in passes over the dependency closure of a set of roots:
//! a validation pass that checks connectivity, detects cycles and records
//! the dependency order; a reset pass that clears outputs; and an execution
//! pass that invokes each node once, after everything it depends on.

use crate::binding::InvokeError;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::InPortId;
use crate::value::{OutputValue, Value};
use std::collections::HashSet;

/// Depth-first walk state for one node
struct Frame {
    node: NodeId,
    next_input: usize,
}

impl Graph {
    /// Evaluate every result node and everything it depends on
    pub fn evaluate(&mut self) -> Result<(), EvaluationError> {
        let roots = self.result_nodes();
        tracing::debug!("Evaluating graph from {} result nodes", roots.len());

        let order = self.evaluation_order(&roots)?;

        for id in self.node_ids().collect::<Vec<_>>() {
            if let Some(node) = self.node_mut(id) {
                node.reset_outputs();
            }
        }

        self.execute(&order)
    }

    /// Evaluate a single node and its dependencies.
    ///
    /// Every input of the node must be linked; nothing is reset or invoked
    /// otherwise.
    pub fn evaluate_node(&mut self, node_id: NodeId) -> Result<(), EvaluationError> {
        let node = self
            .node(node_id)
            .ok_or(EvaluationError::NodeNotFound(node_id))?;
        if let Some(index) = node.first_unlinked_input() {
            return Err(EvaluationError::InputNotLinked {
                port: InPortId::new(node_id, index),
                label: node.in_label(index),
            });
        }

        tracing::debug!("Evaluating node '{}'", node.name());
        let order = self.evaluation_order(&[node_id])?;

        for id in &order {
            if let Some(node) = self.node_mut(*id) {
                node.reset_outputs();
            }
        }

        self.execute(&order)
    }

    /// Validation pass: the dependency order of everything reachable from
    /// `roots`, dependencies first. Has no side effects.
    pub fn evaluation_order(&self, roots: &[NodeId]) -> Result<Vec<NodeId>, EvaluationError> {
        let mut processed = HashSet::new();
        let mut order = Vec::new();

        for &root in roots {
            if !processed.insert(root) {
                continue;
            }

            let mut stack = vec![Frame {
                node: root,
                next_input: 0,
            }];
            let mut open = HashSet::from([root]);

            while let Some(frame) = stack.last_mut() {
                let node = self
                    .node(frame.node)
                    .ok_or(EvaluationError::NodeNotFound(frame.node))?;

                if frame.next_input == 0 {
                    if let Some(index) = node.first_unlinked_input() {
                        return Err(EvaluationError::InputNotLinked {
                            port: InPortId::new(frame.node, index),
                            label: node.in_label(index),
                        });
                    }
                }

                let mut dependency = None;
                while let Some(input) = node.input(frame.next_input) {
                    let port = InPortId::new(frame.node, frame.next_input);
                    let source = input.source().ok_or_else(|| EvaluationError::InputNotLinked {
                        port,
                        label: node.in_label(port.index),
                    })?;

                    if open.contains(&source.node) {
                        return Err(EvaluationError::CircularDependency {
                            port,
                            label: node.in_label(port.index),
                        });
                    }

                    frame.next_input += 1;
                    if processed.insert(source.node) {
                        dependency = Some(source.node);
                        break;
                    }
                }

                match dependency {
                    Some(next) => {
                        open.insert(next);
                        stack.push(Frame {
                            node: next,
                            next_input: 0,
                        });
                    }
                    None => {
                        open.remove(&frame.node);
                        order.push(frame.node);
                        stack.pop();
                    }
                }
            }
        }

        Ok(order)
    }

    /// Execution pass over an order produced by [`Graph::evaluation_order`]
    fn execute(&mut self, order: &[NodeId]) -> Result<(), EvaluationError> {
        for &id in order {
            let inputs = self.gather_inputs(id)?;

            let node = self
                .node_mut(id)
                .ok_or(EvaluationError::NodeNotFound(id))?;
            tracing::trace!("Invoking '{}' with {} inputs", node.name(), inputs.len());

            node.invoke(&inputs)
                .map_err(|error| EvaluationError::Invoke {
                    node: node.name().to_string(),
                    error,
                })?;
        }

        tracing::debug!("Evaluated {} nodes", order.len());
        Ok(())
    }

    /// Read every input of a node from its driving output
    fn gather_inputs(&self, node_id: NodeId) -> Result<Vec<Value>, EvaluationError> {
        let node = self
            .node(node_id)
            .ok_or(EvaluationError::NodeNotFound(node_id))?;

        node.inputs()
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let port = InPortId::new(node_id, index);
                let source = input.source().ok_or_else(|| EvaluationError::InputNotLinked {
                    port,
                    label: node.in_label(index),
                })?;

                match self.output_value(source) {
                    Some(OutputValue::Set(value)) => Ok(value.clone()),
                    _ => Err(EvaluationError::MissingValue {
                        port,
                        label: node.in_label(index),
                        driver: self.out_label(source),
                    }),
                }
            })
            .collect()
    }
}

/// Error during evaluation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// An input has no driver
    #[error("The in port '{label}' is not linked")]
    InputNotLinked {
        /// Offending input
        port: InPortId,
        /// `Node.port` label
        label: String,
    },

    /// A dependency is already on the open path
    #[error("Circular dependency found at the in port '{label}'")]
    CircularDependency {
        /// Offending input
        port: InPortId,
        /// `Node.port` label
        label: String,
    },

    /// The driver has not produced a value
    #[error("The in port '{label}' has not fetched a value from out port '{driver}'")]
    MissingValue {
        /// Offending input
        port: InPortId,
        /// `Node.port` label
        label: String,
        /// Driver label
        driver: String,
    },

    /// The callable failed
    #[error("Evaluation of '{node}' failed: {error}")]
    Invoke {
        /// Node name
        node: String,
        /// Callable error
        #[source]
        error: InvokeError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::StaticMethod;
    use crate::node::Node;
    use crate::port::{OutPortId, PortType};
    use crate::signature::Signature;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn constant(value: i64) -> Node {
        Node::from_static(StaticMethod::new(
            "test",
            "constant",
            Signature::new().returns(PortType::Int),
            move |_, _| Ok(Value::Int(value)),
        ))
        .unwrap()
    }

    fn counted_add(calls: Arc<AtomicUsize>) -> Node {
        Node::from_static(StaticMethod::new(
            "test",
            "add",
            Signature::new()
                .input("a", PortType::Int)
                .input("b", PortType::Int)
                .returns(PortType::Int),
            move |inputs, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                let a = inputs[0].as_int().unwrap_or_default();
                let b = inputs[1].as_int().unwrap_or_default();
                Ok(Value::Int(a + b))
            },
        ))
        .unwrap()
    }

    #[test]
    fn test_shared_dependency_invoked_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let one = graph.add_node(constant(1)).unwrap();
        let mid = graph.add_node(counted_add(calls.clone())).unwrap();
        let top = graph.add_node(counted_add(calls.clone())).unwrap();

        // one -> mid.a, one -> mid.b, mid -> top.a, one -> top.b
        graph.link(OutPortId::new(one, 0), InPortId::new(mid, 0)).unwrap();
        graph.link(OutPortId::new(one, 0), InPortId::new(mid, 1)).unwrap();
        graph.link(OutPortId::new(mid, 0), InPortId::new(top, 0)).unwrap();
        graph.link(OutPortId::new(one, 0), InPortId::new(top, 1)).unwrap();

        let order = graph.evaluation_order(&[top]).unwrap();
        assert_eq!(order, vec![one, mid, top]);

        graph.evaluate().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            graph.output_value(OutPortId::new(top, 0)),
            Some(&OutputValue::Set(Value::Int(3)))
        );
    }

    #[test]
    fn test_validation_has_no_side_effects() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node(constant(2)).unwrap();
        let sum = graph.add_node(counted_add(calls.clone())).unwrap();
        graph.link(OutPortId::new(a, 0), InPortId::new(sum, 0)).unwrap();
        graph.link(OutPortId::new(a, 0), InPortId::new(sum, 1)).unwrap();
        graph.evaluate().unwrap();

        graph.evaluation_order(&[sum]).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(graph.output_value(OutPortId::new(sum, 0)).unwrap().is_set());
    }

    #[test]
    fn test_partially_linked_branch_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node(constant(2)).unwrap();
        let sum = graph.add_node(counted_add(calls.clone())).unwrap();
        graph.link(OutPortId::new(a, 0), InPortId::new(sum, 0)).unwrap();

        // `sum` has an unlinked input, so it is not a root, and `a` feeds it
        assert!(graph.result_nodes().is_empty());
        graph.evaluate().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(graph.output_value(OutPortId::new(a, 0)), Some(&OutputValue::Unset));
    }

    #[test]
    fn test_corrupted_cycle_is_reported() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node(counted_add(calls.clone())).unwrap();
        let b = graph.add_node(counted_add(calls.clone())).unwrap();
        let c = graph.add_node(constant(1)).unwrap();
        graph.link(OutPortId::new(c, 0), InPortId::new(a, 1)).unwrap();
        graph.link(OutPortId::new(c, 0), InPortId::new(b, 1)).unwrap();
        graph.link(OutPortId::new(a, 0), InPortId::new(b, 0)).unwrap();

        // Close the loop b -> a.a without the link checks
        graph
            .node_mut(b)
            .unwrap()
            .output_mut(0)
            .unwrap()
            .add_target(InPortId::new(a, 0));
        graph
            .node_mut(a)
            .unwrap()
            .input_mut(0)
            .unwrap()
            .set_source(Some(OutPortId::new(b, 0)));

        let result = graph.evaluation_order(&[b]);
        assert!(matches!(
            result,
            Err(EvaluationError::CircularDependency { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invoke_failure_keeps_earlier_outputs() {
        let mut graph = Graph::new();
        let a = graph.add_node(constant(4)).unwrap();
        let fail = graph
            .add_node(
                Node::from_static(StaticMethod::new(
                    "test",
                    "fail",
                    Signature::new().input("value", PortType::Int),
                    |_, _| Err(InvokeError::Failed("boom".into())),
                ))
                .unwrap(),
            )
            .unwrap();
        graph.link_default(a, fail).unwrap();

        let result = graph.evaluate();
        assert!(matches!(result, Err(EvaluationError::Invoke { .. })));
        assert_eq!(
            graph.output_value(OutPortId::new(a, 0)),
            Some(&OutputValue::Set(Value::Int(4)))
        );
    }

    #[test]
    fn test_evaluate_node_only_touches_dependencies() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let a = graph.add_node(constant(3)).unwrap();
        let sum = graph.add_node(counted_add(calls.clone())).unwrap();
        let other = graph.add_node(constant(9)).unwrap();
        graph.link(OutPortId::new(a, 0), InPortId::new(sum, 0)).unwrap();
        graph.link(OutPortId::new(a, 0), InPortId::new(sum, 1)).unwrap();

        graph.evaluate_node(sum).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            graph.output_value(OutPortId::new(sum, 0)),
            Some(&OutputValue::Set(Value::Int(6)))
        );
        assert_eq!(graph.output_value(OutPortId::new(other, 0)), Some(&OutputValue::Unset));
    }
}

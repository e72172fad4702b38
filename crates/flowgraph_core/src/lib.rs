// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow node graph framework.
//!
//! Nodes wrap a callable (a registered static function or a method of a
//! stateful instance) and expose its parameters as typed ports. Output ports
//! feed any number of input ports; each input port has at most one driver.
//!
//! ## Architecture
//!
//! - [`Graph`] owns its nodes and keeps links consistent on both sides
//! - Linking rejects cycles, type mismatches and doubly-driven inputs
//! - Evaluation walks dependencies depth-first from the result nodes
//! - Documents save and restore graphs through a [`BindingResolver`]
//! - [`NodeHandler`]s observe nodes and persist their own data
//!
//! ```ignore
//! let registry = flowgraph_core::create_standard_registry();
//! let mut graph = Graph::new();
//! let a = graph.add_node(registry.instance_node("Constant", "value")?)?;
//! let b = graph.add_node(registry.static_node("math", "double")?)?;
//! graph.link_default(a, b)?;
//! graph.evaluate()?;
//! ```

pub mod binding;
pub mod connection;
pub mod document;
pub mod evaluation;
pub mod graph;
pub mod handler;
pub mod library;
pub mod node;
pub mod port;
pub mod registry;
pub mod signature;
pub mod value;

pub use binding::{Binding, BindingError, BindingResolver, InvokeError, NodeBehavior, StaticMethod};
pub use connection::{Connection, LinkError};
pub use document::{
    DocumentError, DocumentFormat, DocumentOptions, GraphDocument, LinkRecord, NodeRecord,
    OutPortRecord,
};
pub use evaluation::EvaluationError;
pub use graph::{Graph, GraphError};
pub use handler::{DataBlock, NodeHandler};
pub use library::create_standard_registry;
pub use node::{Node, NodeId};
pub use port::{InPortId, InputPort, OutPortId, OutputPort, Port, PortDirection, PortError, PortType};
pub use registry::Registry;
pub use signature::{PortSpec, Signature};
pub use value::{OutputValue, Value};

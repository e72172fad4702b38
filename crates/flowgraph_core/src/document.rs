// SPDX-License-Identifier: MIT OR Apache-2.0
//! Portable graph documents.
//!
//! A document is an ordered array of node records. Links are stored on the
//! driving output and address their target by node index and input port
//! name. Loading builds every node first and re-links afterwards through
//! [`Graph::link_from`], so the usual link checks apply.

use crate::binding::{Binding, BindingError, BindingResolver};
use crate::connection::LinkError;
use crate::graph::{Graph, GraphError};
use crate::handler::DataBlock;
use crate::node::{Node, NodeId};
use crate::port::{OutPortId, PortError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// On-disk encoding of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// JSON, a top-level array of node records
    #[default]
    Json,
    /// Rusty Object Notation
    Ron,
}

impl DocumentFormat {
    /// Choose a format from a file extension; anything but `.ron` is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Self::Ron,
            _ => Self::Json,
        }
    }
}

/// Options for writing documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOptions {
    /// Encoding
    pub format: DocumentFormat,
    /// Indent the output
    pub pretty: bool,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            format: DocumentFormat::Json,
            pretty: true,
        }
    }
}

/// A saved graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphDocument {
    /// Node records, in graph order
    pub nodes: Vec<NodeRecord>,
}

/// A saved node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Display name
    pub name: String,
    /// Declaring type identity of the callable
    pub container: String,
    /// Method identity
    pub method: String,
    /// Whether the callable is unbound
    pub is_static: bool,
    /// Instance type identity, empty for static callables
    #[serde(default)]
    pub instance_type: String,
    /// Handler type identity, empty without a handler
    #[serde(default)]
    pub handler: String,
    /// Output ports, in port order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub out_ports: Vec<OutPortRecord>,
    /// Block written by the bound instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<DataBlock>,
    /// Block written by the handler
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_data: Option<DataBlock>,
}

/// A saved output port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutPortRecord {
    /// Port name, empty for the return value
    pub name: String,
    /// Declared type identity
    #[serde(rename = "type")]
    pub port_type: String,
    /// Inputs fed by this port
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkRecord>,
}

/// A saved link target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Index of the target node in the document
    pub node: usize,
    /// Target input name, empty for the sole input
    pub in_port: String,
}

impl GraphDocument {
    /// Encode the document
    pub fn render(&self, options: DocumentOptions) -> Result<String, DocumentError> {
        let text = match (options.format, options.pretty) {
            (DocumentFormat::Json, true) => serde_json::to_string_pretty(self)?,
            (DocumentFormat::Json, false) => serde_json::to_string(self)?,
            (DocumentFormat::Ron, true) => {
                ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?
            }
            (DocumentFormat::Ron, false) => ron::ser::to_string(self)?,
        };
        Ok(text)
    }

    /// Decode a document
    pub fn parse(text: &str, format: DocumentFormat) -> Result<Self, DocumentError> {
        let document = match format {
            DocumentFormat::Json => serde_json::from_str(text)?,
            DocumentFormat::Ron => ron::from_str(text)?,
        };
        Ok(document)
    }

    /// Read and decode a document, choosing the format by extension
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, DocumentFormat::from_path(path))
    }

    /// Encode and write a document
    pub fn write(&self, path: impl AsRef<Path>, options: DocumentOptions) -> Result<(), DocumentError> {
        let text = self.render(options)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

impl Graph {
    /// Describe the graph as a document
    pub fn save(&self) -> Result<GraphDocument, DocumentError> {
        let indices: HashMap<NodeId, usize> = self
            .node_ids()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        let nodes = self
            .nodes()
            .map(|node| save_node(self, node, &indices))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Saved graph with {} nodes", nodes.len());
        Ok(GraphDocument { nodes })
    }

    /// Encode the graph
    pub fn save_string(&self, options: DocumentOptions) -> Result<String, DocumentError> {
        self.save()?.render(options)
    }

    /// Encode the graph to a file, choosing the format by extension
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        let options = DocumentOptions {
            format: DocumentFormat::from_path(path),
            ..DocumentOptions::default()
        };
        self.save()?.write(path, options)
    }

    /// Build a new graph from a document
    pub fn from_document(
        document: &GraphDocument,
        resolver: &dyn BindingResolver,
    ) -> Result<Self, DocumentError> {
        let mut graph = Graph::new();

        // Nodes first, links may point forward
        let mut ids = Vec::with_capacity(document.nodes.len());
        for record in &document.nodes {
            let node = load_node(record, resolver)?;
            ids.push(graph.add_node(node)?);
        }

        for (record, &source) in document.nodes.iter().zip(&ids) {
            for (index, port) in record.out_ports.iter().enumerate() {
                let from = OutPortId::new(source, index);
                for link in &port.links {
                    let target = *ids.get(link.node).ok_or_else(|| DocumentError::LinkTarget {
                        node: record.name.clone(),
                        index: link.node,
                    })?;
                    let to = graph
                        .node(target)
                        .ok_or(GraphError::NodeNotFound(target))?
                        .in_port(Some(link.in_port.as_str()))?;
                    graph.link_from(source, from, to)?;
                }
            }
        }

        tracing::info!(
            "Loaded graph with {} nodes and {} links",
            graph.node_count(),
            graph.link_count()
        );
        Ok(graph)
    }

    /// Replace the graph's contents with a document.
    ///
    /// The graph is left untouched if the document fails to load.
    pub fn load(
        &mut self,
        document: &GraphDocument,
        resolver: &dyn BindingResolver,
    ) -> Result<(), DocumentError> {
        let loaded = Self::from_document(document, resolver)?;
        self.clear()?;
        *self = loaded;
        Ok(())
    }

    /// Decode and load a document
    pub fn load_str(
        &mut self,
        text: &str,
        format: DocumentFormat,
        resolver: &dyn BindingResolver,
    ) -> Result<(), DocumentError> {
        let document = GraphDocument::parse(text, format)?;
        self.load(&document, resolver)
    }

    /// Read and load a document, choosing the format by extension
    pub fn load_path(
        &mut self,
        path: impl AsRef<Path>,
        resolver: &dyn BindingResolver,
    ) -> Result<(), DocumentError> {
        let document = GraphDocument::read(path)?;
        self.load(&document, resolver)
    }
}

fn save_node(
    graph: &Graph,
    node: &Node,
    indices: &HashMap<NodeId, usize>,
) -> Result<NodeRecord, DocumentError> {
    let binding = node.binding();

    let mut out_ports = Vec::with_capacity(node.outputs().len());
    for output in node.outputs() {
        let mut links = Vec::with_capacity(output.targets().len());
        for target in output.targets() {
            let index = *indices
                .get(&target.node)
                .ok_or(DocumentError::DanglingLink(target.node))?;
            let in_port = graph
                .node(target.node)
                .and_then(|n| n.input(target.index))
                .ok_or(DocumentError::DanglingLink(target.node))?
                .name()
                .to_string();
            links.push(LinkRecord {
                node: index,
                in_port,
            });
        }

        out_ports.push(OutPortRecord {
            name: output.name().unwrap_or_default().to_string(),
            port_type: output.port_type().identity().to_string(),
            links,
        });
    }

    let custom_data = binding.behavior().map(|behavior| {
        let mut block = DataBlock::new();
        behavior.save_custom_data(&mut block);
        block
    });

    let handler_data = node.handler().map(|handler| {
        let mut block = DataBlock::new();
        handler.on_save(node, &mut block);
        block
    });

    Ok(NodeRecord {
        name: node.name().to_string(),
        container: binding.container().to_string(),
        method: binding.method().to_string(),
        is_static: binding.is_static(),
        instance_type: binding.instance_type().unwrap_or_default().to_string(),
        handler: node
            .handler()
            .map(|h| h.type_name().to_string())
            .unwrap_or_default(),
        out_ports,
        custom_data,
        handler_data,
    })
}

fn load_node(record: &NodeRecord, resolver: &dyn BindingResolver) -> Result<Node, DocumentError> {
    let binding_error = |error: BindingError| DocumentError::Binding {
        node: record.name.clone(),
        error,
    };

    let binding = if record.is_static {
        Binding::Static(
            resolver
                .resolve_static(&record.container, &record.method)
                .map_err(binding_error)?,
        )
    } else {
        let behavior = resolver
            .create_instance(&record.instance_type)
            .map_err(binding_error)?;
        if behavior.type_name() != record.container {
            return Err(binding_error(BindingError::ContainerMismatch {
                container: record.container.clone(),
                instance_type: behavior.type_name().to_string(),
            }));
        }
        Binding::Instance {
            method: record.method.clone(),
            behavior,
        }
    };

    let mut node = Node::new(binding, Some(&record.name)).map_err(binding_error)?;
    check_out_ports(&node, record, resolver)?;

    if let Some(behavior) = node.behavior_mut() {
        let data = record.custom_data.clone().unwrap_or_default();
        behavior
            .load_custom_data(&data)
            .map_err(|error| DocumentError::CustomData {
                node: record.name.clone(),
                error,
            })?;
    }

    if !record.handler.is_empty() {
        let mut handler = resolver
            .create_handler(&record.handler)
            .map_err(binding_error)?;
        let data = record.handler_data.clone().unwrap_or_default();
        handler
            .on_load(&node, &data)
            .map_err(|error| DocumentError::CustomData {
                node: record.name.clone(),
                error,
            })?;
        node.set_handler(Some(handler));
    }

    Ok(node)
}

/// Compare the saved outputs with the ones derived from the callable
fn check_out_ports(
    node: &Node,
    record: &NodeRecord,
    resolver: &dyn BindingResolver,
) -> Result<(), DocumentError> {
    if record.out_ports.len() != node.outputs().len() {
        return Err(DocumentError::OutPortCount {
            node: record.name.clone(),
            expected: node.outputs().len(),
            found: record.out_ports.len(),
        });
    }

    for (index, (saved, derived)) in record.out_ports.iter().zip(node.outputs()).enumerate() {
        let mismatch = |expected: String, found: String| DocumentError::OutPortMismatch {
            node: record.name.clone(),
            index,
            expected,
            found,
        };

        let derived_name = derived.name().unwrap_or_default();
        if saved.name != derived_name {
            return Err(mismatch(
                format!("port '{derived_name}'"),
                format!("port '{}'", saved.name),
            ));
        }

        let saved_type = resolver
            .resolve_type(&saved.port_type)
            .map_err(|error| DocumentError::Binding {
                node: record.name.clone(),
                error,
            })?;
        if &saved_type != derived.port_type() {
            return Err(mismatch(
                format!("type '{}'", derived.port_type()),
                format!("type '{saved_type}'"),
            ));
        }
    }

    Ok(())
}

/// Error when saving or loading a document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// RON encoding failed
    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),

    /// RON decoding failed
    #[error("RON error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// A callable, type or handler could not be resolved
    #[error("Cannot bind node '{node}': {error}")]
    Binding {
        /// Node name
        node: String,
        /// Resolver error
        #[source]
        error: BindingError,
    },

    /// The saved outputs differ in number from the callable's
    #[error("Node '{node}' expects {expected} out ports, the document has {found}")]
    OutPortCount {
        /// Node name
        node: String,
        /// Derived count
        expected: usize,
        /// Saved count
        found: usize,
    },

    /// A saved output differs in name or type from the callable's
    #[error("Out port {index} of node '{node}': expected {expected}, found {found}")]
    OutPortMismatch {
        /// Node name
        node: String,
        /// Port index
        index: usize,
        /// Derived port
        expected: String,
        /// Saved port
        found: String,
    },

    /// A link addresses a node index outside the document
    #[error("Node '{node}' links to node index {index}, which does not exist")]
    LinkTarget {
        /// Node name
        node: String,
        /// Target index
        index: usize,
    },

    /// A link points at a node outside the graph
    #[error("A link points at node {0}, which is not in the graph")]
    DanglingLink(NodeId),

    /// A custom or handler block could not be read
    #[error("Cannot load data block of node '{node}': {error}")]
    CustomData {
        /// Node name
        node: String,
        /// Decoding error
        #[source]
        error: serde_json::Error,
    },

    /// Target input port lookup failed
    #[error(transparent)]
    Port(#[from] PortError),

    /// Re-linking failed
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Node bookkeeping failed
    #[error(transparent)]
    Graph(#[from] GraphError),
}

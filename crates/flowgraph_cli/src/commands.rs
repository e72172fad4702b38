// SPDX-License-Identifier: MIT OR Apache-2.0
//! Subcommand implementations.

use flowgraph_core::library::{Accumulator, Constant, LayoutHandler};
use flowgraph_core::{
    create_standard_registry, BindingError, DocumentError, DocumentFormat, DocumentOptions,
    EvaluationError, Graph, GraphDocument, GraphError, LinkError, Node, NodeId, PortError,
    Registry, Value,
};
use indexmap::IndexMap;
use std::path::Path;

/// Error reported by a subcommand
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Reading or writing a document failed
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Evaluation failed
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// Building the demo graph failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Building the demo graph failed
    #[error(transparent)]
    Link(#[from] LinkError),

    /// Building the demo graph failed
    #[error(transparent)]
    Port(#[from] PortError),

    /// Building the demo graph failed
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// Printing failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load, evaluate and print the outputs of every result node
pub fn run(path: &Path, json: bool) -> Result<(), CliError> {
    let registry = create_standard_registry();
    let mut graph = Graph::new();
    graph.load_path(path, &registry)?;
    graph.evaluate()?;

    let mut results: IndexMap<String, IndexMap<String, serde_json::Value>> = IndexMap::new();
    for id in graph.result_nodes() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let outputs = results.entry(node.name().to_string()).or_default();
        for output in node.outputs() {
            let value = match output.value().value() {
                Some(value) => to_json(value)?,
                None => serde_json::Value::Null,
            };
            outputs.insert(output.port().display_name().to_string(), value);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for (node, outputs) in &results {
            for (port, value) in outputs {
                println!("{node}.{port} = {value}");
            }
        }
    }
    Ok(())
}

/// Print the nodes and links of a document
pub fn inspect(path: &Path) -> Result<(), CliError> {
    let registry = create_standard_registry();
    let mut graph = Graph::new();
    graph.load_path(path, &registry)?;

    for (index, node) in graph.nodes().enumerate() {
        let binding = node.binding();
        let kind = if binding.is_static() { "static" } else { "instance" };
        let handler = node
            .handler()
            .map(|h| format!(", handler {}", h.type_name()))
            .unwrap_or_default();
        println!(
            "[{index}] {} ({}.{}, {kind}{handler})",
            node.name(),
            binding.container(),
            binding.method()
        );
    }

    for link in graph.links() {
        println!(
            "{} -> {}",
            port_label(&graph, link.from.node, |n| n
                .output(link.from.index)
                .map(|p| p.port().display_name().to_string())),
            port_label(&graph, link.to.node, |n| n
                .input(link.to.index)
                .map(|p| p.name().to_string())),
        );
    }
    Ok(())
}

/// Write the sample graph
pub fn demo(path: &Path, format: Option<DocumentFormat>, pretty: bool) -> Result<(), CliError> {
    let registry = create_standard_registry();
    let graph = demo_graph(&registry)?;

    let options = DocumentOptions {
        format: format.unwrap_or_else(|| DocumentFormat::from_path(path)),
        pretty,
    };
    graph.save()?.write(path, options)?;
    tracing::info!("Wrote demo graph to {}", path.display());
    Ok(())
}

/// Re-encode a document without resolving it
pub fn convert(input: &Path, output: &Path, pretty: bool) -> Result<(), CliError> {
    let document = GraphDocument::read(input)?;
    let options = DocumentOptions {
        format: DocumentFormat::from_path(output),
        pretty,
    };
    document.write(output, options)?;
    tracing::info!(
        "Converted {} nodes from {} to {}",
        document.nodes.len(),
        input.display(),
        output.display()
    );
    Ok(())
}

/// `(6 + 4) * 2` formatted and accumulated, next to a comparison of 6 and 4
fn demo_graph(registry: &Registry) -> Result<Graph, CliError> {
    let mut graph = Graph::new();

    let six = graph.add_node(
        Node::from_instance(Box::new(Constant::new(6)), Constant::METHOD)?
            .with_name("Six")
            .with_handler(Box::new(LayoutHandler::at(0.0, 0.0))),
    )?;
    let four = graph.add_node(
        Node::from_instance(Box::new(Constant::new(4)), Constant::METHOD)?
            .with_name("Four")
            .with_handler(Box::new(LayoutHandler::at(0.0, 120.0))),
    )?;
    let add = graph.add_node(registry.static_node("math", "add")?.with_name("Sum"))?;
    let double = graph.add_node(registry.static_node("math", "double")?.with_name("Doubled"))?;
    let format = graph.add_node(registry.static_node("text", "format_int")?.with_name("Label"))?;
    let total = graph.add_node(
        Node::from_instance(Box::new(Accumulator::default()), Accumulator::METHOD)?
            .with_name("Total"),
    )?;
    let compare = graph.add_node(registry.static_node("logic", "compare")?.with_name("Compare"))?;

    for (source, target, input) in [
        (six, add, "a"),
        (four, add, "b"),
        (six, compare, "a"),
        (four, compare, "b"),
    ] {
        let from = node(&graph, source)?.out_port(None)?;
        let to = node(&graph, target)?.in_port(Some(input))?;
        graph.link(from, to)?;
    }
    graph.link_default(add, double)?;
    graph.link_default(double, format)?;
    graph.link_default(double, total)?;

    Ok(graph)
}

fn node(graph: &Graph, id: NodeId) -> Result<&Node, GraphError> {
    graph.node(id).ok_or(GraphError::NodeNotFound(id))
}

fn port_label(graph: &Graph, id: NodeId, port: impl Fn(&Node) -> Option<String>) -> String {
    match graph.node(id) {
        Some(node) => format!(
            "{}.{}",
            node.name(),
            port(node).unwrap_or_else(|| "?".to_string())
        ),
        None => format!("{id}.?"),
    }
}

fn to_json(value: &Value) -> Result<serde_json::Value, serde_json::Error> {
    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => (*v).into(),
        Value::Int(v) => (*v).into(),
        Value::Float(v) => serde_json::to_value(v)?,
        Value::Vector2(v) => serde_json::to_value(v)?,
        Value::Vector3(v) => serde_json::to_value(v)?,
        Value::Vector4(v) | Value::Color(v) => serde_json::to_value(v)?,
        Value::String(v) => v.as_str().into(),
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_graph_evaluates() {
        let registry = create_standard_registry();
        let mut graph = demo_graph(&registry).unwrap();
        graph.evaluate().unwrap();

        let label = graph.find_node("Label").unwrap();
        assert_eq!(
            label.return_value().and_then(|v| v.value()),
            Some(&Value::from("20"))
        );
        let compare = graph.find_node("Compare").unwrap();
        assert_eq!(
            compare.outputs()[1].value().value(),
            Some(&Value::Bool(false))
        );

        let mut roots: Vec<&str> = graph
            .result_nodes()
            .into_iter()
            .filter_map(|id| graph.node(id).map(Node::name))
            .collect();
        roots.sort_unstable();
        assert_eq!(roots, vec!["Compare", "Label", "Total"]);
    }

    #[test]
    fn test_to_json() {
        assert_eq!(to_json(&Value::Int(3)).unwrap(), serde_json::json!(3));
        assert_eq!(
            to_json(&Value::Vector2([1.0, 2.0])).unwrap(),
            serde_json::json!([1.0, 2.0])
        );
        assert_eq!(to_json(&Value::from("x")).unwrap(), serde_json::json!("x"));
    }
}

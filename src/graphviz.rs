use std::collections::HashMap;
use std::fmt::Write;

use crate::graph::{Dim, GraphInfo, TensorDescriptor};

pub fn graph_to_dot(graph: &GraphInfo) -> String {
    let mut dot = String::from("digraph onnx {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [fontname=\"Helvetica\"];\n");
    dot.push_str("  edge [fontname=\"Helvetica\"];\n\n");

    // Value name -> DOT node that produces it.
    let mut sources: HashMap<&str, String> = HashMap::new();

    for (idx, input) in graph.inputs.iter().enumerate() {
        let node_id = format!("input_{}", idx);
        write_value(&mut dot, &node_id, "Input", input, "oval", "#d0e6ff");
        sources.insert(input.name.as_str(), node_id);
    }
    for (idx, init) in graph.initializers.iter().enumerate() {
        let node_id = format!("init_{}", idx);
        write_value(
            &mut dot,
            &node_id,
            "Initializer",
            &init.as_descriptor(),
            "diamond",
            "#f0f0f0",
        );
        sources.insert(init.name.as_str(), node_id);
    }
    for (idx, output) in graph.outputs.iter().enumerate() {
        write_value(
            &mut dot,
            &format!("output_{}", idx),
            "Output",
            output,
            "doublecircle",
            "#d6f5d6",
        );
    }

    dot.push('\n');

    for (idx, node) in graph.nodes.iter().enumerate() {
        let node_id = format!("op_{}", idx);
        let mut label_lines = vec![format!("{} (#{})", node.op_type, idx)];
        if let Some(name) = &node.name {
            if !name.is_empty() {
                label_lines.push(name.clone());
            }
        }
        for attr in &node.attributes {
            label_lines.push(format!("{}={:?}", attr.name, attr.value));
        }
        let label = escape_label(&label_lines.join("\n"));
        let _ = writeln!(
            dot,
            "  {} [shape=box,style=rounded,label=\"{}\"];",
            node_id, label
        );

        for input in node.inputs.iter().filter(|name| !name.is_empty()) {
            if let Some(source) = sources.get(input.as_str()) {
                let _ = writeln!(
                    dot,
                    "  {} -> {} [label=\"{}\"];",
                    source,
                    node_id,
                    escape_label(input)
                );
            }
        }
        for output in &node.outputs {
            sources.insert(output.as_str(), node_id.clone());
        }
    }

    for (idx, output) in graph.outputs.iter().enumerate() {
        if let Some(source) = sources.get(output.name.as_str()) {
            let _ = writeln!(
                dot,
                "  {} -> output_{} [label=\"{}\"];",
                source,
                idx,
                escape_label(&output.name)
            );
        }
    }

    dot.push_str("}\n");
    dot
}

fn write_value(
    dot: &mut String,
    node_id: &str,
    kind: &str,
    desc: &TensorDescriptor,
    shape: &str,
    fill: &str,
) {
    let label_lines = [
        format!("{} {}", kind, desc.name),
        format!("{:?}", desc.data_type),
        format_shape(&desc.shape),
    ];
    let label = escape_label(&label_lines.join("\n"));
    let _ = writeln!(
        dot,
        "  {} [shape={},style=filled,fillcolor=\"{}\",label=\"{}\"];",
        node_id, shape, fill, label
    );
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_shape(shape: &[Dim]) -> String {
    if shape.is_empty() {
        "scalar".to_string()
    } else {
        shape
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("x")
    }
}

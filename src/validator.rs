use std::collections::{BTreeMap, HashSet};

use crate::error::GraphError;
use crate::graph::{GraphInfo, TensorDescriptor};

#[derive(Debug)]
pub struct ValidationArtifacts {
    pub value_to_consumers: BTreeMap<String, Vec<String>>,
    pub value_to_producer: BTreeMap<String, String>,
    /// Element count of the single graph input, if it is fully static.
    pub input_element_count: Option<u64>,
    /// Element count of the single graph output, if it is fully static.
    pub output_element_count: Option<u64>,
}

/// Checks that node inputs and outputs form a connected chain of names from
/// the declared graph inputs (and initializers) to the declared outputs.
///
/// Shapes are not checked against each other: a reshape between tensors of
/// different element counts passes validation.
pub struct GraphValidator<'a> {
    graph: &'a GraphInfo,
    available: HashSet<String>,
    value_to_consumers: BTreeMap<String, Vec<String>>,
    value_to_producer: BTreeMap<String, String>,
}

impl<'a> GraphValidator<'a> {
    pub fn new(graph: &'a GraphInfo) -> Self {
        Self {
            graph,
            available: HashSet::new(),
            value_to_consumers: BTreeMap::new(),
            value_to_producer: BTreeMap::new(),
        }
    }

    pub fn validate(mut self) -> Result<ValidationArtifacts, GraphError> {
        let graph = self.graph;
        if graph.nodes.is_empty() || graph.outputs.is_empty() {
            return Err(GraphError::EmptyGraph);
        }

        for input in &graph.inputs {
            self.declare(&input.name, "input")?;
        }
        for init in &graph.initializers {
            self.declare(&init.name, "initializer")?;
            match init.declared_len() {
                Some(expected) if expected == init.values.len() => {}
                expected => {
                    return Err(GraphError::ConstantLengthMismatch {
                        name: init.name.clone(),
                        expected: expected.unwrap_or(0),
                        actual: init.values.len(),
                    });
                }
            }
        }
        let mut seen_outputs = HashSet::new();
        for output in &graph.outputs {
            if output.name.is_empty() {
                return Err(GraphError::MissingValueName { role: "output" });
            }
            if !seen_outputs.insert(output.name.as_str()) {
                return Err(GraphError::DuplicateValueName {
                    name: output.name.clone(),
                });
            }
        }

        for (idx, node) in graph.nodes.iter().enumerate() {
            let label = node.display_name(idx);
            if node.op_type.is_empty() {
                return Err(GraphError::MissingOpType { node: label });
            }
            for input in &node.inputs {
                // Empty names mark omitted optional inputs.
                if input.is_empty() {
                    continue;
                }
                if !self.available.contains(input) {
                    return Err(GraphError::ValueNotReady {
                        node: label,
                        value: input.clone(),
                    });
                }
                self.value_to_consumers
                    .entry(input.clone())
                    .or_default()
                    .push(label.clone());
            }
            for output in &node.outputs {
                if output.is_empty() {
                    continue;
                }
                if !self.available.insert(output.clone()) {
                    return Err(GraphError::ValueProducedTwice {
                        node: label,
                        value: output.clone(),
                    });
                }
                self.value_to_producer.insert(output.clone(), label.clone());
            }
        }

        for output in &graph.outputs {
            if !self.value_to_producer.contains_key(&output.name) {
                return Err(GraphError::OutputNotProduced {
                    value: output.name.clone(),
                });
            }
        }

        let declared = graph
            .inputs
            .iter()
            .map(|input| &input.name)
            .chain(graph.initializers.iter().map(|init| &init.name));
        for name in declared {
            if !self.value_to_consumers.contains_key(name) {
                return Err(GraphError::ValueNeverUsed { value: name.clone() });
            }
        }

        Ok(ValidationArtifacts {
            value_to_consumers: self.value_to_consumers,
            value_to_producer: self.value_to_producer,
            input_element_count: single_element_count(&graph.inputs),
            output_element_count: single_element_count(&graph.outputs),
        })
    }

    fn declare(&mut self, name: &str, role: &'static str) -> Result<(), GraphError> {
        if name.is_empty() {
            return Err(GraphError::MissingValueName { role });
        }
        if !self.available.insert(name.to_string()) {
            return Err(GraphError::DuplicateValueName {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

fn single_element_count(descriptors: &[TensorDescriptor]) -> Option<u64> {
    match descriptors {
        [only] => only.element_count(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConstantTensor, DataType, Dim, Node};

    fn descriptor(name: &str, shape: &[i64]) -> TensorDescriptor {
        TensorDescriptor::new(
            name,
            DataType::Float32,
            shape.iter().copied().map(Dim::Fixed),
        )
    }

    fn chain_graph() -> GraphInfo {
        GraphInfo::new(
            vec![
                Node::new("Reshape", ["x"], ["flat"]),
                Node::new("Reshape", ["flat", "target"], ["y"]),
            ],
            "chain",
            vec![descriptor("x", &[1, 2, 3])],
            vec![descriptor("y", &[1, 6])],
            vec![ConstantTensor::int64("target", vec![2], vec![1, 6])],
        )
    }

    #[test]
    fn accepts_connected_chain() {
        let graph = chain_graph();
        let artifacts = GraphValidator::new(&graph).validate().unwrap();

        assert_eq!(artifacts.value_to_producer["flat"], "Reshape#0");
        assert_eq!(artifacts.value_to_producer["y"], "Reshape#1");
        assert_eq!(artifacts.value_to_consumers["x"], vec!["Reshape#0"]);
        assert_eq!(artifacts.value_to_consumers["target"], vec!["Reshape#1"]);
        assert_eq!(artifacts.input_element_count, Some(6));
        assert_eq!(artifacts.output_element_count, Some(6));
    }

    #[test]
    fn rejects_graph_without_nodes() {
        let mut graph = chain_graph();
        graph.nodes.clear();
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::EmptyGraph)
        ));
    }

    #[test]
    fn rejects_value_consumed_before_produced() {
        let mut graph = chain_graph();
        graph.nodes.swap(0, 1);
        let err = GraphValidator::new(&graph).validate().unwrap_err();
        match err {
            GraphError::ValueNotReady { node, value } => {
                assert_eq!(node, "Reshape#0");
                assert_eq!(value, "flat");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_output_that_is_never_produced() {
        let mut graph = chain_graph();
        graph.outputs.push(descriptor("scores", &[1]));
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::OutputNotProduced { value }) if value == "scores"
        ));
    }

    #[test]
    fn rejects_duplicate_declarations() {
        let mut graph = chain_graph();
        graph.initializers[0].name = "x".to_string();
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::DuplicateValueName { name }) if name == "x"
        ));
    }

    #[test]
    fn rejects_duplicate_outputs() {
        let mut graph = chain_graph();
        graph.outputs.push(descriptor("y", &[1, 6]));
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::DuplicateValueName { name }) if name == "y"
        ));
    }

    #[test]
    fn rejects_node_overwriting_a_value() {
        let mut graph = chain_graph();
        graph.nodes[0].outputs = vec!["x".to_string()];
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::ValueProducedTwice { value, .. }) if value == "x"
        ));
    }

    #[test]
    fn rejects_unused_initializer() {
        let mut graph = chain_graph();
        graph
            .initializers
            .push(ConstantTensor::int64("spare", vec![1], vec![0]));
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::ValueNeverUsed { value }) if value == "spare"
        ));
    }

    #[test]
    fn rejects_initializer_with_wrong_value_count() {
        let mut graph = chain_graph();
        graph.initializers[0] = ConstantTensor::int64("target", vec![3], vec![1, 6]);
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::ConstantLengthMismatch { expected: 3, actual: 2, .. })
        ));
    }

    #[test]
    fn rejects_missing_names_and_op_types() {
        let mut graph = chain_graph();
        graph.inputs[0].name.clear();
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::MissingValueName { role: "input" })
        ));

        let mut graph = chain_graph();
        graph.nodes[1].op_type.clear();
        assert!(matches!(
            GraphValidator::new(&graph).validate(),
            Err(GraphError::MissingOpType { .. })
        ));
    }

    #[test]
    fn element_count_mismatch_is_not_an_error() {
        let mut graph = chain_graph();
        graph.outputs[0] = descriptor("y", &[1, 84, 8400]);
        let artifacts = GraphValidator::new(&graph).validate().unwrap();
        assert_eq!(artifacts.input_element_count, Some(6));
        assert_eq!(artifacts.output_element_count, Some(705_600));
    }
}

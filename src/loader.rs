use std::fs;
use std::path::Path;

use prost::Message;
use tracing::debug;

use crate::converters::OnnxConverter;
use crate::error::GraphError;
use crate::graph::{
    AttributeValue, ConstantTensor, ConstantValues, DataType, Dim, GraphInfo, ModelInfo, Node,
    NodeAttribute, TensorDescriptor,
};
use crate::protos::onnx::{
    AttributeProto, GraphProto, ModelProto, NodeProto, TensorProto, ValueInfoProto,
    attribute_proto::AttributeType, tensor_shape_proto::dimension::Value as DimensionValue,
    type_proto::Value as TypeValue,
};

/// Load a serialized ONNX model and convert it back into the crate's graph
/// representation.
pub fn load_model_from_path(path: impl AsRef<Path>) -> Result<ModelInfo, GraphError> {
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref).map_err(|err| GraphError::io(path_ref, err))?;
    debug!(path = %path_ref.display(), bytes = bytes.len(), "decoding ONNX model");
    let proto = ModelProto::decode(bytes.as_slice()).map_err(|err| GraphError::Decode {
        path: path_ref.to_path_buf(),
        reason: err.to_string(),
    })?;
    model_from_proto(&proto)
}

pub fn model_from_proto(proto: &ModelProto) -> Result<ModelInfo, GraphError> {
    let graph = proto.graph.as_ref().ok_or(GraphError::MissingGraph)?;
    // Only the default operator domain is tracked; custom domains are ignored.
    let opset_version = proto
        .opset_import
        .iter()
        .find(|opset| opset.domain.is_empty() || opset.domain == "ai.onnx")
        .map(|opset| opset.version)
        .unwrap_or_default();

    Ok(ModelInfo {
        graph: graph_from_proto(graph)?,
        opset_version,
        ir_version: proto.ir_version,
        producer_name: proto.producer_name.clone(),
        producer_version: proto.producer_version.clone(),
    })
}

fn graph_from_proto(graph: &GraphProto) -> Result<GraphInfo, GraphError> {
    let inputs = graph
        .input
        .iter()
        .map(descriptor_from_proto)
        .collect::<Result<Vec<_>, _>>()?;
    let outputs = graph
        .output
        .iter()
        .map(descriptor_from_proto)
        .collect::<Result<Vec<_>, _>>()?;
    let initializers = graph
        .initializer
        .iter()
        .map(constant_from_proto)
        .collect::<Result<Vec<_>, _>>()?;
    let nodes = graph
        .node
        .iter()
        .map(node_from_proto)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GraphInfo {
        name: graph.name.clone(),
        nodes,
        inputs,
        outputs,
        initializers,
    })
}

fn node_from_proto(node: &NodeProto) -> Result<Node, GraphError> {
    Ok(Node {
        name: (!node.name.is_empty()).then(|| node.name.clone()),
        op_type: node.op_type.clone(),
        inputs: node.input.clone(),
        outputs: node.output.clone(),
        attributes: node
            .attribute
            .iter()
            .map(attribute_from_proto)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn data_type(code: i32) -> Result<DataType, GraphError> {
    OnnxConverter::data_type_from_code(code).ok_or(GraphError::UnsupportedDataType { code })
}

fn descriptor_from_proto(value: &ValueInfoProto) -> Result<TensorDescriptor, GraphError> {
    let Some(TypeValue::TensorType(tensor)) = value.r#type.as_ref().and_then(|t| t.value.as_ref())
    else {
        return Err(GraphError::ConversionFailed {
            format: "onnx".to_string(),
            reason: format!("value `{}` is not a tensor type", value.name),
        });
    };
    let shape = tensor
        .shape
        .as_ref()
        .map(|shape| {
            shape
                .dim
                .iter()
                .map(|dim| match &dim.value {
                    Some(DimensionValue::DimValue(size)) => Dim::Fixed(*size),
                    Some(DimensionValue::DimParam(param)) => Dim::Symbolic(param.clone()),
                    None => Dim::Symbolic(String::new()),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(TensorDescriptor {
        name: value.name.clone(),
        data_type: data_type(tensor.elem_type)?,
        shape,
    })
}

fn constant_from_proto(tensor: &TensorProto) -> Result<ConstantTensor, GraphError> {
    let data_type = data_type(tensor.data_type)?;
    let values = match data_type {
        DataType::Int64 if !tensor.raw_data.is_empty() => ConstantValues::Int64(
            raw_elements::<8>(tensor, data_type)?
                .map(i64::from_le_bytes)
                .collect(),
        ),
        DataType::Int64 => ConstantValues::Int64(tensor.int64_data.clone()),
        DataType::Float32 if !tensor.raw_data.is_empty() => ConstantValues::Float32(
            raw_elements::<4>(tensor, data_type)?
                .map(f32::from_le_bytes)
                .collect(),
        ),
        DataType::Float32 => ConstantValues::Float32(tensor.float_data.clone()),
        other => {
            return Err(GraphError::ConversionFailed {
                format: "onnx".to_string(),
                reason: format!(
                    "initializer `{}` has unsupported element type {:?}",
                    tensor.name, other
                ),
            });
        }
    };

    Ok(ConstantTensor {
        name: tensor.name.clone(),
        dims: tensor.dims.clone(),
        values,
    })
}

/// Splits `raw_data` into little-endian elements of `N` bytes. A trailing
/// partial element is an error.
fn raw_elements<const N: usize>(
    tensor: &TensorProto,
    data_type: DataType,
) -> Result<impl Iterator<Item = [u8; N]> + '_, GraphError> {
    if tensor.raw_data.len() % N != 0 {
        return Err(GraphError::ConversionFailed {
            format: "onnx".to_string(),
            reason: format!(
                "initializer `{}` has {} bytes of raw {:?} data, not a multiple of {}",
                tensor.name,
                tensor.raw_data.len(),
                data_type,
                N
            ),
        });
    }
    Ok(tensor.raw_data.chunks_exact(N).map(|chunk| {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(chunk);
        bytes
    }))
}

fn attribute_from_proto(attr: &AttributeProto) -> Result<NodeAttribute, GraphError> {
    let value = match AttributeType::try_from(attr.r#type).unwrap_or(AttributeType::Undefined) {
        AttributeType::Int => AttributeValue::Int(attr.i),
        AttributeType::Ints => AttributeValue::Ints(attr.ints.clone()),
        AttributeType::Float => AttributeValue::Float(attr.f),
        AttributeType::Floats => AttributeValue::Floats(attr.floats.clone()),
        AttributeType::String => {
            AttributeValue::String(String::from_utf8_lossy(&attr.s).into_owned())
        }
        other => {
            return Err(GraphError::ConversionFailed {
                format: "onnx".to_string(),
                reason: format!("attribute `{}` has unsupported type {:?}", attr.name, other),
            });
        }
    };
    Ok(NodeAttribute {
        name: attr.name.clone(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::model_to_proto;
    use crate::protos::onnx::{OperatorSetIdProto, tensor_proto::DataType as ProtoDataType};
    use crate::yolo::{StubOptions, build_test_yolo_model};

    fn tiny_model() -> ModelInfo {
        let x = TensorDescriptor::new("x", DataType::Float32, [1, 4].map(Dim::Fixed));
        let y = TensorDescriptor::new("y", DataType::Float32, [2, 2].map(Dim::Fixed));
        let graph = GraphInfo::new(
            vec![
                Node::new("Reshape", ["x", "shape"], ["y"])
                    .with_name("reshape")
                    .with_attribute("allowzero", AttributeValue::Int(0)),
            ],
            "tiny",
            vec![x],
            vec![y],
            vec![ConstantTensor::int64("shape", vec![2], vec![2, 2])],
        );
        ModelInfo::new(graph, 13)
    }

    #[test]
    fn reads_back_written_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tiny.onnx");
        std::fs::write(&path, model_to_proto(&tiny_model()).encode_to_vec()).unwrap();

        let loaded = load_model_from_path(&path).unwrap();
        assert_eq!(loaded, tiny_model());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_model_from_path(dir.path().join("absent.onnx")).unwrap_err();
        assert!(matches!(err, GraphError::Io { .. }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("garbage.onnx");
        std::fs::write(&path, [0xff, 0xff, 0xff, 0xff]).unwrap();
        let err = load_model_from_path(&path).unwrap_err();
        assert!(matches!(err, GraphError::Decode { .. }));
    }

    #[test]
    fn model_without_graph_is_rejected() {
        let proto = ModelProto {
            ir_version: 6,
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 11,
            }],
            ..Default::default()
        };
        assert!(matches!(
            model_from_proto(&proto),
            Err(GraphError::MissingGraph)
        ));
    }

    #[test]
    fn opset_is_read_from_default_domain() {
        let mut proto = model_to_proto(&tiny_model());
        proto.opset_import.insert(
            0,
            OperatorSetIdProto {
                domain: "com.microsoft".to_string(),
                version: 1,
            },
        );
        assert_eq!(model_from_proto(&proto).unwrap().opset_version, 13);
    }

    #[test]
    fn raw_int64_initializers_are_decoded() {
        let mut proto = model_to_proto(&tiny_model());
        let graph = proto.graph.as_mut().unwrap();
        graph.initializer[0].int64_data.clear();
        graph.initializer[0].raw_data = [2i64, 2]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();

        let model = model_from_proto(&proto).unwrap();
        assert_eq!(
            model.graph.initializers[0].values,
            ConstantValues::Int64(vec![2, 2])
        );
    }

    #[test]
    fn truncated_raw_data_is_rejected() {
        let mut proto = model_to_proto(&tiny_model());
        let graph = proto.graph.as_mut().unwrap();
        graph.initializer[0].int64_data.clear();
        let mut raw: Vec<u8> = [2i64, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
        raw.pop();
        graph.initializer[0].raw_data = raw;

        let err = model_from_proto(&proto).unwrap_err();
        let GraphError::ConversionFailed { reason, .. } = err else {
            panic!("expected a conversion failure, got {err:?}");
        };
        assert!(reason.contains("15 bytes"), "{reason}");
    }

    #[test]
    fn dynamic_batch_survives_a_file_round_trip() {
        let model = build_test_yolo_model(&StubOptions {
            dynamic_batch: true,
        });
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("dynamic.onnx");
        std::fs::write(&path, model_to_proto(&model).encode_to_vec()).unwrap();

        let loaded = load_model_from_path(&path).unwrap();
        let batch = Dim::Symbolic("batch".to_string());
        assert_eq!(loaded.graph.inputs[0].shape[0], batch);
        assert_eq!(loaded.graph.outputs[0].shape[0], batch);
        assert_eq!(loaded.graph.outputs[0].shape[1..], [Dim::Fixed(84), Dim::Fixed(8400)]);
        assert_eq!(loaded, model);
    }

    #[test]
    fn unsupported_element_type_is_reported() {
        let mut proto = model_to_proto(&tiny_model());
        proto.graph.as_mut().unwrap().initializer[0].data_type = ProtoDataType::Bool as i32;
        assert!(matches!(
            model_from_proto(&proto),
            Err(GraphError::UnsupportedDataType { code: 9 })
        ));
    }
}

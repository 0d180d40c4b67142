use prost::Message;
use tracing::debug;

use crate::converters::ConvertedGraph;
use crate::error::GraphError;
use crate::graph::{
    AttributeValue, ConstantTensor, ConstantValues, DataType, Dim, GraphInfo, ModelInfo, Node,
    NodeAttribute, TensorDescriptor,
};
use crate::protos::onnx::{
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
    TensorShapeProto, TypeProto, ValueInfoProto, attribute_proto::AttributeType,
    tensor_proto::DataType as ProtoDataType, tensor_shape_proto::Dimension,
    tensor_shape_proto::dimension::Value as DimensionValue, type_proto::Tensor as TensorTypeProto,
    type_proto::Value as TypeValue,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct OnnxConverter;

impl OnnxConverter {
    pub(crate) fn data_type_code(data_type: DataType) -> ProtoDataType {
        match data_type {
            DataType::Float32 => ProtoDataType::Float,
            DataType::Float16 => ProtoDataType::Float16,
            DataType::Int64 => ProtoDataType::Int64,
            DataType::Int32 => ProtoDataType::Int32,
            DataType::Uint32 => ProtoDataType::Uint32,
            DataType::Uint64 => ProtoDataType::Uint64,
            DataType::Int8 => ProtoDataType::Int8,
            DataType::Uint8 => ProtoDataType::Uint8,
        }
    }

    pub(crate) fn data_type_from_code(code: i32) -> Option<DataType> {
        let data_type = match ProtoDataType::try_from(code).ok()? {
            ProtoDataType::Float => DataType::Float32,
            ProtoDataType::Float16 => DataType::Float16,
            ProtoDataType::Int64 => DataType::Int64,
            ProtoDataType::Int32 => DataType::Int32,
            ProtoDataType::Uint32 => DataType::Uint32,
            ProtoDataType::Uint64 => DataType::Uint64,
            ProtoDataType::Int8 => DataType::Int8,
            ProtoDataType::Uint8 => DataType::Uint8,
            _ => return None,
        };
        Some(data_type)
    }

    fn initializer(constant: &ConstantTensor) -> TensorProto {
        let mut tensor = TensorProto {
            name: constant.name.clone(),
            dims: constant.dims.clone(),
            data_type: Self::data_type_code(constant.data_type()) as i32,
            ..Default::default()
        };
        // Typed repeated fields, not raw_data.
        match &constant.values {
            ConstantValues::Int64(values) => tensor.int64_data = values.clone(),
            ConstantValues::Float32(values) => tensor.float_data = values.clone(),
        }
        tensor
    }

    fn attribute(attr: &NodeAttribute) -> AttributeProto {
        let mut proto = AttributeProto {
            name: attr.name.clone(),
            ..Default::default()
        };
        let kind = match &attr.value {
            AttributeValue::Int(value) => {
                proto.i = *value;
                AttributeType::Int
            }
            AttributeValue::Ints(values) => {
                proto.ints = values.clone();
                AttributeType::Ints
            }
            AttributeValue::Float(value) => {
                proto.f = *value;
                AttributeType::Float
            }
            AttributeValue::Floats(values) => {
                proto.floats = values.clone();
                AttributeType::Floats
            }
            AttributeValue::String(value) => {
                proto.s = value.as_bytes().to_vec();
                AttributeType::String
            }
        };
        proto.r#type = kind as i32;
        proto
    }

    fn node(node: &Node) -> NodeProto {
        let mut attributes: Vec<&NodeAttribute> = node.attributes.iter().collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));

        NodeProto {
            input: node.inputs.clone(),
            output: node.outputs.clone(),
            name: node.name.clone().unwrap_or_default(),
            op_type: node.op_type.clone(),
            attribute: attributes.into_iter().map(Self::attribute).collect(),
            ..Default::default()
        }
    }

    fn graph(graph: &GraphInfo) -> GraphProto {
        GraphProto {
            name: graph.name.clone(),
            node: graph.nodes.iter().map(Self::node).collect(),
            input: graph.inputs.iter().map(value_info).collect(),
            output: graph.outputs.iter().map(value_info).collect(),
            initializer: graph.initializers.iter().map(Self::initializer).collect(),
            ..Default::default()
        }
    }
}

/// Builds the protobuf message tree for `model`.
pub fn model_to_proto(model: &ModelInfo) -> ModelProto {
    ModelProto {
        ir_version: model.ir_version,
        producer_name: model.producer_name.clone(),
        producer_version: model.producer_version.clone(),
        graph: Some(OnnxConverter::graph(&model.graph)),
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(), // default ONNX domain
            version: model.opset_version,
        }],
        ..Default::default()
    }
}

impl crate::converters::GraphConverter for OnnxConverter {
    fn format(&self) -> &'static str {
        "onnx"
    }

    fn convert(&self, model: &ModelInfo) -> Result<ConvertedGraph, GraphError> {
        debug!(
            graph = %model.graph.name,
            nodes = model.graph.nodes.len(),
            initializers = model.graph.initializers.len(),
            opset = model.opset_version,
            "encoding ONNX model"
        );
        let data = model_to_proto(model).encode_to_vec();

        Ok(ConvertedGraph {
            format: "onnx",
            content_type: "application/onnx",
            data,
        })
    }
}

fn value_info(desc: &TensorDescriptor) -> ValueInfoProto {
    ValueInfoProto {
        name: desc.name.clone(),
        r#type: Some(TypeProto {
            value: Some(TypeValue::TensorType(TensorTypeProto {
                elem_type: OnnxConverter::data_type_code(desc.data_type) as i32,
                shape: Some(TensorShapeProto {
                    dim: desc
                        .shape
                        .iter()
                        .map(|d| Dimension {
                            value: Some(match d {
                                Dim::Fixed(size) => DimensionValue::DimValue(*size),
                                Dim::Symbolic(param) => DimensionValue::DimParam(param.clone()),
                            }),
                            denotation: String::new(),
                        })
                        .collect(),
                }),
            })),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::GraphConverter;

    fn sample_model() -> ModelInfo {
        let input = TensorDescriptor::new(
            "x",
            DataType::Float32,
            vec![Dim::Symbolic("batch".to_string()), Dim::Fixed(4)],
        );
        let output = TensorDescriptor::new("y", DataType::Float32, [2, 2].map(Dim::Fixed));
        let shape = ConstantTensor::int64("shape", vec![2], vec![2, 2]);
        let node = Node::new("Reshape", ["x", "shape"], ["y"])
            .with_attribute("zeta", AttributeValue::Int(0))
            .with_attribute("alpha", AttributeValue::Floats(vec![0.5]));
        let graph = GraphInfo::new(vec![node], "sample", vec![input], vec![output], vec![shape]);
        ModelInfo::new(graph, 11)
    }

    #[test]
    fn model_carries_opset_and_graph_name() {
        let proto = model_to_proto(&sample_model());
        assert_eq!(proto.ir_version, ModelInfo::DEFAULT_IR_VERSION);
        assert_eq!(proto.opset_import.len(), 1);
        assert_eq!(proto.opset_import[0].domain, "");
        assert_eq!(proto.opset_import[0].version, 11);
        assert_eq!(proto.graph.as_ref().unwrap().name, "sample");
    }

    #[test]
    fn symbolic_dims_become_dim_params() {
        let proto = model_to_proto(&sample_model());
        let graph = proto.graph.unwrap();
        let Some(TypeValue::TensorType(tensor)) =
            graph.input[0].r#type.as_ref().and_then(|t| t.value.clone())
        else {
            panic!("input is not a tensor type");
        };
        assert_eq!(tensor.elem_type, ProtoDataType::Float as i32);
        let dims: Vec<_> = tensor.shape.unwrap().dim.into_iter().map(|d| d.value).collect();
        assert_eq!(
            dims,
            vec![
                Some(DimensionValue::DimParam("batch".to_string())),
                Some(DimensionValue::DimValue(4)),
            ]
        );
    }

    #[test]
    fn int64_initializer_uses_typed_field() {
        let graph = model_to_proto(&sample_model()).graph.unwrap();
        let init = &graph.initializer[0];
        assert_eq!(init.name, "shape");
        assert_eq!(init.data_type, ProtoDataType::Int64 as i32);
        assert_eq!(init.dims, vec![2]);
        assert_eq!(init.int64_data, vec![2, 2]);
        assert!(init.raw_data.is_empty());
    }

    #[test]
    fn attributes_are_sorted_and_typed() {
        let graph = model_to_proto(&sample_model()).graph.unwrap();
        let attrs = &graph.node[0].attribute;
        assert_eq!(attrs[0].name, "alpha");
        assert_eq!(attrs[0].r#type, AttributeType::Floats as i32);
        assert_eq!(attrs[0].floats, vec![0.5]);
        assert_eq!(attrs[1].name, "zeta");
        assert_eq!(attrs[1].r#type, AttributeType::Int as i32);
    }

    #[test]
    fn encoding_is_deterministic_and_decodable() {
        let converter = OnnxConverter;
        let first = converter.convert(&sample_model()).unwrap();
        let second = converter.convert(&sample_model()).unwrap();
        assert_eq!(first.content_type, "application/onnx");
        assert_eq!(first.data, second.data);

        let decoded = ModelProto::decode(first.data.as_slice()).unwrap();
        assert_eq!(decoded, model_to_proto(&sample_model()));
    }

    #[test]
    fn unknown_codes_do_not_map() {
        assert_eq!(
            OnnxConverter::data_type_from_code(ProtoDataType::Int64 as i32),
            Some(DataType::Int64)
        );
        assert_eq!(OnnxConverter::data_type_from_code(ProtoDataType::Bool as i32), None);
        assert_eq!(OnnxConverter::data_type_from_code(999), None);
    }
}

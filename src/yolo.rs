//! The YOLOv8n stand-in model.
//!
//! The graph only reshapes `images` into `output0`; it exists so tools that
//! look for YOLOv8's tensor names and shapes have something to load. The
//! element counts of input (1x3x640x640) and output (1x84x8400) differ, so a
//! runtime will refuse to execute it.

use tracing::debug;

use crate::graph::{
    AttributeValue, ConstantTensor, DataType, Dim, GraphInfo, ModelInfo, Node, TensorDescriptor,
};

pub const GRAPH_NAME: &str = "test_yolo_model";
pub const INPUT_NAME: &str = "images";
pub const OUTPUT_NAME: &str = "output0";
pub const FLATTENED_NAME: &str = "reshaped";
pub const SHAPE_CONSTANT_NAME: &str = "output_shape";
pub const RESHAPE_OP: &str = "Reshape";

pub const INPUT_SHAPE: [i64; 4] = [1, 3, 640, 640];
pub const OUTPUT_SHAPE: [i64; 3] = [1, 84, 8400];
pub const FLATTEN_SHAPE: [i64; 2] = [1, -1];
pub const OPSET_VERSION: i64 = 11;

pub const DEFAULT_OUTPUT_FILE: &str = "yolov8n_test.onnx";
pub const PRETRAINED_MODEL_URL: &str =
    "https://github.com/ultralytics/assets/releases/download/v0.0.0/yolov8n.onnx";

/// Name of the symbolic leading dimension used with `dynamic_batch`.
pub const BATCH_DIM_PARAM: &str = "batch";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubOptions {
    /// Declare the leading dimension of input and output as symbolic.
    pub dynamic_batch: bool,
}

fn shape(dims: &[i64], options: &StubOptions) -> Vec<Dim> {
    dims.iter()
        .enumerate()
        .map(|(axis, &size)| {
            if axis == 0 && options.dynamic_batch {
                Dim::Symbolic(BATCH_DIM_PARAM.to_string())
            } else {
                Dim::Fixed(size)
            }
        })
        .collect()
}

pub fn build_test_yolo_model(options: &StubOptions) -> ModelInfo {
    let input = TensorDescriptor::new(
        INPUT_NAME,
        DataType::Float32,
        shape(&INPUT_SHAPE, options),
    );
    let output = TensorDescriptor::new(
        OUTPUT_NAME,
        DataType::Float32,
        shape(&OUTPUT_SHAPE, options),
    );

    let output_shape = ConstantTensor::int64(
        SHAPE_CONSTANT_NAME,
        vec![OUTPUT_SHAPE.len() as i64],
        OUTPUT_SHAPE.to_vec(),
    );

    let flatten = Node::new(RESHAPE_OP, [INPUT_NAME], [FLATTENED_NAME])
        .with_attribute("shape", AttributeValue::Ints(FLATTEN_SHAPE.to_vec()));
    let final_reshape = Node::new(
        RESHAPE_OP,
        [FLATTENED_NAME, SHAPE_CONSTANT_NAME],
        [OUTPUT_NAME],
    );
    debug!(
        input = INPUT_NAME,
        output = OUTPUT_NAME,
        dynamic_batch = options.dynamic_batch,
        "assembled stub graph"
    );

    let graph = GraphInfo::new(
        vec![flatten, final_reshape],
        GRAPH_NAME,
        vec![input],
        vec![output],
        vec![output_shape],
    );
    ModelInfo::new(graph, OPSET_VERSION)
}

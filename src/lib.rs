pub mod builder;
pub mod converters;
pub mod error;
pub mod graph;
pub mod graphviz;
#[cfg(feature = "onnx")]
pub mod loader;
pub mod logging;
#[cfg(feature = "onnx")]
pub mod protos;
pub mod validator;
pub mod yolo;

pub use builder::{BuildOptions, BuildOutcome, build_and_save};
pub use converters::{ConvertedGraph, ConverterRegistry, GraphConverter};
pub use error::GraphError;
pub use graph::{
    AttributeValue, ConstantTensor, ConstantValues, DataType, Dim, GraphInfo, ModelInfo, Node,
    NodeAttribute, TensorDescriptor,
};
pub use graphviz::graph_to_dot;
#[cfg(feature = "onnx")]
pub use loader::load_model_from_path;
pub use validator::{GraphValidator, ValidationArtifacts};
pub use yolo::{StubOptions, build_test_yolo_model};

use std::path::PathBuf;

use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("model file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model could not be written to {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("status output could not be written: {source}")]
    Console {
        #[source]
        source: std::io::Error,
    },
    #[error("model file {path} is not a valid ONNX protobuf: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("model could not be rendered as JSON: {source}")]
    Json {
        #[from]
        source: JsonError,
    },
    #[error("graph must declare nodes and outputs")]
    EmptyGraph,
    #[error("graph {role} is missing a name")]
    MissingValueName { role: &'static str },
    #[error("value name `{name}` is declared more than once")]
    DuplicateValueName { name: String },
    #[error("initializer `{name}` value count mismatch (dims imply {expected}, got {actual})")]
    ConstantLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("node `{node}` has no operation kind")]
    MissingOpType { node: String },
    #[error("node `{node}` consumes `{value}` before it is produced")]
    ValueNotReady { node: String, value: String },
    #[error("node `{node}` attempts to produce `{value}` which already exists")]
    ValueProducedTwice { node: String, value: String },
    #[error("graph output `{value}` is never produced by any node")]
    OutputNotProduced { value: String },
    #[error("value `{value}` never feeds any node")]
    ValueNeverUsed { value: String },
    #[error("graph converter `{requested}` is not available. Supported: {available:?}")]
    UnknownConverter {
        requested: String,
        available: Vec<&'static str>,
    },
    #[error("graph conversion failed for {format}: {reason}")]
    ConversionFailed { format: String, reason: String },
    #[error("model does not contain a graph")]
    MissingGraph,
    #[error("tensor element type code {code} is not supported")]
    UnsupportedDataType { code: i32 },
}

impl GraphError {
    #[cfg(feature = "onnx")]
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::ExportIo {
            path: path.into(),
            source,
        }
    }

    /// True when the failure means no serializer is registered for the
    /// requested format, as opposed to a failure inside one.
    pub fn is_missing_converter(&self) -> bool {
        matches!(self, GraphError::UnknownConverter { .. })
    }
}

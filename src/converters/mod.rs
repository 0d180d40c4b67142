use std::collections::HashMap;

use crate::error::GraphError;
use crate::graph::ModelInfo;

#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::{OnnxConverter, model_to_proto};

#[derive(Debug, Clone)]
pub struct ConvertedGraph {
    pub format: &'static str,
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

pub trait GraphConverter {
    fn format(&self) -> &'static str;
    fn convert(&self, model: &ModelInfo) -> Result<ConvertedGraph, GraphError>;
}

/// Serializers available to this build, keyed by lowercase format name.
///
/// A format that is absent here is treated by the builder as a missing
/// dependency rather than as a hard failure.
pub struct ConverterRegistry {
    converters: HashMap<&'static str, Box<dyn GraphConverter + Send + Sync>>,
}

impl ConverterRegistry {
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    #[allow(unused_mut)]
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        #[cfg(feature = "onnx")]
        registry.register(Box::new(OnnxConverter));
        registry
    }

    pub fn register(&mut self, converter: Box<dyn GraphConverter + Send + Sync>) {
        self.converters.insert(converter.format(), converter);
    }

    pub fn available_formats(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.converters.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn convert(&self, format: &str, model: &ModelInfo) -> Result<ConvertedGraph, GraphError> {
        let key = format.to_ascii_lowercase();
        let Some(converter) = self.converters.get(key.as_str()) else {
            return Err(GraphError::UnknownConverter {
                requested: format.to_string(),
                available: self.available_formats(),
            });
        };
        converter.convert(model)
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

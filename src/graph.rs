use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float32,
    Float16,
    Int64,
    Int32,
    Uint32,
    Uint64,
    Int8,
    Uint8,
}

impl DataType {
    pub fn bytes_per_element(self) -> usize {
        match self {
            DataType::Float16 => 2,
            DataType::Float32 => 4,
            DataType::Int32 => 4,
            DataType::Uint32 => 4,
            DataType::Int64 => 8,
            DataType::Uint64 => 8,
            DataType::Int8 => 1,
            DataType::Uint8 => 1,
        }
    }
}

/// A single tensor dimension. Symbolic dimensions carry a parameter name
/// (e.g. `batch`) instead of a size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dim {
    Fixed(i64),
    Symbolic(String),
}

impl Dim {
    pub fn fixed(&self) -> Option<i64> {
        match self {
            Dim::Fixed(size) => Some(*size),
            Dim::Symbolic(_) => None,
        }
    }
}

impl From<i64> for Dim {
    fn from(size: i64) -> Self {
        Dim::Fixed(size)
    }
}

impl std::fmt::Display for Dim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dim::Fixed(size) => write!(f, "{size}"),
            Dim::Symbolic(param) => f.write_str(param),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDescriptor {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub shape: Vec<Dim>,
}

impl TensorDescriptor {
    pub fn new(
        name: impl Into<String>,
        data_type: DataType,
        shape: impl IntoIterator<Item = Dim>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            shape: shape.into_iter().collect(),
        }
    }

    /// Number of elements, or `None` when a dimension is symbolic or the
    /// product overflows.
    pub fn element_count(&self) -> Option<u64> {
        let mut count = 1u64;
        for dim in &self.shape {
            let size = u64::try_from(dim.fixed()?).ok()?;
            count = count.checked_mul(size)?;
        }
        Some(count)
    }

    pub fn byte_length(&self) -> Option<u64> {
        self.element_count()?
            .checked_mul(self.data_type.bytes_per_element() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ConstantValues {
    Int64(Vec<i64>),
    Float32(Vec<f32>),
}

impl ConstantValues {
    pub fn len(&self) -> usize {
        match self {
            ConstantValues::Int64(values) => values.len(),
            ConstantValues::Float32(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Constant tensor embedded in the graph as an initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantTensor {
    pub name: String,
    pub dims: Vec<i64>,
    pub values: ConstantValues,
}

impl ConstantTensor {
    pub fn int64(name: impl Into<String>, dims: Vec<i64>, values: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            dims,
            values: ConstantValues::Int64(values),
        }
    }

    pub fn float32(name: impl Into<String>, dims: Vec<i64>, values: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            dims,
            values: ConstantValues::Float32(values),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self.values {
            ConstantValues::Int64(_) => DataType::Int64,
            ConstantValues::Float32(_) => DataType::Float32,
        }
    }

    /// Element count implied by `dims`; a rank-0 constant holds one value.
    pub fn declared_len(&self) -> Option<usize> {
        let mut count = 1usize;
        for dim in &self.dims {
            count = count.checked_mul(usize::try_from(*dim).ok()?)?;
        }
        Some(count)
    }

    pub fn as_descriptor(&self) -> TensorDescriptor {
        TensorDescriptor::new(
            self.name.clone(),
            self.data_type(),
            self.dims.iter().copied().map(Dim::Fixed),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Int(i64),
    Ints(Vec<i64>),
    Float(f32),
    Floats(Vec<f32>),
    String(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttribute {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub name: Option<String>,
    pub op_type: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<NodeAttribute>,
}

impl Node {
    pub fn new<I, O>(op_type: impl Into<String>, inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            name: None,
            op_type: op_type.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
            attributes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.push(NodeAttribute {
            name: name.into(),
            value,
        });
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Label used in diagnostics: the node name when set, otherwise the
    /// operation kind with its position in the graph.
    pub fn display_name(&self, index: usize) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{}#{}", self.op_type, index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub inputs: Vec<TensorDescriptor>,
    #[serde(default)]
    pub outputs: Vec<TensorDescriptor>,
    #[serde(default)]
    pub initializers: Vec<ConstantTensor>,
}

impl GraphInfo {
    pub fn new(
        nodes: Vec<Node>,
        name: impl Into<String>,
        inputs: Vec<TensorDescriptor>,
        outputs: Vec<TensorDescriptor>,
        initializers: Vec<ConstantTensor>,
    ) -> Self {
        Self {
            name: name.into(),
            nodes,
            inputs,
            outputs,
            initializers,
        }
    }

    pub fn input(&self, name: &str) -> Option<&TensorDescriptor> {
        self.inputs.iter().find(|desc| desc.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&TensorDescriptor> {
        self.outputs.iter().find(|desc| desc.name == name)
    }

    pub fn initializer(&self, name: &str) -> Option<&ConstantTensor> {
        self.initializers.iter().find(|init| init.name == name)
    }
}

/// Model container: exactly one graph plus the operator-set it targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub graph: GraphInfo,
    pub opset_version: i64,
    pub ir_version: i64,
    #[serde(default)]
    pub producer_name: String,
    #[serde(default)]
    pub producer_version: String,
}

impl ModelInfo {
    /// IR version 6 is the revision that introduced opset 11.
    pub const DEFAULT_IR_VERSION: i64 = 6;

    pub fn new(graph: GraphInfo, opset_version: i64) -> Self {
        Self {
            graph,
            opset_version,
            ir_version: Self::DEFAULT_IR_VERSION,
            producer_name: env!("CARGO_PKG_NAME").to_string(),
            producer_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

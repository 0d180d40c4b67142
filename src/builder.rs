use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::converters::ConverterRegistry;
use crate::error::GraphError;
use crate::validator::GraphValidator;
use crate::yolo::{self, StubOptions};

pub const ONNX_FORMAT: &str = "onnx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub output_path: PathBuf,
    pub stub: StubOptions,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(yolo::DEFAULT_OUTPUT_FILE),
            stub: StubOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Written { path: PathBuf, bytes: usize },
    /// No ONNX serializer is compiled in; guidance was printed and nothing
    /// was written.
    SerializerUnavailable,
}

/// Build the stub model, serialize it and write it to `options.output_path`,
/// replacing any existing file.
///
/// Status lines go to `out`. A registry without an ONNX converter is the only
/// failure handled here; everything else is returned to the caller.
pub fn build_and_save(
    options: &BuildOptions,
    registry: &ConverterRegistry,
    out: &mut impl Write,
) -> Result<BuildOutcome, GraphError> {
    let model = yolo::build_test_yolo_model(&options.stub);
    let artifacts = GraphValidator::new(&model.graph).validate()?;
    if let (Some(input), Some(output)) = (
        artifacts.input_element_count,
        artifacts.output_element_count,
    ) && input != output
    {
        // The preset is a placeholder and never runs, so this is expected.
        debug!(
            input_elements = input,
            output_elements = output,
            "reshape chain changes element count; the model is not executable"
        );
    }

    let converted = match registry.convert(ONNX_FORMAT, &model) {
        Ok(converted) => converted,
        Err(err) if err.is_missing_converter() => {
            info!(error = %err, "ONNX serializer unavailable");
            print_missing_serializer_guidance(out)
                .map_err(|source| GraphError::Console { source })?;
            return Ok(BuildOutcome::SerializerUnavailable);
        }
        Err(err) => return Err(err),
    };

    let path = &options.output_path;
    std::fs::write(path, &converted.data).map_err(|err| GraphError::export(path.clone(), err))?;
    info!(
        path = %path.display(),
        bytes = converted.data.len(),
        content_type = converted.content_type,
        "wrote model"
    );
    writeln!(out, "Created test model: {}", path.display())
        .map_err(|source| GraphError::Console { source })?;

    Ok(BuildOutcome::Written {
        path: path.clone(),
        bytes: converted.data.len(),
    })
}

pub fn print_missing_serializer_guidance(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(
        out,
        "ONNX support is required: rebuild with `cargo install {} --features onnx`",
        env!("CARGO_PKG_NAME")
    )?;
    writeln!(
        out,
        "Or download a real YOLOv8 model: wget {}",
        yolo::PRETRAINED_MODEL_URL
    )
}

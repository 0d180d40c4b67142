use std::path::PathBuf;

use clap::Parser;
use yolo_stub_onnx::{
    BuildOptions, ConverterRegistry, GraphError, StubOptions, build_and_save,
    build_test_yolo_model, graph_to_dot, logging, yolo,
};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Write a placeholder ONNX model with YOLOv8n input/output tensors",
    long_about = None
)]
struct Cli {
    /// Where to write the model; an existing file is replaced.
    #[arg(long, default_value = yolo::DEFAULT_OUTPUT_FILE)]
    output: PathBuf,
    /// Declare the batch dimension of `images` and `output0` as symbolic.
    #[arg(long)]
    dynamic_batch: bool,
    /// Optional path to write a Graphviz DOT export of the graph.
    #[arg(long)]
    export_dot: Option<PathBuf>,
    /// Print the structure of an existing ONNX model instead of building one.
    #[arg(long, value_name = "MODEL")]
    inspect: Option<PathBuf>,
    /// With --inspect, print the model as JSON.
    #[arg(long, requires = "inspect")]
    json: bool,
    /// Log filter (overridden by YOLO_STUB_LOG).
    #[arg(long, default_value = logging::DEFAULT_FILTER)]
    log: String,
}

fn run() -> Result<(), GraphError> {
    let cli = Cli::parse();
    logging::init(&cli.log);

    if let Some(path) = &cli.inspect {
        return inspect(path, cli.json);
    }

    let options = BuildOptions {
        output_path: cli.output,
        stub: StubOptions {
            dynamic_batch: cli.dynamic_batch,
        },
    };

    if let Some(dot_path) = cli.export_dot {
        let dot = graph_to_dot(&build_test_yolo_model(&options.stub).graph);
        std::fs::write(&dot_path, dot).map_err(|err| GraphError::export(dot_path.clone(), err))?;
        println!("Exported Graphviz DOT to `{}`.", dot_path.display());
    }

    build_and_save(
        &options,
        &ConverterRegistry::with_defaults(),
        &mut std::io::stdout(),
    )?;
    Ok(())
}

#[cfg(feature = "onnx")]
fn inspect(path: &std::path::Path, json: bool) -> Result<(), GraphError> {
    let model = yolo_stub_onnx::load_model_from_path(path)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
        return Ok(());
    }

    let graph = &model.graph;
    println!(
        "Model `{}` (opset {}, IR {}) with {} nodes and {} initializers.",
        graph.name,
        model.opset_version,
        model.ir_version,
        graph.nodes.len(),
        graph.initializers.len()
    );
    println!("Inputs:");
    for desc in &graph.inputs {
        println!(
            "  - {}: {:?} [{}]",
            desc.name,
            desc.data_type,
            format_dims(&desc.shape)
        );
    }
    println!("Outputs:");
    for desc in &graph.outputs {
        println!(
            "  - {}: {:?} [{}]",
            desc.name,
            desc.data_type,
            format_dims(&desc.shape)
        );
    }
    println!("Nodes:");
    for (idx, node) in graph.nodes.iter().enumerate() {
        println!(
            "  - {}: {} -> {}",
            node.display_name(idx),
            node.inputs.join(", "),
            node.outputs.join(", ")
        );
    }
    Ok(())
}

#[cfg(feature = "onnx")]
fn format_dims(shape: &[yolo_stub_onnx::Dim]) -> String {
    shape
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(not(feature = "onnx"))]
fn inspect(_path: &std::path::Path, _json: bool) -> Result<(), GraphError> {
    yolo_stub_onnx::builder::print_missing_serializer_guidance(&mut std::io::stdout())
        .map_err(|source| GraphError::Console { source })
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

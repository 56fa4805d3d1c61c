//! P-ISA functional modeler CLI
//!
//! Loads a P-ISA instruction stream, optionally a JSON data file with the
//! execution context and expected results, executes the program on the
//! functional model, validates outputs, and can predict cycle counts under
//! a named hardware model.

use anyhow::{bail, Context, Result};
use clap::Parser;
use pisa_analysis::{
    rename_unique_intermediates, Graph, HardwareModel, NodeKind, PerformanceModeler,
    ScheduleConfig,
};
use pisa_runtime::{ProgramData, ProgramRuntime};
use pisa_spec::Instruction;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pisa-modeler", version, about)]
struct Args {
    /// File containing a list of P-ISA instructions in CSV format
    p_isa_op: PathBuf,

    /// JSON data file with the execution context and expected results
    #[arg(long, short = 'd', alias = "json_data")]
    data: Option<PathBuf>,

    /// Memory dump to load before executing any instructions
    #[arg(long, alias = "imem")]
    input_memory_file: Option<PathBuf>,

    /// Write a memory dump of all device memory after execution
    #[arg(long, alias = "omem")]
    output_memory_file: Option<PathBuf>,

    /// Write program outputs (graph sink registers) as a memory dump
    #[arg(long)]
    program_outputs_file: Option<PathBuf>,

    /// Hardware model for performance analysis
    #[arg(long, default_value = "example")]
    hardware_model: String,

    /// Run the cycle-count performance analysis
    #[arg(long, short = 'p')]
    perf: bool,

    /// Execute layer-by-layer instead of in input order
    #[arg(long)]
    layered: bool,

    /// Rewrite reusable intermediate registers to unique names before
    /// analysis
    #[arg(long)]
    rename_intermediates: bool,

    /// Skip functional execution of the instruction stream
    #[arg(long)]
    no_execute: bool,

    /// Skip validation of execution results against the data file
    #[arg(long)]
    no_validate: bool,

    /// Validate intermediate results as well as outputs
    #[arg(long)]
    validate_intermediates: bool,

    /// Report every compared value instead of one line per output
    #[arg(long, short = 'v')]
    verbose_validation: bool,

    /// Capture and dump an instruction-level execution trace
    #[arg(long)]
    trace: bool,

    /// Use plain modular arithmetic instead of the Montgomery reduction
    #[arg(long)]
    plain_arithmetic: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run(Args::parse()) {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut instructions = pisa_assembler::parse_file(&args.p_isa_op)
        .with_context(|| format!("failed to parse {}", args.p_isa_op.display()))?;
    if instructions.is_empty() {
        bail!("no instructions provided");
    }
    tracing::info!(count = instructions.len(), "loaded instruction stream");

    if args.rename_intermediates {
        let groups = rename_unique_intermediates(&mut instructions)?;
        tracing::info!(groups, "renamed intermediate register groups");
    }

    let data = match &args.data {
        Some(path) => Some(
            ProgramData::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
        ),
        None => None,
    };

    if args.no_execute {
        if args.perf {
            run_performance_analysis(&args, &instructions)?;
        }
        return Ok(());
    }

    let mut runtime = ProgramRuntime::new();
    runtime.set_debug_mode(args.trace);
    runtime
        .model_mut()
        .set_montgomery_enabled(!args.plain_arithmetic);

    // Context: the data file when present, otherwise a synthesized chain
    // and zero twiddles sized from the stream.
    match &data {
        Some(data) => runtime.load_data(data)?,
        None => runtime.load_data(&ProgramData::synthesized(&instructions))?,
    }

    if let Some(path) = &args.input_memory_file {
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        runtime.model_mut().read_memory(BufReader::new(file))?;
    }

    let graph = Graph::from_instructions(&instructions);

    let started = std::time::Instant::now();
    if args.layered {
        let layers = instruction_layers(&graph);
        runtime.execute_layers(&layers)?;
    } else {
        runtime.execute_program(&instructions)?;
    }
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "execution finished");

    if let Some(path) = &args.output_memory_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        runtime.model().dump_memory(&mut BufWriter::new(file))?;
    }

    if let Some(path) = &args.program_outputs_file {
        let outputs: Vec<String> = graph
            .output_nodes()
            .into_iter()
            .filter_map(|id| graph.node(id).ok())
            .map(|node| node.label.clone())
            .collect();
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        runtime
            .model_mut()
            .dump_memory_addresses(&mut BufWriter::new(file), &outputs)?;
    }

    let mut success = true;
    match &data {
        Some(data) if !args.no_validate => {
            let report = runtime.validate(
                data,
                args.verbose_validation,
                args.validate_intermediates,
            )?;
            success = report.success();
            tracing::info!(
                outputs = report.entries.len(),
                success,
                "validation finished"
            );
        }
        _ => tracing::info!("validation: none"),
    }

    if args.perf {
        run_performance_analysis(&args, &instructions)?;
    }

    if !success {
        bail!("validation failed");
    }
    Ok(())
}

fn run_performance_analysis(args: &Args, instructions: &[Instruction]) -> Result<()> {
    let model = HardwareModel::by_name(&args.hardware_model).with_context(|| {
        format!(
            "unknown hardware model {:?} (available: {})",
            args.hardware_model,
            HardwareModel::names().join(", ")
        )
    })?;
    let modeler = PerformanceModeler::new(instructions.to_vec());
    let report = modeler.generate_report(&ScheduleConfig::default(), &model)?;
    println!("Total_Instruction_count: {}", report.instruction_count);
    for (opcode, count) in &report.instance_counts {
        println!("op_{opcode}_Instances: {count}");
    }
    println!("{report}");
    Ok(())
}

/// Operation layers for layer-mode execution: each combined layer's
/// operation nodes, with their instructions cloned out of the graph.
fn instruction_layers(graph: &Graph) -> Vec<Vec<Instruction>> {
    graph
        .input_layers()
        .into_iter()
        .map(|layer| {
            layer
                .into_iter()
                .filter(|&id| {
                    graph
                        .node(id)
                        .map(|n| n.kind == NodeKind::Operation)
                        .unwrap_or(false)
                })
                .filter_map(|id| graph.instruction(id).cloned())
                .collect::<Vec<Instruction>>()
        })
        .filter(|layer: &Vec<Instruction>| !layer.is_empty())
        .collect()
}

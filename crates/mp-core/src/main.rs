//! monoplate - single-plate converter for slicer project bundles
//!
//! The main entry point, handling:
//! - Single-file conversion (`monoplate convert`)
//! - Batch conversion mirroring a directory tree (`monoplate batch`)

use clap::{Args, Parser, Subcommand, ValueEnum};
use mp_core::batch::{run_batch, BatchOptions, BatchReport};
use mp_core::convert::convert_file;
use mp_core::exit_codes::ExitCode;
use mp_core::logging::init_logging;
use std::path::PathBuf;

/// Convert multi-plate .gcode.3mf project bundles into single-plate bundles
#[derive(Parser)]
#[command(name = "monoplate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one bundle to a single-plate bundle
    Convert(ConvertArgs),

    /// Convert every bundle under a directory, mirroring its structure
    Batch(BatchArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input .gcode.3mf file
    input: PathBuf,

    /// Output directory (defaults to the input's directory)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Directory containing .gcode.3mf files
    input_dir: PathBuf,

    /// Base output directory
    #[arg(short = 'o', long = "output-dir")]
    output_dir: PathBuf,

    /// Recursively scan the input directory
    #[arg(long)]
    recursive: bool,

    /// Print planned actions without converting
    #[arg(long)]
    dry_run: bool,

    /// Summary format on stdout
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: SummaryFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SummaryFormat {
    Text,
    Json,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.no_color);

    let exit_code = match cli.command {
        Commands::Convert(args) => run_convert(&args),
        Commands::Batch(args) => run_batch_command(&args),
        Commands::Version => {
            println!("monoplate {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_convert(args: &ConvertArgs) -> ExitCode {
    if !args.input.is_file() {
        eprintln!("error: input not found: {}", args.input.display());
        return ExitCode::ArgsError;
    }

    match convert_file(&args.input, args.output_dir.as_deref()) {
        Ok(conversion) => {
            println!("{}", conversion.output_path.display());
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_batch_command(args: &BatchArgs) -> ExitCode {
    if !args.input_dir.is_dir() {
        eprintln!("error: input directory not found: {}", args.input_dir.display());
        return ExitCode::ArgsError;
    }

    let opts = BatchOptions {
        recursive: args.recursive,
        dry_run: args.dry_run,
    };

    let report = match run_batch(&args.input_dir, &args.output_dir, opts) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    match args.format {
        SummaryFormat::Text => print_text_summary(&report),
        SummaryFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize report: {e}");
                return ExitCode::InternalError;
            }
        },
    }

    if report.dry_run || report.all_succeeded() {
        ExitCode::Clean
    } else {
        ExitCode::PartialFail
    }
}

fn print_text_summary(report: &BatchReport) {
    if report.discovered == 0 {
        println!("No .gcode.3mf files found.");
        return;
    }

    if report.dry_run {
        for file in &report.files {
            println!("[dry-run] {}", file.input.display());
        }
        return;
    }

    for file in &report.files {
        match (&file.output, &file.error) {
            (Some(output), _) => println!("{} -> {}", file.input.display(), output.display()),
            (None, Some(error)) => println!("{} -> FAILED: {error}", file.input.display()),
            (None, None) => {}
        }
    }

    println!();
    println!("Batch complete.");
    println!("  Success: {}", report.converted);
    println!("  Failed : {}", report.failed);
}

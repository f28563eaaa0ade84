mod commands;
mod output;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tabell",
    version,
    about = "Extract tables from PDF documents into .xlsx spreadsheets"
)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a PDF (or `-` for stdin) into a spreadsheet, one sheet per table
    Convert {
        /// Path to the PDF file, or `-` to read it from stdin
        input_file: PathBuf,

        /// Where to write the spreadsheet (default: <input stem>.xlsx)
        #[arg(short = 'O', long = "out", value_name = "FILE")]
        out: Option<PathBuf>,

        /// JSON configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Summary format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,

        /// Never run OCR, even on scanned documents
        #[arg(long)]
        no_ocr: bool,

        /// Refuse inputs larger than this many megabytes
        #[arg(long, value_name = "MB", default_value_t = 12)]
        max_mb: u64,
    },
    /// Show page count, text presence and the extraction chain for a PDF
    Inspect {
        /// Path to the PDF file
        input_file: PathBuf,

        /// JSON configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Show or check configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the default configuration as JSON
    Show,
    /// Validate a configuration file
    Validate {
        /// Path to JSON configuration file
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (result, converting) = match cli.command {
        Commands::Convert {
            input_file,
            out,
            config,
            output,
            no_ocr,
            max_mb,
        } => (
            commands::convert::run(input_file, out, config, &output, no_ocr, max_mb),
            true,
        ),
        Commands::Inspect {
            input_file,
            config,
            output,
        } => (commands::inspect::run(&input_file, config, &output), false),
        Commands::Config { action } => (
            match action {
                ConfigAction::Show => commands::config::show(),
                ConfigAction::Validate { file } => commands::config::validate(&file),
            },
            false,
        ),
    };

    if let Err(e) = result {
        if e.is_no_tables() {
            eprintln!("No tables found.\n");
            eprintln!("Tips:");
            eprintln!("- Try a PDF with clearer table borders or structured columns.");
            eprintln!("- For scans: ensure a readable scan (300+ DPI).");
            std::process::exit(2);
        }
        if converting {
            eprintln!("Conversion failed:\n{e}\n");
            eprintln!("Tips:");
            eprintln!("- Try a different PDF with visible table lines.");
            eprintln!("- If it is a scanned document: ensure it is readable.");
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

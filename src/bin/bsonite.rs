use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use bsonite::cli::{self, Command, OutputMode};
use bsonite::config::Config;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "bsonite", version, about = "Inspect, convert and query BSON documents", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). Falls back to BSONITE_CONFIG, then ./bsonite.toml.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Print relaxed extended JSON instead of shell syntax")]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Print every document of a binary dump file")]
    Dump {
        #[arg(help = "File of concatenated binary documents")]
        file: PathBuf,
    },
    #[command(about = "Encode a JSON document or array into concatenated binary documents")]
    Encode {
        #[arg(help = "Input JSON file")]
        input: PathBuf,
        #[arg(help = "Output binary file")]
        output: PathBuf,
    },
    #[command(about = "Find documents in a dump or JSON file")]
    Find {
        #[arg(help = "Binary dump, or .json file")]
        file: PathBuf,
        #[arg(long, help = "Filter (e.g., {age: {$gte: 21}})")]
        filter: Option<String>,
        #[arg(long, help = "Sort spec comma-separated; -age,name")]
        sort: Option<String>,
        #[arg(long, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "Skip N results")]
        skip: Option<usize>,
        #[arg(long, help = "Projection fields comma-separated (e.g., name,age or -secret)")]
        project: Option<String>,
    },
    #[command(about = "Run an aggregation pipeline over a dump or JSON file")]
    Aggregate {
        #[arg(help = "Source collection file; the collection is named after its stem")]
        file: PathBuf,
        #[arg(help = "Pipeline array, or a file holding one")]
        pipeline: String,
        #[arg(long = "with", value_parser = cli::parse_with, help = "Extra collection for $lookup as name=path; repeatable")]
        with: Vec<(String, PathBuf)>,
    },
    #[command(about = "Show version, compiled features and effective limits")]
    Info,
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::Dump { file } => Self::Dump { file },
            Commands::Encode { input, output } => Self::Encode { input, output },
            Commands::Find { file, filter, sort, limit, skip, project } => {
                Self::Find { file, filter, sort, limit, skip, project }
            }
            Commands::Aggregate { file, pipeline, with } => Self::Aggregate { file, pipeline, with },
            Commands::Info => Self::Info,
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let cfg = match Config::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = bsonite::logger::init(&cfg) {
        eprintln!("warning: {e}");
    }
    let mode = if args.json { OutputMode::Json } else { OutputMode::Shell };
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = cli::run_with_format(&args.command.into(), &cfg, &mut out, mode);
    let _ = out.flush();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("command failed: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod build;
mod inspect;

#[derive(Parser, Debug)]
#[command(name = "mkinitrd", version, about = "Generates a flat initrd image")]
struct Args {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors, hide progress
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a directory, or a list of files, into an initrd image
    Build {
        #[arg(short, long, env = "MKINITRD_OUTPUT", default_value = "initrd.img")]
        output: PathBuf,
        /// Directory whose regular files are packed, sorted by name
        #[arg(short, long, conflicts_with = "files", required_unless_present = "files")]
        input: Option<PathBuf>,
        /// Files to pack, in the given order
        files: Vec<PathBuf>,
    },
    /// List all files inside an image
    Ls {
        #[arg(short, long)]
        archive: PathBuf,
    },
    /// Write one file of an image to stdout
    Cat {
        #[arg(short, long)]
        archive: PathBuf,
        #[arg(short, long)]
        file: String,
    },
    /// Unpack every file of an image into a directory
    Extract {
        #[arg(short, long)]
        archive: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate an image and print its header
    Inspect {
        #[arg(short, long)]
        archive: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match args.cmd {
        Commands::Build {
            output,
            input,
            files,
        } => {
            let inputs = build::collect_inputs(input.as_deref(), &files)?;
            build::build_archive(&inputs, &output, !args.quiet)?;
            Ok(())
        }
        Commands::Ls { archive } => inspect::list_archive(&archive),
        Commands::Cat { archive, file } => inspect::cat_file(&archive, &file),
        Commands::Extract { archive, output } => inspect::extract_archive(&archive, &output),
        Commands::Inspect { archive } => inspect::inspect_archive(&archive),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

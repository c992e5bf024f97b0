use clap::{Parser, Subcommand};
use engine_setup::commands::{check, extract, fetch, generate, setup, version};
use engine_setup::libs::utilities::assets::ArchiveFormat;
use engine_setup::{log_error, logger};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "engine-setup")]
#[command(about = "Fetch and unpack the third-party dependencies of the engine workspace", long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version information
    Version,
    /// Install every missing dependency for this OS
    Setup {
        #[arg(long)]
        config: Option<String>,
        /// Do not ask before downloading
        #[arg(short, long)]
        yes: bool,
    },
    /// Report missing dependencies and toolchain requirements
    Check {
        #[arg(long)]
        config: Option<String>,
    },
    /// Download a file, trying each source in order
    Fetch {
        /// Where to save the file
        destination: PathBuf,
        /// One or more source URLs, tried in order
        #[arg(required = true)]
        sources: Vec<String>,
        /// Expected SHA-256 of the file, in hex
        #[arg(long)]
        sha256: Option<String>,
    },
    /// Extract an archive next to itself or into a directory
    Extract {
        archive: PathBuf,
        /// Target directory (defaults to the archive's directory)
        #[arg(long)]
        into: Option<PathBuf>,
        /// zip, tar, tar.gz, tar.bz2 or tar.xz (defaults to the file name)
        #[arg(long)]
        format: Option<ArchiveFormat>,
        /// Keep the archive after extracting
        #[arg(long)]
        keep: bool,
    },
    /// Generate a default engine-setup.yaml
    Generate {
        #[arg(long)]
        config: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let result = match cli.command {
        Commands::Version => version::run(),
        Commands::Setup { config, yes } => setup::run(config, yes),
        Commands::Check { config } => check::run(config),
        Commands::Fetch {
            destination,
            sources,
            sha256,
        } => fetch::run(destination, sources, sha256),
        Commands::Extract {
            archive,
            into,
            format,
            keep,
        } => extract::run(archive, into, format, keep),
        Commands::Generate { config, force } => generate::run(config, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

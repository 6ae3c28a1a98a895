//! bgmforge CLI - music replacement builds for Persona ports
//!
//! This binary extracts the stock soundtrack from wave banks and turns
//! replacement audio into the encoded files a game's music mod expects.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use bgmforge_cli::commands::{self, BuilderOptions};
use bgmforge_cli::logging;

/// bgmforge - Music Replacement Build Tool
#[derive(Parser)]
#[command(name = "bgmforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Encoder settings shared by the commands that encode music
#[derive(Args, Debug)]
struct EncodeArgs {
    /// Target game (p4g, p3f, p4, p3p)
    #[arg(short, long)]
    game: String,

    /// Encode one file at a time
    #[arg(short, long)]
    low: bool,

    /// Cache root (default: ./cached)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Path to the encoder executable
    #[arg(long)]
    encoder: Option<PathBuf>,

    /// Directory holding bundled encoders (default: ./dependencies)
    #[arg(long)]
    dependencies_dir: Option<PathBuf>,
}

impl From<EncodeArgs> for BuilderOptions {
    fn from(args: EncodeArgs) -> Self {
        BuilderOptions {
            game: args.game,
            low: args.low,
            cache_dir: args.cache_dir,
            encoder: args.encoder,
            dependencies_dir: args.dependencies_dir,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a music build from a music data file
    Build {
        #[command(flatten)]
        encode: EncodeArgs,

        /// Path to the music data JSON
        #[arg(short, long)]
        input: String,

        /// Output directory for the build
        #[arg(short, long)]
        output: String,
    },

    /// Encode the enabled songs of a music data file into one flat folder
    Export {
        #[command(flatten)]
        encode: EncodeArgs,

        /// Path to the music data JSON
        #[arg(short, long)]
        input: String,

        /// Output folder
        #[arg(short, long)]
        output: String,
    },

    /// Encode every supported file in a folder into <folder>/encoded
    Batch {
        #[command(flatten)]
        encode: EncodeArgs,

        /// Folder of source audio
        #[arg(short, long)]
        folder: String,
    },

    /// Extract the soundtrack of a wave bank into WAV files
    Extract {
        /// Path to the .xwb wave bank (its .xsb must sit next to it)
        #[arg(short, long)]
        input: String,

        /// Output directory for the extracted files
        #[arg(short, long)]
        output: String,

        /// Extract every entry instead of the music tracks only
        #[arg(long)]
        all: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            encode,
            input,
            output,
        } => commands::build::run(&encode.into(), &input, &output),
        Commands::Export {
            encode,
            input,
            output,
        } => commands::export::run(&encode.into(), &input, &output),
        Commands::Batch { encode, folder } => commands::batch::run(&encode.into(), &folder),
        Commands::Extract { input, output, all } => commands::extract::run(&input, &output, all),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}

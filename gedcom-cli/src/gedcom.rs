use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use gedcom::Gedcom;

mod serve;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// The only text shown to users when a file cannot be parsed; details go to
/// the log.
pub const FAILURE_MESSAGE: &str =
    "Failed to parse GEDCOM file. Please check the format and try again.";

async fn load(path: &str) -> Option<(Gedcom, Vec<gedcom::Error>)> {
    let parsed = match tokio::fs::read_to_string(path).await {
        Ok(text) => Gedcom::parse_with_diagnostics(&text, path),
        Err(io_error) => Err(gedcom::Error::io(path, &io_error)),
    };
    match parsed {
        Ok(loaded) => Some(loaded),
        Err(error) => {
            log::debug!("{}", error);
            eprintln!("{}", FAILURE_MESSAGE);
            None
        }
    }
}

fn json(gedcom: &Gedcom, pretty: bool) -> std::io::Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(gedcom)?
    } else {
        serde_json::to_string(gedcom)?
    };
    println!("{}", text);
    Ok(())
}

fn check(gedcom: &Gedcom, diagnostics: &[gedcom::Error]) {
    for error in diagnostics {
        println!("{}\n", error);
    }
    println!(
        "{} individuals, {} families",
        gedcom.individuals().len(),
        gedcom.families().len()
    );
}

fn tree(gedcom: &Gedcom, root: Option<&str>) -> std::io::Result<()> {
    match gedcom.tree(root) {
        Some(tree) => println!("{}", serde_json::to_string_pretty(&tree)?),
        None => println!("null"),
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "gedcom",
    about = "Parses GEDCOM genealogy files into individuals and families.",
    version = VERSION,
    author = AUTHOR,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct Input {
    /// GEDCOM file to read
    #[arg(short, long, required = true)]
    input: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the resolved individuals and families as JSON
    Json {
        #[command(flatten)]
        source: Input,
        #[arg(short, long)]
        pretty: bool,
    },
    /// Validate the file and print diagnostics and record counts
    Check {
        #[command(flatten)]
        source: Input,
    },
    /// Print the descendant tree of an individual as JSON
    Tree {
        #[command(flatten)]
        source: Input,
        /// Root individual, e.g. @I1@; defaults to the first one without parents
        #[arg(short, long)]
        root: Option<String>,
    },
    /// Serve `POST /api/parse` over HTTP
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:8001")]
        addr: String,
    },
}

async fn run(command: Commands) -> std::io::Result<ExitCode> {
    match command {
        Commands::Json { source, pretty } => {
            let Some((gedcom, _)) = load(&source.input).await else {
                return Ok(ExitCode::FAILURE);
            };
            json(&gedcom, pretty)?;
        }
        Commands::Check { source } => {
            let Some((gedcom, diagnostics)) = load(&source.input).await else {
                return Ok(ExitCode::FAILURE);
            };
            check(&gedcom, &diagnostics);
        }
        Commands::Tree { source, root } => {
            let Some((gedcom, _)) = load(&source.input).await else {
                return Ok(ExitCode::FAILURE);
            };
            tree(&gedcom, root.as_deref())?;
        }
        Commands::Serve { addr } => serve::serve(&addr).await?,
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> std::io::Result<ExitCode> {
    pretty_env_logger::init();
    let args = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args.command))
}

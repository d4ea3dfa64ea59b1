use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

mod commands;

/// hypdl - Download game packages from the launcher manifest
#[derive(Parser)]
#[command(name = "hypdl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show debug logging (HYPDL_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a game build and download its packages
    Download {
        #[command(flatten)]
        selection: commands::SelectionOptions,

        /// Print package information and sizes instead of downloading
        #[arg(short, long)]
        info: bool,

        /// Skip the MD5 check after downloading
        #[arg(long)]
        no_verify: bool,
    },

    /// Check already downloaded packages without downloading
    Verify {
        #[command(flatten)]
        selection: commands::SelectionOptions,
    },

    /// Name the game ids found in the manifest (writes gamelist.json)
    GameList,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "hypdl=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("HYPDL_LOG").unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Download {
            selection,
            info,
            no_verify,
        } => commands::download::run(selection, info, no_verify),
        Commands::Verify { selection } => commands::verify::run(selection),
        Commands::GameList => commands::game_list::run(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "hypdl", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = match e.downcast_ref::<hypdl::Error>() {
            Some(hypdl::Error::BatchCancelled { .. }) => 130,
            _ => 1,
        };
        std::process::exit(code);
    }
}

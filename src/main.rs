use clap::{Args, Parser, Subcommand};
use clusterlog::config::{resolve_config_path, ConfigOverrides, VerbosityFlags};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clusterlog")]
#[command(about = "Receive log records sent over UDP by cluster worker processes", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for log datagrams and write them out (the default)
    Receive(ReceiveArgs),
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Send sample records to a receiver
    Emit(EmitArgs),
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[derive(Args, Default)]
struct ReceiveArgs {
    /// Address and port to listen on, e.g. ":5005" or "127.0.0.1:5005"
    #[arg(long)]
    listen: Option<String>,

    /// File to append records to (console when omitted)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Records to buffer before writing (0 writes each record immediately)
    #[arg(long)]
    batches: Option<usize>,

    #[command(flatten)]
    verbosity: VerbosityArgs,
}

#[derive(Args, Default)]
struct VerbosityArgs {
    /// Trace logging
    #[arg(long)]
    trace: bool,

    /// Verbose logging
    #[arg(short = 'v')]
    verbose: bool,

    /// Quiet logging
    #[arg(short = 'q')]
    quiet: bool,
}

impl From<&VerbosityArgs> for VerbosityFlags {
    fn from(args: &VerbosityArgs) -> Self {
        VerbosityFlags {
            trace: args.trace,
            verbose: args.verbose,
            quiet: args.quiet,
        }
    }
}

#[derive(Args)]
struct EmitArgs {
    /// Where to send records, as host or host:port. Console when omitted.
    #[arg(long)]
    loghost: Option<String>,

    /// Keep sending until interrupted
    #[arg(long)]
    dontstop: bool,

    #[arg(long, default_value_t = 30)]
    count: u64,

    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    #[command(flatten)]
    verbosity: VerbosityArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Diagnostics go to stderr; stdout belongs to the console destination.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clusterlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config.as_deref());

    match cli.command.unwrap_or(Commands::Receive(ReceiveArgs::default())) {
        Commands::Receive(args) => {
            let overrides = ConfigOverrides {
                listen: args.listen,
                out: args.out,
                batches: args.batches,
                verbosity: VerbosityFlags::from(&args.verbosity),
            };
            clusterlog::cli::run::run(config_path, overrides).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { stdout } => clusterlog::cli::config::init(stdout)?,
            ConfigAction::Validate => clusterlog::cli::config::validate(config_path)?,
        },
        Commands::Emit(args) => {
            let threshold = VerbosityFlags::from(&args.verbosity).threshold();
            let count = (!args.dontstop).then_some(args.count);
            clusterlog::cli::emit::emit(
                args.loghost,
                threshold,
                count,
                Duration::from_millis(args.interval_ms),
            )
            .await?;
        }
    }

    Ok(())
}

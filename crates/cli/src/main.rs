mod serve_commands;

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "chatlay", about = "Chatlay: live chat overlays over HTTP long-polling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the overlay server.
    Serve(serve_commands::ServeArgs),
    /// Print the route keys the current config would serve.
    Routes(serve_commands::ConfigArgs),
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_telemetry(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli.log_level, cli.json_logs);

    match cli.command {
        Commands::Serve(args) => {
            info!(version = env!("CARGO_PKG_VERSION"), "chatlay starting");
            serve_commands::handle_serve(args).await
        },
        Commands::Routes(args) => serve_commands::handle_routes(&args),
    }
}

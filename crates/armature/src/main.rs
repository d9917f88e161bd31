mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "armature")]
#[command(
    about = "Azure network resources that never lose each other's updates",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the resolved provider configuration
    Config,
    /// Split an ARM resource ID into its parts
    ParseId {
        /// Resource ID, e.g. /subscriptions/.../virtualNetworks/vnet
        id: String,
    },
    /// Show registration state of the resource providers armature needs
    Providers {
        /// Register the providers that are not registered yet
        #[arg(long)]
        register: bool,
    },
    /// Print resource schemas as JSON
    Schema {
        /// Only this resource type (e.g. azurerm_subnet)
        resource_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_directive = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();

    match cli.command {
        Commands::Config => commands::config::handle(),
        Commands::ParseId { id } => commands::parse_id::handle(&id),
        Commands::Providers { register } => commands::providers::handle(register).await,
        Commands::Schema { resource_type } => commands::schema::handle(resource_type.as_deref()),
    }
}

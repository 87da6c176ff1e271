use std::path::PathBuf;

use anyhow::Context;
use bookstore_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Bookstore service operations
#[derive(Debug, Parser)]
#[command(name = "bookstore", version, about)]
struct Cli {
    /// Configuration directory holding `base.toml` and `<env>.toml`
    #[arg(long, global = true, env = "BOOKSTORE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Deployment environment: local, staging or production
    #[arg(long, global = true, env = "BOOKSTORE_ENV", default_value = "local")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C
    Serve,
    /// Print the merged OpenAPI document as JSON
    Openapi,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };
        Settings::load_from(&config_dir, &self.env)
            .with_context(|| "failed to load bookstore settings")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` feeds the clap `env` fallbacks as well as the settings layers
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let settings = cli.settings()?;

    match cli.command {
        Command::Serve => {
            bookstore_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "bookstore CLI serving");
            bookstore_app::run(settings).await
        }
        Command::Openapi => {
            let registry = bookstore_app::build_registry(&settings);
            let document = bookstore_http::router::openapi_document(&registry);
            let rendered = serde_json::to_string_pretty(&document)
                .context("failed to render OpenAPI document")?;
            println!("{rendered}");
            Ok(())
        }
    }
}

use clap::{Parser, Subcommand};

mod admin;
mod app;
mod config;
mod db;
mod error;
mod recipe;
mod state;
#[cfg(test)]
mod testing;
mod users;

use crate::{config::AppConfig, state::AppState, users::services};

#[derive(Parser)]
#[command(name = "recipe-api")]
#[command(version, about = "Recipe tags and ingredients API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a staff account
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let state = AppState::init(config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let addr = state.config.bind_addr()?;
            app::serve(app::build_app(state), addr).await
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let user = services::create_account(
                state.store.as_ref(),
                state.config.password_min_length,
                services::AccountInput {
                    email: Some(email),
                    password: Some(password),
                    name,
                    is_staff: true,
                },
                false,
            )
            .await
            .map_err(|e| match e {
                error::ApiError::Validation(fields) => {
                    anyhow::anyhow!("invalid superuser: {}", serde_json::to_string(&fields).unwrap_or_default())
                }
                other => anyhow::anyhow!(other),
            })?;
            tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
            Ok(())
        }
    }
}

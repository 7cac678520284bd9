//! custgate CLI - database migrations and session tooling.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! custgate migrate
//!
//! # Sign a session token for manual testing
//! custgate token issue --id @ann --username "Ann Lee" --email ann@shop.net
//!
//! # Decode and check a session token
//! custgate token verify eyJhbGciOi...
//!
//! # Generate a value for JWT_SECRET
//! custgate secret
//! ```
//!
//! Reads the same environment (and `.env`) as the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "custgate")]
#[command(author, version, about = "custgate management tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations against `DATABASE_URL`
    Migrate,
    /// Issue or inspect session tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Print a freshly generated signing secret
    Secret,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Sign a session token with `JWT_SECRET`
    Issue {
        /// Subject id
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,
    },
    /// Verify a session token and print its claims
    Verify {
        /// The encoded token
        token: String,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Token { action } => match action {
            TokenAction::Issue {
                id,
                username,
                email,
            } => {
                let token = commands::token::issue(&id, &username, &email)?;
                println!("{token}");
            }
            TokenAction::Verify { token } => {
                let claims = commands::token::verify(&token)?;
                println!("{claims}");
            }
        },
        Commands::Secret => println!("{}", commands::secret::generate()),
    }
    Ok(())
}

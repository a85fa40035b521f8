//! Shopfront CLI - browse the shop, manage the cart and place orders.
//!
//! # Usage
//!
//! ```bash
//! shopfront signup -u ada -e ada@example.com -p 'correct horse'
//! shopfront login -u ada -p 'correct horse'
//! shopfront products --category Lighting --search lamp
//! shopfront cart add 3
//! shopfront cart show
//! shopfront checkout --name "Ada Lovelace" --email ada@example.com ...
//! shopfront orders
//! ```
//!
//! The session is kept in `SHOPFRONT_SESSION_FILE`, so it survives between
//! invocations. Every command goes through the same route guards as the
//! views it stands in for: cart commands without a session are refused
//! with a redirect to `/login`.
//!
//! Logging follows `RUST_LOG`; set `SHOPFRONT_LOG_FORMAT=json` for JSON lines.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_storefront::config::ClientConfig;
use shopfront_storefront::session::FileStorage;
use shopfront_storefront::Storefront;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront client")]
struct Cli {
    /// Override the API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Check that the API is reachable
    Health,
    /// List products
    Products {
        /// Category name, or "All"
        #[arg(short, long, default_value = "All")]
        category: String,
        /// Case-insensitive text to look for in title or description
        #[arg(short, long, default_value = "")]
        search: String,
    },
    /// List product categories
    Categories,
    /// Show one product
    Product { id: i64 },
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout(commands::cart::CheckoutArgs),
    /// List past orders
    Orders,
    /// Show one order
    Order { id: i64 },
    /// Staff tools
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product_id: i64 },
    /// Remove a line
    Remove { product_id: i64 },
    /// Take one unit off a line
    Decrease { product_id: i64 },
    /// Set the quantity of a line
    Set { product_id: i64, quantity: u32 },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Ask the backend to re-import the product catalog
    RefreshCatalog,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.api_url.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            render::failure(&e.user_message());
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr; stdout carries command output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=warn,shopfront_cli=info".into());

    let json_logs = std::env::var("SHOPFRONT_LOG_FORMAT").is_ok_and(|v| v == "json");

    tracing_subscriber::registry()
        .with(env_filter)
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(json_logs.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli.command, config).await {
        tracing::debug!(error = ?e, "Command failed");
        render::failure(&e.user_message());
        std::process::exit(1);
    }
}

fn load_config(api_url: Option<&str>) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(url) = api_url {
        let overridden = ClientConfig::for_api_url(url)?;
        config.api_url = overridden.api_url;
    }
    Ok(config)
}

async fn run(command: Commands, config: ClientConfig) -> Result<(), CliError> {
    let storage = Arc::new(FileStorage::new(config.session_file.clone()));
    let shop = Storefront::new(config, storage)?;

    match command {
        Commands::Signup {
            username,
            email,
            password,
        } => commands::auth::signup(&shop, username, email, password).await,
        Commands::Login { username, password } => {
            commands::auth::login(&shop, username, password).await
        }
        Commands::Logout => {
            commands::auth::logout(&shop);
            Ok(())
        }
        Commands::Whoami => {
            commands::auth::whoami(&shop);
            Ok(())
        }
        Commands::Health => commands::catalog::health(&shop).await,
        Commands::Products { category, search } => {
            commands::catalog::products(&shop, &category, search).await
        }
        Commands::Categories => commands::catalog::categories(&shop).await,
        Commands::Product { id } => commands::catalog::product(&shop, id).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&shop).await,
            CartAction::Add { product_id } => commands::cart::add(&shop, product_id).await,
            CartAction::Remove { product_id } => commands::cart::remove(&shop, product_id).await,
            CartAction::Decrease { product_id } => {
                commands::cart::decrease(&shop, product_id).await
            }
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set_quantity(&shop, product_id, quantity).await,
            CartAction::Clear => commands::cart::clear(&shop).await,
        },
        Commands::Checkout(args) => commands::cart::checkout(&shop, args).await,
        Commands::Orders => commands::orders::list(&shop).await,
        Commands::Order { id } => commands::orders::show(&shop, id).await,
        Commands::Admin { action } => match action {
            AdminAction::RefreshCatalog => commands::catalog::refresh(&shop).await,
        },
    }
}

//! Boutique CLI - Shop from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the session is kept under BOUTIQUE_STATE_DIR)
//! BOUTIQUE_PASSWORD=secret boutique login -e ines@boutique.fr
//!
//! # Browse and fill the current cart
//! boutique products --category Audio --in-stock
//! boutique cart add 12 -q 2
//! boutique cart show
//!
//! # Manage several carts
//! boutique carts list --sort value --hide-empty
//! boutique carts new
//! boutique carts switch 7
//!
//! # Turn the current cart into an order
//! boutique checkout
//! ```
//!
//! # Commands
//!
//! - `login`, `signup`, `logout`, `whoami` - Account session
//! - `products` - Catalogue listing
//! - `cart` - Current cart contents
//! - `carts` - All of the user's carts
//! - `checkout` - Order the current cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use boutique_core::{CartId, ProductId, Role};
use boutique_storefront::cart::CartSort;
use boutique_storefront::config::StorefrontConfig;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "boutique")]
#[command(author, version, about = "Boutique shopper CLI")]
struct Cli {
    /// Base URL of the Boutique API (overrides `BOUTIQUE_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory for the saved session and cart snapshots (overrides `BOUTIQUE_STATE_DIR`)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(long, env = "BOUTIQUE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log into it
    Signup {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (at least 6 characters)
        #[arg(long, env = "BOUTIQUE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Account role (`client`, `admin`)
        #[arg(short, long, default_value = "client")]
        role: Role,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List products
    Products {
        /// Only products of this category
        #[arg(long)]
        category: Option<String>,

        /// Only products of this brand
        #[arg(long)]
        brand: Option<String>,

        /// Only products in stock
        #[arg(long)]
        in_stock: bool,
    },
    /// Work with the current cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Work with all carts
    Carts {
        #[command(subcommand)]
        action: CartsAction,
    },
    /// Order the current cart
    Checkout,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the current cart
    Show,
    /// Add a product
    Add {
        product_id: ProductId,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove { product_id: ProductId },
    /// Set the quantity of a product (0 removes it)
    Set { product_id: ProductId, quantity: i64 },
    /// Empty the current cart
    Clear,
}

#[derive(Subcommand)]
enum CartsAction {
    /// List carts with totals
    List {
        /// Sort order (`date`, `items`, `value`)
        #[arg(long, default_value_t = CartSort::Date)]
        sort: CartSort,

        /// Leave out carts without items
        #[arg(long)]
        hide_empty: bool,
    },
    /// Make another cart current
    Switch { cart_id: CartId },
    /// Create an empty cart and make it current
    New,
    /// Delete a cart
    Delete { cart_id: CartId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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

fn load_config(cli: &Cli) -> Result<StorefrontConfig, CommandError> {
    let mut config = StorefrontConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config.api_url = StorefrontConfig::for_api(url)?.api_url;
    }
    if let Some(dir) = &cli.state_dir {
        config.state_dir = Some(dir.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            output::failure(&e);
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "boutique_storefront=info,boutique_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli.command, config).await {
        e.capture();
        output::failure(&e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: StorefrontConfig) -> Result<(), CommandError> {
    match command {
        Commands::Login { email, password } => {
            commands::account::login(config, &email, &SecretString::from(password)).await
        }
        Commands::Signup {
            name,
            email,
            password,
            role,
        } => {
            commands::account::signup(config, &name, &email, &SecretString::from(password), role)
                .await
        }
        Commands::Logout => commands::account::logout(config).await,
        Commands::Whoami => commands::account::whoami(config).await,
        Commands::Products {
            category,
            brand,
            in_stock,
        } => {
            let filter = commands::catalog::ProductFilter {
                category,
                brand,
                in_stock,
            };
            commands::catalog::products(config, &filter).await
        }
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(config).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(config, product_id, quantity).await,
            CartAction::Remove { product_id } => commands::cart::remove(config, product_id).await,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(config, product_id, quantity).await,
            CartAction::Clear => commands::cart::clear(config).await,
        },
        Commands::Carts { action } => match action {
            CartsAction::List { sort, hide_empty } => {
                commands::carts::list(config, sort, hide_empty).await
            }
            CartsAction::Switch { cart_id } => commands::carts::switch(config, cart_id).await,
            CartsAction::New => commands::carts::create(config).await,
            CartsAction::Delete { cart_id } => commands::carts::delete(config, cart_id).await,
        },
        Commands::Checkout => commands::carts::checkout(config).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_carts_list() {
        let cli = Cli::try_parse_from(["boutique", "carts", "list", "--sort", "value", "--hide-empty"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Carts {
                action: CartsAction::List {
                    sort: CartSort::Value,
                    hide_empty: true
                }
            }
        ));
    }

    #[test]
    fn test_parse_cart_set_negative_quantity() {
        let cli = Cli::try_parse_from(["boutique", "cart", "set", "3", "--", "-1"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Set { quantity: -1, .. }
            }
        ));
    }

    #[test]
    fn test_cart_panel_is_not_a_command() {
        assert!(Cli::try_parse_from(["boutique", "cart", "open"]).is_err());
    }
}

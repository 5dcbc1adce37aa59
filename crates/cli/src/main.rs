//! Lumina CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Subscribe to the Pro plan (the payment step is answered in the terminal)
//! lumina subscribe -n "Jane Doe" -e jane@example.com -p +919876543210
//!
//! # Log in and shop
//! lumina login -e jane@example.com
//! lumina products
//! lumina cart add 1 --qty 2
//! lumina cart checkout --method cod --name "Jane Doe" --phone +919876543210 \
//!     --pincode 560001 --address "12 MG Road, Bengaluru"
//!
//! # Talk to the support assistant
//! lumina chat
//!
//! # Admin console
//! lumina admin users
//! lumina admin analyze "revenue by vendor this month"
//! ```
//!
//! # Commands
//!
//! - `subscribe` - Pay for and register a subscription
//! - `login` / `logout` / `whoami` / `profile` - Session management
//! - `products` / `cart` - Marketplace browsing and checkout
//! - `chat` - Support chat
//! - `admin` - User list and analytics (admin role required)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lumina_storefront::StorefrontConfig;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "lumina")]
#[command(author, version, about = "Lumina storefront CLI")]
struct Cli {
    /// Verify logins against a local accounts file instead of the backend
    #[arg(long, global = true, env = "LUMINA_LOCAL_ACCOUNTS")]
    local_accounts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pay for and register a subscription
    Subscribe {
        /// Full name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Phone number with country code (e.g. +919876543210)
        #[arg(short, long)]
        phone: String,

        /// Answer the payment step with this payment id instead of prompting
        #[arg(long)]
        payment_id: Option<String>,

        /// Gateway signature to send with `--payment-id`
        #[arg(long, requires = "payment_id")]
        signature: Option<String>,
    },
    /// Log in
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out (the cart is kept)
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show the backend's record for a user
    Profile {
        /// Email to look up (defaults to the logged-in user)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// List marketplace products
    Products {
        /// Bypass the catalog cache
        #[arg(long)]
        refresh: bool,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Chat with the support assistant
    Chat,
    /// Admin console
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product_id: i64,
        #[arg(short, long, default_value_t = 1)]
        qty: u32,
    },
    /// Change a line's quantity (values below 1 are ignored)
    Set { product_id: i64, qty: u32 },
    /// Remove a product
    Remove { product_id: i64 },
    /// Empty the cart
    Clear,
    /// Place the order
    Checkout {
        /// Payment method (`upi`, `card`, `cod`)
        #[arg(short, long, default_value = "upi")]
        method: String,

        /// Recipient name
        #[arg(long)]
        name: String,

        /// Recipient phone with country code
        #[arg(long)]
        phone: String,

        /// 6-digit pincode
        #[arg(long)]
        pincode: String,

        /// Street address
        #[arg(long)]
        address: String,

        /// Marketplace customer id (defaults to the logged-in user's id)
        #[arg(long)]
        customer_id: Option<i64>,

        /// Answer the payment step with this payment id instead of prompting
        #[arg(long)]
        payment_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// List registered users
    Users,
    /// Ask an analytics question
    Analyze { query: String },
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays clean on stdout
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lumina_storefront=info,lumina_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        e.capture();
        commands::report_failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> lumina_storefront::Result<()> {
    let ctx = commands::Context::new(config, cli.local_accounts.as_deref()).await?;

    match cli.command {
        Commands::Subscribe {
            name,
            email,
            phone,
            payment_id,
            signature,
        } => {
            let answer = payment_id.map(|id| commands::PaymentAnswer { id, signature });
            commands::subscribe::run(&ctx, &name, &email, &phone, answer).await?;
        }
        Commands::Login { email, password } => {
            commands::account::login(&ctx, &email, password).await?;
        }
        Commands::Logout => commands::account::logout(&ctx).await?,
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::Profile { email } => commands::account::profile(&ctx, email.as_deref()).await?,
        Commands::Products { refresh } => commands::shop::products(&ctx, refresh).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shop::show_cart(&ctx).await?,
            CartAction::Add { product_id, qty } => {
                commands::shop::add_to_cart(&ctx, product_id, qty).await?;
            }
            CartAction::Set { product_id, qty } => {
                commands::shop::set_quantity(&ctx, product_id, qty).await?;
            }
            CartAction::Remove { product_id } => {
                commands::shop::remove_from_cart(&ctx, product_id).await?;
            }
            CartAction::Clear => commands::shop::clear_cart(&ctx).await?,
            CartAction::Checkout {
                method,
                name,
                phone,
                pincode,
                address,
                customer_id,
                payment_id,
            } => {
                let shipping = commands::shop::ShippingArgs {
                    name,
                    phone,
                    pincode,
                    address,
                };
                let answer = payment_id.map(|id| commands::PaymentAnswer {
                    id,
                    signature: None,
                });
                commands::shop::checkout(&ctx, &method, shipping, customer_id, answer).await?;
            }
        },
        Commands::Chat => commands::chat::run(&ctx).await?,
        Commands::Admin { action } => match action {
            AdminAction::Users => commands::admin::users(&ctx).await?,
            AdminAction::Analyze { query } => commands::admin::analyze(&ctx, &query).await?,
        },
    }
    Ok(())
}

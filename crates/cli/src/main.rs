//! Farmart CLI - the livestock marketplace from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Log in and browse the market
//! farmart login -e wanjiku@example.com -p secret
//! farmart market --search "boran"
//!
//! # Build a cart and check out with M-Pesa
//! farmart cart add 42
//! farmart ship --line1 "12 Ngong Rd" --city Nairobi --county Nairobi --phone 0712345678
//! farmart pay mpesa --phone 0712345678
//!
//! # Farmer side
//! farmart listing create --title "Boran heifer" --category Cattle --price "KSh 45,000"
//! farmart decide 7 accept
//! farmart summary
//! ```
//!
//! # Commands
//!
//! - `login` / `register` / `logout` - account management
//! - `market` - browse and search listings
//! - `cart` - manage the local cart
//! - `ship` - save the delivery address
//! - `pay` / `retry` - pay for the cart (M-Pesa or card)
//! - `orders` / `notifications` - order history and decision feed
//! - `listing` / `decide` / `summary` - farmer operations

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};
use farmart_client::AppContext;
use farmart_client::config::ClientConfig;

mod commands;

#[derive(Parser)]
#[command(name = "farmart")]
#[command(author, version, about = "Farmart livestock marketplace CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to the marketplace
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },
    /// Create a new account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Register as a farmer instead of a buyer
        #[arg(long)]
        farmer: bool,
    },
    /// Log out and forget the saved session
    Logout,
    /// Browse listings
    Market {
        /// Filter by title, breed, or location; remembered across runs
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Save the delivery address for checkout
    Ship {
        /// Street address
        #[arg(long)]
        line1: String,

        /// Apartment, suite, etc.
        #[arg(long)]
        line2: Option<String>,

        /// City or town
        #[arg(long)]
        city: String,

        /// County
        #[arg(long)]
        county: String,

        /// Postal code
        #[arg(long)]
        postal_code: Option<String>,

        /// Contact phone for the delivery
        #[arg(long)]
        phone: String,
    },
    /// Pay for the cart
    Pay {
        #[command(subcommand)]
        method: PayMethod,
    },
    /// Re-send the M-Pesa prompt for an order whose payment did not complete
    Retry {
        /// Order id
        order_id: i64,

        /// Phone number to prompt; defaults to the one on the order
        #[arg(short, long)]
        phone: Option<String>,
    },
    /// List your orders
    Orders,
    /// Show order decision notifications
    Notifications,
    /// Manage your listings (farmers)
    Listing {
        #[command(subcommand)]
        action: ListingAction,
    },
    /// Accept or reject an order (farmers)
    Decide {
        /// Order id
        order_id: i64,

        /// The decision
        #[arg(value_enum)]
        decision: Decision,
    },
    /// Payment summary across your orders (farmers)
    Summary,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with totals
    Show,
    /// Add a listing to the cart
    Add {
        /// Listing id
        listing_id: i64,
    },
    /// Adjust a line's quantity by a signed amount (floor of 1)
    Qty {
        /// Listing id
        listing_id: i64,

        /// Signed change, e.g. 2 or -1
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Remove a listing from the cart
    Rm {
        /// Listing id
        listing_id: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum PayMethod {
    /// M-Pesa STK push, then poll for confirmation
    Mpesa {
        /// Phone number to prompt (07XX..., 7XX..., or 2547XX...)
        #[arg(short, long)]
        phone: String,
    },
    /// Card payment, settled immediately
    Card {
        /// Card number
        #[arg(long)]
        number: String,

        /// Expiry as MM/YY
        #[arg(long)]
        expiry: String,

        /// Security code
        #[arg(long)]
        cvv: String,
    },
}

#[derive(Subcommand)]
enum ListingAction {
    /// Create a listing
    Create(commands::farmer::ListingArgs),
    /// Update a listing
    Update {
        /// Listing id
        id: i64,

        #[command(flatten)]
        args: commands::farmer::ListingArgs,
    },
    /// Delete a listing
    Delete {
        /// Listing id
        id: i64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Decision {
    Accept,
    Reject,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("farmart_client=info")),
        )
        .init();

    let cli = Cli::parse();

    let ctx = match ClientConfig::from_env() {
        Ok(config) => AppContext::new(config),
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, &ctx).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Login { email, password } => commands::auth::login(ctx, &email, &password).await?,
        Commands::Register {
            name,
            email,
            password,
            farmer,
        } => commands::auth::register(ctx, &name, &email, &password, farmer).await?,
        Commands::Logout => commands::auth::logout(ctx),
        Commands::Market { search } => commands::market::browse(ctx, search.as_deref()).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(ctx)?,
            CartAction::Add { listing_id } => commands::cart::add(ctx, listing_id).await?,
            CartAction::Qty { listing_id, delta } => commands::cart::qty(ctx, listing_id, delta)?,
            CartAction::Rm { listing_id } => commands::cart::remove(ctx, listing_id)?,
            CartAction::Clear => commands::cart::clear(ctx)?,
        },
        Commands::Ship {
            line1,
            line2,
            city,
            county,
            postal_code,
            phone,
        } => commands::cart::ship(ctx, line1, line2, city, county, postal_code, phone)?,
        Commands::Pay { method } => match method {
            PayMethod::Mpesa { phone } => commands::pay::mpesa(ctx, &phone).await?,
            PayMethod::Card { number, expiry, cvv } => {
                commands::pay::card(ctx, number, expiry, cvv).await?;
            }
        },
        Commands::Retry { order_id, phone } => {
            commands::pay::retry(ctx, order_id, phone.as_deref()).await?;
        }
        Commands::Orders => commands::orders::list(ctx).await?,
        Commands::Notifications => commands::orders::notifications(ctx).await?,
        Commands::Listing { action } => match action {
            ListingAction::Create(args) => commands::farmer::create(ctx, args).await?,
            ListingAction::Update { id, args } => commands::farmer::update(ctx, id, args).await?,
            ListingAction::Delete { id } => commands::farmer::delete(ctx, id).await?,
        },
        Commands::Decide { order_id, decision } => {
            let accept = matches!(decision, Decision::Accept);
            commands::farmer::decide(ctx, order_id, accept).await?;
        }
        Commands::Summary => commands::farmer::summary(ctx).await?,
    }
    Ok(())
}

//! Farmer-side commands: listing CRUD, order decisions, payment summary.

use clap::Args;
use farmart_client::AppContext;
use farmart_client::api::ListingInput;
use farmart_core::{ListingId, OrderId, OrderStatus};

use super::{CommandError, require_session};

/// Listing fields shared by create and update.
#[derive(Args)]
pub struct ListingArgs {
    /// Listing title
    #[arg(long)]
    pub title: String,

    /// Free-text description
    #[arg(long)]
    pub description: Option<String>,

    /// Category, e.g. Cattle, Goats, Poultry
    #[arg(long)]
    pub category: String,

    /// Breed
    #[arg(long)]
    pub breed: Option<String>,

    /// Where the animal is located
    #[arg(long)]
    pub location: Option<String>,

    /// Asking price, free-form (e.g. "KSh 45,000")
    #[arg(long)]
    pub price: String,

    /// Upper price for a range
    #[arg(long)]
    pub max_price: Option<String>,

    /// Weight, free-form
    #[arg(long)]
    pub weight: Option<String>,

    /// Age, free-form
    #[arg(long)]
    pub age: Option<String>,

    /// Image URL
    #[arg(long)]
    pub image_url: Option<String>,

    /// Listing status
    #[arg(long, default_value = "available")]
    pub status: String,

    /// Health notes
    #[arg(long)]
    pub health: Option<String>,
}

impl From<ListingArgs> for ListingInput {
    fn from(args: ListingArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            category: args.category,
            breed: args.breed,
            location: args.location,
            price: args.price,
            max_price: args.max_price,
            weight: args.weight,
            age: args.age,
            image_url: args.image_url,
            status: args.status,
            health: args.health,
        }
    }
}

/// Create a listing.
pub async fn create(ctx: &AppContext, args: ListingArgs) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    let listing = ctx.api().create_listing(&session, &args.into()).await?;
    println!("Created listing #{}: {}", listing.id, listing.title);
    Ok(())
}

/// Update a listing.
pub async fn update(ctx: &AppContext, id: i64, args: ListingArgs) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    let listing = ctx
        .api()
        .update_listing(&session, ListingId::new(id), &args.into())
        .await?;
    println!("Updated listing #{}: {}", listing.id, listing.title);
    Ok(())
}

/// Delete a listing.
pub async fn delete(ctx: &AppContext, id: i64) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    ctx.api().delete_listing(&session, ListingId::new(id)).await?;
    println!("Deleted listing #{id}");
    Ok(())
}

/// Accept or reject an order. The decision is terminal.
pub async fn decide(ctx: &AppContext, order_id: i64, accept: bool) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    let status = if accept {
        OrderStatus::Accepted
    } else {
        OrderStatus::Rejected
    };
    let order = ctx
        .api()
        .update_order_status(&session, OrderId::new(order_id), status)
        .await?;
    println!("Order #{} is now {:?}", order.id, order.status);
    Ok(())
}

/// Aggregate payment metrics across the farmer's orders.
pub async fn summary(ctx: &AppContext) -> Result<(), CommandError> {
    let session = require_session(ctx)?;
    let summary = ctx.api().payment_summary(&session).await?;
    println!("Orders:  {}", summary.total);
    println!("Success: {}", summary.success);
    println!("Pending: {}", summary.pending);
    println!("Failed:  {}", summary.failed);
    println!("Revenue: KSh {}", summary.revenue);
    Ok(())
}

//! Cart and delivery address commands.

use farmart_client::AppContext;
use farmart_client::checkout::{CheckoutSession, DeliveryAddress};
use farmart_client::pricing;
use farmart_client::store::CartItem;
use farmart_core::{Email, ListingId};

use super::CommandError;

/// Print the cart with per-line and aggregate totals.
pub fn show(ctx: &AppContext) -> Result<(), CommandError> {
    let items = ctx.cart().items();
    if items.is_empty() {
        println!("Your cart is empty");
        return Ok(());
    }
    for item in &items {
        println!(
            "#{:<4} {:30} x{:<3} @ {:>12} = {}",
            item.id,
            item.title,
            item.qty,
            item.price.display(),
            pricing::line_total(item)
        );
    }
    let totals = pricing::compute_totals(&items);
    println!("Subtotal: KSh {}", totals.subtotal);
    println!("Shipping: KSh {}", totals.shipping);
    println!("Total:    KSh {}", totals.total);
    Ok(())
}

/// Add a listing to the cart. Re-adding appends a second line rather than
/// merging quantities.
pub async fn add(ctx: &AppContext, listing_id: i64) -> Result<(), CommandError> {
    let id = ListingId::new(listing_id);
    let listings = ctx.api().listings().await?;
    let listing = listings
        .iter()
        .find(|listing| listing.id == id)
        .ok_or_else(|| format!("No listing with id {listing_id}"))?;

    let mut item = CartItem::new(id, listing.title.clone(), listing.price.clone());
    item.weight = listing.weight.clone();
    item.owner_email = Email::parse(&listing.owner_email).ok();
    ctx.cart().add_item(item)?;
    println!(
        "Added {} ({} lines in cart)",
        listing.title,
        ctx.cart().line_count()
    );
    Ok(())
}

/// Adjust a line's quantity. Quantities never drop below 1; use `rm` to
/// drop a line.
pub fn qty(ctx: &AppContext, listing_id: i64, delta: i64) -> Result<(), CommandError> {
    ctx.cart().set_quantity(ListingId::new(listing_id), delta)?;
    show(ctx)
}

/// Remove a listing's lines from the cart.
pub fn remove(ctx: &AppContext, listing_id: i64) -> Result<(), CommandError> {
    ctx.cart().remove_item(ListingId::new(listing_id))?;
    println!("Removed ({} lines in cart)", ctx.cart().line_count());
    Ok(())
}

/// Empty the cart.
pub fn clear(ctx: &AppContext) -> Result<(), CommandError> {
    ctx.cart().clear()?;
    println!("Cart cleared");
    Ok(())
}

/// Save the delivery address used at checkout.
#[allow(clippy::needless_pass_by_value)]
pub fn ship(
    ctx: &AppContext,
    line1: String,
    line2: Option<String>,
    city: String,
    county: String,
    postal_code: Option<String>,
    phone: String,
) -> Result<(), CommandError> {
    let address = DeliveryAddress {
        line1,
        line2,
        city,
        county,
        postal_code,
        phone,
    };
    let mut checkout = CheckoutSession::new(ctx.store().clone());
    checkout.to_shipping()?;
    checkout.submit_address(&address)?;
    println!("Delivery address saved");
    Ok(())
}

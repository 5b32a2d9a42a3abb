//! Market browsing.

use farmart_client::AppContext;
use farmart_client::api::ListingOut;

use super::CommandError;

/// Browse listings, optionally filtered. A given search term is saved and
/// reused as the default filter on later runs.
pub async fn browse(ctx: &AppContext, search: Option<&str>) -> Result<(), CommandError> {
    let query = match search {
        Some(q) => {
            ctx.set_search_query(q)?;
            q.to_owned()
        }
        None => ctx.search_query(),
    };

    let listings = ctx.api().listings().await?;
    let shown: Vec<&ListingOut> = listings
        .iter()
        .filter(|listing| matches_query(listing, &query))
        .collect();

    if !query.is_empty() {
        println!("Search: {query}");
    }
    if shown.is_empty() {
        println!("No listings found");
        return Ok(());
    }
    for listing in shown {
        let breed = listing.breed.as_deref().unwrap_or("-");
        let location = listing.location.as_deref().unwrap_or("-");
        println!(
            "#{:<4} {:30} {:12} {:15} {:>12}  by {}",
            listing.id,
            listing.title,
            breed,
            location,
            listing.price.display(),
            listing.owner_name
        );
    }
    Ok(())
}

fn matches_query(listing: &ListingOut, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let haystacks = [
        Some(listing.title.as_str()),
        listing.breed.as_deref(),
        listing.location.as_deref(),
        Some(listing.category.as_str()),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&query))
}

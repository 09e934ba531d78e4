//! Vendor profile aggregation.
//!
//! A profile is the vendor's core row plus bounded, ordered child lists
//! (images, offers, reviews) and derived review statistics. The child
//! lookups are independent of each other and run concurrently; a failure
//! in any of them degrades to an empty list. Only the core row lookup is
//! terminal: a missing vendor reads as None, a core query error as Err.

use super::{DbPool, StoreError};
use crate::models::{ReviewStats, VendorImage, VendorOffer, VendorProfile, VendorReview, VendorRow};

pub const IMAGE_LIMIT: i64 = 12;
pub const OFFER_LIMIT: i64 = 10;
pub const REVIEW_LIMIT: i64 = 8;

pub async fn fetch_vendor(pool: &DbPool, vendor_id: &str) -> Result<Option<VendorRow>, StoreError> {
    let row = sqlx::query_as::<_, VendorRow>(
        "SELECT id, name, category, city, description, price_range,
                min_price, max_price, phone, avg_rating, created_at
         FROM vendors
         WHERE id = ?",
    )
    .bind(vendor_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

async fn fetch_images(pool: &DbPool, vendor_id: &str) -> Result<Vec<VendorImage>, StoreError> {
    let rows = sqlx::query_as::<_, VendorImage>(
        "SELECT id, vendor_id, url, caption, is_main, uploaded_at
         FROM vendor_images
         WHERE vendor_id = ?
         ORDER BY is_main DESC, uploaded_at DESC
         LIMIT ?",
    )
    .bind(vendor_id)
    .bind(IMAGE_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_offers(pool: &DbPool, vendor_id: &str) -> Result<Vec<VendorOffer>, StoreError> {
    let rows = sqlx::query_as::<_, VendorOffer>(
        "SELECT id, vendor_id, title, details, price, updated_at
         FROM vendor_offers
         WHERE vendor_id = ?
         ORDER BY price ASC
         LIMIT ?",
    )
    .bind(vendor_id)
    .bind(OFFER_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

async fn fetch_reviews(pool: &DbPool, vendor_id: &str) -> Result<Vec<VendorReview>, StoreError> {
    let rows = sqlx::query_as::<_, VendorReview>(
        "SELECT id, vendor_id, reviewer_name, rating, title, body, review_ts, source
         FROM vendor_reviews
         WHERE vendor_id = ?
         ORDER BY review_ts DESC
         LIMIT ?",
    )
    .bind(vendor_id)
    .bind(REVIEW_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Assemble the full profile for a vendor, or None when the vendor does
/// not exist.
pub async fn get_vendor_profile(
    pool: &DbPool,
    vendor_id: &str,
) -> Result<Option<VendorProfile>, StoreError> {
    let Some(vendor) = fetch_vendor(pool, vendor_id).await? else {
        return Ok(None);
    };

    let (images, offers, reviews) = tokio::join!(
        fetch_images(pool, vendor_id),
        fetch_offers(pool, vendor_id),
        fetch_reviews(pool, vendor_id),
    );

    let images = images.unwrap_or_else(|e| {
        tracing::warn!("image lookup failed for vendor {vendor_id}: {e}");
        Vec::new()
    });
    let offers = offers.unwrap_or_else(|e| {
        tracing::warn!("offer lookup failed for vendor {vendor_id}: {e}");
        Vec::new()
    });
    let reviews = reviews.unwrap_or_else(|e| {
        tracing::warn!("review lookup failed for vendor {vendor_id}: {e}");
        Vec::new()
    });

    let stats = review_stats(&reviews, vendor.avg_rating);

    Ok(Some(VendorProfile {
        vendor,
        images,
        offers,
        reviews,
        stats,
    }))
}

/// Mean of the fetched ratings rounded to two decimals; with no fetched
/// reviews, the vendor's stored average stands in.
fn review_stats(reviews: &[VendorReview], stored_avg: Option<f64>) -> ReviewStats {
    let review_count = reviews.len();
    let avg_rating = if reviews.is_empty() {
        stored_avg.unwrap_or(0.0)
    } else {
        let sum: f64 = reviews.iter().map(|r| r.rating).sum();
        (sum / review_count as f64 * 100.0).round() / 100.0
    };
    ReviewStats {
        review_count,
        avg_rating,
    }
}

//! Rendering of normalized vendor records into a numbered chat listing.
//!
//! Records have no guaranteed schema, so every field resolves through a
//! priority list of known key names with a literal fallback. The fallback
//! strings and the empty-result message are part of the observable contract
//! consumed by the chat UI; do not reword them casually.

use std::fmt::Write;

use serde_json::Value;

/// Render at most `limit` vendors as a 1-indexed listing headed by the
/// query, or the fixed "nothing found" message echoing the query.
pub fn format_vendor_list(vendors: &[Value], query: &str, limit: usize) -> String {
    if vendors.is_empty() {
        return format!(
            "I couldn’t find any vendors in my database for that request. I searched for: \"{query}\".\n\n\
             You can: 1) specify a neighbourhood (e.g., \"Powai\"), 2) give a budget, \
             3) allow me to search the web for vendor options, or 4) add vendors to the database."
        );
    }

    let mut out = format!("Here are some vendors I found for \"{query}\":\n\n");
    for (idx, vendor) in vendors.iter().take(limit).enumerate() {
        let name = scalar_field(vendor, &["name", "title", "vendor_name", "provider"])
            .unwrap_or_else(|| "Unnamed vendor".to_string());
        let category = scalar_field(
            vendor,
            &["category", "vendor_type", "sub_category", "type", "tag"],
        )
        .unwrap_or_else(|| "Vendor".to_string());
        let city = scalar_field(vendor, &["city", "location", "town"])
            .unwrap_or_else(|| "Mumbai".to_string());
        let price = price_suffix(vendor);
        let contact = contact_suffix(vendor);

        if idx > 0 {
            out.push('\n');
        }
        write!(out, "{}. {} – {}, {}{}{}", idx + 1, name, category, city, price, contact).unwrap();
    }
    out
}

/// First key present with a non-null scalar value, rendered as text.
/// Objects and arrays are skipped so a malformed record degrades to the
/// fallback literal instead of leaking JSON into the listing.
fn scalar_field(vendor: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| vendor.get(k).and_then(scalar_display))
}

fn scalar_display(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Scalar rendered only when meaningful: empty strings and zero prices
/// read as "not provided" upstream and must not produce a suffix.
fn meaningful_scalar(value: Option<&Value>) -> Option<String> {
    let value = value?;
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Bool(false) | Value::Null => None,
        _ => scalar_display(value),
    }
}

fn price_suffix(vendor: &Value) -> String {
    if let Some(range) = meaningful_scalar(vendor.get("price_range")) {
        return format!(", approx {range}");
    }

    let min = meaningful_scalar(vendor.get("min_price"));
    let max = meaningful_scalar(vendor.get("max_price"));
    if min.is_none() && max.is_none() {
        return String::new();
    }

    let min = min.unwrap_or_default();
    let max = max.unwrap_or_default();
    let dash = if !min.is_empty() && !max.is_empty() { "-" } else { "" };
    format!(", approx {min}{dash}{max}")
}

fn contact_suffix(vendor: &Value) -> String {
    // First key that exists with a non-null value wins, even if its value
    // then turns out to be empty; later keys are not consulted.
    let candidate = [
        vendor.get("phone"),
        vendor.get("contact"),
        vendor.get("metadata").and_then(|m| m.get("phone")),
    ]
    .into_iter()
    .flatten()
    .find(|v| !v.is_null());

    match candidate.and_then(|v| meaningful_scalar(Some(v))) {
        Some(contact) => format!(", contact: {contact}"),
        None => String::new(),
    }
}

//! Vendor search-result handling: normalization of heterogeneous search
//! responses and rendering of the user-facing vendor listing.

pub mod format;
pub mod normalize;

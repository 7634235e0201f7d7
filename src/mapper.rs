//! Conversions between address space, normalized ratios and rendered extents.
//!
//! Everything here is stateless. Rounding rules:
//! - ratio to address count or offset rounds half-up;
//! - an implied base address is floor-aligned later, by the range it lands in.

use crate::ip::AddressRange;

/// Smallest extent an allocated block is ever rendered with
pub const MIN_OCCUPIED_EXTENT: f64 = 20.0;

/// Position of `offset` within `total` addresses, clamped to `[0, 1]`
pub fn address_offset_to_ratio(offset: u128, total: u128) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (offset as f64 / total as f64).clamp(0.0, 1.0)
}

/// Address offset implied by `ratio` of `total` addresses, rounded half-up
pub fn ratio_to_address_offset(ratio: f64, total: u128) -> u128 {
    if !ratio.is_finite() {
        return 0;
    }
    let scaled = ratio.clamp(0.0, 1.0) * total as f64;
    // Float-to-int casts saturate, so the huge v6 totals stay in range.
    ((scaled + 0.5).floor() as u128).min(total)
}

/// Rendered extent for a ratio of the available extent
pub fn ratio_to_extent(ratio: f64, available_extent: f64) -> f64 {
    ratio * available_extent
}

/// Ratio of `extent` within `available_extent`, clamped to `[0, 1]`
pub fn extent_to_ratio(extent: f64, available_extent: f64) -> f64 {
    if available_extent <= 0.0 || !available_extent.is_finite() || !extent.is_finite() {
        return 0.0;
    }
    (extent / available_extent).clamp(0.0, 1.0)
}

/// Apply the rendering floor for allocated blocks
pub fn clamp_occupied_extent(extent: f64) -> f64 {
    extent.max(MIN_OCCUPIED_EXTENT)
}

/// Number of bits needed to represent `value`
fn bit_length(value: u128) -> u8 {
    (128 - value.leading_zeros()) as u8
}

/// Prefix length whose block holds the address count implied by `extent_ratio`.
///
/// The implied count is `round(extent_ratio * total)` (at least one address),
/// and the block is the smallest power of two holding it.
pub fn implied_prefix_len(extent_ratio: f64, total: u128, bits: u8) -> u8 {
    let count = ratio_to_address_offset(extent_ratio, total).max(1);
    bits.saturating_sub(bit_length(count - 1))
}

/// Integer base address implied by a top-offset ratio within `summary`.
///
/// The result is kept inside the summary; alignment to the moved block's
/// prefix happens when the range is rebuilt.
pub fn implied_base(offset_ratio: f64, summary: &AddressRange) -> u128 {
    let offset = ratio_to_address_offset(offset_ratio, summary.num_addresses());
    summary.base().saturating_add(offset).min(summary.last())
}

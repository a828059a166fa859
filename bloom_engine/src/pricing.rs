//! The pure pricing core.
//!
//! Every cart mutation path and the server-side placement re-pricing funnel through [`recompute_totals`] exactly
//! once; the clamping rules live here and nowhere else.
use bloom_common::Rupees;

use crate::db_types::{AppliedCoupon, CartLine, CartTotals, DiscountKind};

/// Computes the discount a coupon yields against a subtotal.
///
/// Percentage discounts are computed against the subtotal only (delivery is excluded from the discount base) and
/// clamped to `max_discount` when present. Fixed discounts use the stored value directly. Either kind is finally
/// clamped to the subtotal so the discounted subtotal can never go negative.
pub fn discount_for(kind: DiscountKind, value: i64, max_discount: Option<Rupees>, subtotal: Rupees) -> Rupees {
    let raw = match kind {
        DiscountKind::Fixed => Rupees::from(value),
        DiscountKind::Percentage => {
            let pct = subtotal.percent(value);
            max_discount.map_or(pct, |cap| pct.min(cap))
        },
    };
    raw.min(subtotal)
}

/// Derives the cart totals from the current line items, applied coupon and surcharges.
///
/// Pure and idempotent: the same inputs always yield the same totals. The invariants from the data model hold by
/// construction: `discount <= subtotal` and
/// `total = max(0, subtotal - discount) + delivery_charge + payment_surcharge`.
pub fn recompute_totals(
    lines: &[CartLine],
    coupon: Option<&AppliedCoupon>,
    delivery_charge: Rupees,
    payment_surcharge: Rupees,
) -> CartTotals {
    let subtotal: Rupees = lines.iter().map(CartLine::line_total).sum();
    let item_count = lines.iter().map(|l| l.quantity).sum();
    let discount = coupon.map_or(Rupees::from(0), |c| discount_for(c.kind, c.value, c.max_discount, subtotal));
    let total = subtotal.saturating_sub(discount) + delivery_charge + payment_surcharge;
    CartTotals { item_count, subtotal, discount, delivery_charge, payment_surcharge, total }
}

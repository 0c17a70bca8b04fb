use crate::entities::cart_item::StockStatus;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Available quantity at or below this bucket shows urgency messaging.
/// The boundary is inclusive: exactly 30 is still very limited stock.
const VERY_LIMITED_STOCK_CEILING: f64 = 30.0;

/// Per-item pricing result, rounded to currency precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemPricing {
    pub item_total_price: Decimal,
    pub item_saved_amount: Decimal,
}

impl ItemPricing {
    fn zero() -> Self {
        Self::default()
    }
}

/// Computes the charged total and savings for one line.
///
/// Upstream pricing data is not trusted to be well-formed: any non-positive
/// or non-finite input yields a zero result instead of an error, so a corrupt
/// catalogue record can never fail the whole cart.
pub fn compute_item_pricing(original_price: f64, discounted_price: f64, quantity: f64) -> ItemPricing {
    if !is_positive_finite(original_price)
        || !is_positive_finite(discounted_price)
        || !is_positive_finite(quantity)
    {
        return ItemPricing::zero();
    }

    let original = Decimal::from_f64(original_price).unwrap_or(Decimal::ZERO);
    let discounted = Decimal::from_f64(discounted_price).unwrap_or(Decimal::ZERO);
    let qty = Decimal::from_f64(quantity).unwrap_or(Decimal::ZERO);

    ItemPricing {
        item_total_price: round_currency(qty * discounted),
        item_saved_amount: round_currency(qty * (original - discounted)),
    }
}

/// Classifies catalogue availability into a stock bucket.
pub fn classify_stock(available_quantity: f64) -> StockStatus {
    if available_quantity.is_nan() || available_quantity <= 0.0 {
        StockStatus::OutOfStock
    } else if available_quantity <= VERY_LIMITED_STOCK_CEILING {
        StockStatus::VeryLimitedStock
    } else {
        StockStatus::InStock
    }
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Half-up rounding to 2 decimal places.
fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub mod carts;
pub mod coupons;
pub mod mapper;
pub mod pricing;
pub mod reconciler;

pub use carts::{CartService, CartWithItems, CreateCartInput};
pub use coupons::{
    compute_discounted_total, CartTotals, CouponEvaluator, CouponOutcome, CouponService,
    DiscountType, ExposedCouponResult,
};
pub use mapper::{
    map_ai_lines, map_items, AiCartLine, CatalogMatch, LineSource, MappedItem, MappedItems,
    MatchSelection,
};
pub use pricing::{classify_stock, compute_item_pricing, ItemPricing};
pub use reconciler::{CartReconciler, ClientCartItem, ReconciledCart};

/// Hard cap on a line quantity at persistence time.
pub const MAX_LINE_QUANTITY: i32 = 3;

use crate::{
    entities::{cart, coupon, Coupon},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const GENERIC_REJECTION: &str = "This coupon is not eligible, please try another code";

/// Discount semantics attached to a coupon code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountType {
    Percentage,
    Flat,
    /// The coupon dictates the final payable amount verbatim.
    Fixed,
    /// Unknown type, evaluates as a no-op discount.
    Other,
}

impl DiscountType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PERCENTAGE" => DiscountType::Percentage,
            "FLAT" => DiscountType::Flat,
            "FIXED" => DiscountType::Fixed,
            _ => DiscountType::Other,
        }
    }
}

/// User-facing coupon verdict. Never persisted and never an error: an
/// ineligible coupon is reported through `applied = false` plus a message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedCouponResult {
    pub message: String,
    pub applied: bool,
    pub discounted_amount: Option<Decimal>,
    pub coupon: Option<coupon::Model>,
}

impl ExposedCouponResult {
    pub fn none() -> Self {
        Self::not_applied("")
    }

    pub fn not_applied(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            applied: false,
            discounted_amount: None,
            coupon: None,
        }
    }
}

/// Snapshot of the amounts coupon eligibility is judged against.
#[derive(Debug, Clone, Copy)]
pub struct CartTotals {
    pub sub_total: Decimal,
    pub delivery_charges: Decimal,
}

impl CartTotals {
    pub fn of_cart(cart: &cart::Model) -> Self {
        Self {
            sub_total: cart.sub_total,
            delivery_charges: cart.delivery_charges,
        }
    }

    /// Amount payable before any coupon discount.
    pub fn payable(&self) -> Decimal {
        self.sub_total + self.delivery_charges
    }
}

#[derive(Debug, Clone)]
pub struct CouponOutcome {
    pub result: ExposedCouponResult,
    pub discounted_total: Decimal,
}

/// Evaluates a coupon against a cart snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct CouponEvaluator;

impl CouponEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Runs the eligibility checks in strict order; the first failing check
    /// wins and the remaining ones are skipped. The caller supplies `now` so
    /// the date window is testable.
    pub fn apply_coupon(
        &self,
        totals: CartTotals,
        coupon: Option<&coupon::Model>,
        now: DateTime<Utc>,
    ) -> CouponOutcome {
        let base = totals.payable();

        let Some(coupon) = coupon else {
            return CouponOutcome {
                result: ExposedCouponResult::none(),
                discounted_total: base,
            };
        };

        if now < coupon.start_date || now > coupon.expiry_date {
            return Self::rejected(base, GENERIC_REJECTION);
        }
        if base < coupon.minimum_order_value {
            return Self::rejected(
                base,
                format!(
                    "This coupon needs a minimum order value of {}",
                    coupon.minimum_order_value
                ),
            );
        }
        if let Some(maximum) = coupon.maximum_order_value {
            if base >= maximum {
                return Self::rejected(
                    base,
                    format!("This coupon is only valid for orders under {maximum}"),
                );
            }
        }
        // Strict '>' keeps the historical behavior: exactly one use beyond
        // the stated limit passes before rejection kicks in.
        if coupon.usage_count > coupon.usage_limit {
            return Self::rejected(base, GENERIC_REJECTION);
        }

        let discounted_total = compute_discounted_total(
            base,
            DiscountType::parse(&coupon.discount_type),
            coupon.discount_value,
        );

        CouponOutcome {
            result: ExposedCouponResult {
                message: format!(
                    "Coupon {} applied, your total is now {discounted_total}",
                    coupon.code
                ),
                applied: true,
                discounted_amount: Some(base - discounted_total),
                coupon: Some(coupon.clone()),
            },
            discounted_total,
        }
    }

    fn rejected(base: Decimal, message: impl Into<String>) -> CouponOutcome {
        CouponOutcome {
            result: ExposedCouponResult::not_applied(message),
            discounted_total: base,
        }
    }
}

/// Applies the discount-type switch to an order base (subtotal + delivery).
/// The result never goes below zero.
pub fn compute_discounted_total(
    base: Decimal,
    discount_type: DiscountType,
    discount_value: Decimal,
) -> Decimal {
    let discounted = match discount_type {
        DiscountType::Percentage => base - base * discount_value / Decimal::ONE_HUNDRED,
        DiscountType::Flat => base - discount_value,
        DiscountType::Fixed => discount_value,
        DiscountType::Other => base,
    };
    discounted.max(Decimal::ZERO)
}

/// Database-facing coupon operations.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Option<coupon::Model>, ServiceError> {
        Ok(Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?)
    }

    /// Records a successful redemption: increments the usage count by one and
    /// appends the user to the audit trail. Invoked by the payment
    /// verification flow once an order is created against the coupon.
    #[instrument(skip(self))]
    pub async fn record_redemption(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
    ) -> Result<coupon::Model, ServiceError> {
        let coupon = Coupon::find_by_id(coupon_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {coupon_id} not found")))?;

        let usage_count = coupon.usage_count;
        let mut applied = match &coupon.applied_user_ids {
            serde_json::Value::Array(users) => users.clone(),
            _ => Vec::new(),
        };
        applied.push(serde_json::Value::String(user_id.to_string()));

        let mut active: coupon::ActiveModel = coupon.into();
        active.usage_count = Set(usage_count + 1);
        active.applied_user_ids = Set(serde_json::Value::Array(applied));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CouponRedeemed { coupon_id, user_id })
            .await;

        info!(coupon_id = %coupon_id, usage_count = updated.usage_count, "Coupon redemption recorded");
        Ok(updated)
    }
}

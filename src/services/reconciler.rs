use crate::{
    entities::{cart, cart_item, coupon, Cart, CartItem, Coupon, StockStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::{CartTotals, CouponEvaluator},
    services::MAX_LINE_QUANTITY,
};
use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Desired state of one cart line, as submitted by the client.
/// A quantity that truncates to zero or below marks the line for removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCartItem {
    pub item_external_id: Option<String>,
    pub item_name: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default)]
    pub item_image_url: Vec<String>,
    pub item_quantity: f64,
    pub item_original_price: f64,
    pub item_discounted_price: f64,
    #[serde(default)]
    pub item_stock_status: String,
    #[serde(default)]
    pub item_weight: f64,
    #[serde(default)]
    pub item_weight_unit: String,
}

/// Consistent cart snapshot returned to the caller: totals recomputed, item
/// list reordered to the caller-supplied target order.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledCart {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
    pub coupon: Option<coupon::Model>,
}

/// Reconciles an externally supplied desired cart state against the persisted
/// cart and recomputes pricing.
///
/// Writes are applied strictly sequentially and are not wrapped in a
/// transaction; the flow assumes a single writer per cart. A persistence
/// failure mid-diff surfaces as `ReconciliationFailed` and leaves the writes
/// that already committed in place.
#[derive(Clone)]
pub struct CartReconciler {
    db: Arc<DatabaseConnection>,
    evaluator: CouponEvaluator,
    event_sender: Arc<EventSender>,
}

impl CartReconciler {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db,
            evaluator: CouponEvaluator::new(),
            event_sender,
        }
    }

    /// Applies `target_items` as the desired cart state.
    ///
    /// Persisted lines absent from the target set are removed; targeted lines
    /// are inserted or updated (quantity capped at the persistence limit,
    /// `recommended` forced to false — a user-confirmed line is no longer an
    /// up-sell); targets whose quantity truncates to zero or below remove
    /// their matching line. Totals are
    /// then recomputed, the attached coupon re-evaluated, and the refreshed
    /// cart returned with its items in target order.
    ///
    /// Fails with `NotFound` when the cart does not exist or belongs to a
    /// different user, and with `ReconciliationFailed` on persistence errors
    /// during the diff.
    #[instrument(skip(self, target_items), fields(item_count = target_items.len()))]
    pub async fn reconcile(
        &self,
        user_id: Uuid,
        cart_id: Uuid,
        target_items: &[ClientCartItem],
    ) -> Result<ReconciledCart, ServiceError> {
        let persisted = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&*self.db)
            .await
            .map_err(|e| {
                ServiceError::ReconciliationFailed(format!("failed to load cart lines: {e}"))
            })?;

        let target_ids: HashSet<Option<String>> = target_items
            .iter()
            .map(|t| t.item_external_id.clone())
            .collect();

        // Lines the client no longer wants.
        for stale in persisted
            .iter()
            .filter(|p| !target_ids.contains(&p.external_id))
        {
            self.delete_line(cart_id, stale.external_id.as_deref())
                .await?;
        }

        let by_external_id: HashMap<&Option<String>, &cart_item::Model> =
            persisted.iter().map(|p| (&p.external_id, p)).collect();

        for target in target_items {
            let existing = by_external_id.get(&target.item_external_id).copied();

            // Judged on the integral quantity so a fractional target below 1
            // removes instead of persisting a zero-quantity line.
            let quantity = clamp_line_quantity(target.item_quantity);
            if quantity <= 0 {
                if existing.is_some() {
                    self.delete_line(cart_id, target.item_external_id.as_deref())
                        .await?;
                }
                continue;
            }

            match existing {
                Some(item) => {
                    let mut line: cart_item::ActiveModel = item.clone().into();
                    line.quantity = Set(quantity);
                    line.recommended = Set(false);
                    line.updated_at = Set(Utc::now());
                    line.update(&*self.db).await.map_err(|e| {
                        ServiceError::ReconciliationFailed(format!(
                            "failed to update cart line: {e}"
                        ))
                    })?;
                }
                None => {
                    let line = cart_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        cart_id: Set(cart_id),
                        external_id: Set(target.item_external_id.clone()),
                        name: Set(target.item_name.clone()),
                        description: Set(target.item_description.clone()),
                        image_urls: Set(serde_json::json!(target.item_image_url)),
                        quantity: Set(quantity),
                        original_price: Set(decimal_or_zero(target.item_original_price)),
                        discounted_price: Set(decimal_or_zero(target.item_discounted_price)),
                        stock_status: Set(StockStatus::parse(&target.item_stock_status)),
                        weight: Set(target.item_weight),
                        weight_unit: Set(target.item_weight_unit.clone()),
                        recommended: Set(false),
                        created_at: Set(Utc::now()),
                        updated_at: Set(Utc::now()),
                    };
                    line.insert(&*self.db).await.map_err(|e| {
                        ServiceError::ReconciliationFailed(format!(
                            "failed to insert cart line: {e}"
                        ))
                    })?;
                }
            }
        }

        let cart = Cart::find_by_id(cart_id)
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&*self.db)
            .await?;
        let sub_total: Decimal = items
            .iter()
            .filter(|i| !i.recommended)
            .map(|i| Decimal::from(i.quantity) * i.discounted_price)
            .sum();

        let attached_coupon = match cart.coupon_id {
            Some(coupon_id) => Coupon::find_by_id(coupon_id).one(&*self.db).await?,
            None => None,
        };
        let outcome = self.evaluator.apply_coupon(
            CartTotals {
                sub_total,
                delivery_charges: cart.delivery_charges,
            },
            attached_coupon.as_ref(),
            Utc::now(),
        );

        let mut active: cart::ActiveModel = cart.into();
        active.sub_total = Set(sub_total);
        active.total = Set(outcome.discounted_total);
        active.updated_at = Set(Utc::now());
        let cart = active.update(&*self.db).await?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&*self.db)
            .await?;
        let mut remaining: HashMap<Option<String>, cart_item::Model> = items
            .into_iter()
            .map(|item| (item.external_id.clone(), item))
            .collect();
        // Output order follows the caller's target order; anything without a
        // target counterpart is dropped from the snapshot.
        let ordered: Vec<cart_item::Model> = target_items
            .iter()
            .filter_map(|t| remaining.remove(&t.item_external_id))
            .collect();

        self.event_sender
            .send_or_log(Event::CartUpdated(cart_id))
            .await;
        info!(
            cart_id = %cart_id,
            items = ordered.len(),
            sub_total = %cart.sub_total,
            total = %cart.total,
            "Cart reconciled"
        );

        Ok(ReconciledCart {
            cart,
            items: ordered,
            coupon: attached_coupon,
        })
    }

    async fn delete_line(
        &self,
        cart_id: Uuid,
        external_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut delete = CartItem::delete_many().filter(cart_item::Column::CartId.eq(cart_id));
        delete = match external_id {
            Some(id) => delete.filter(cart_item::Column::ExternalId.eq(id)),
            None => delete.filter(cart_item::Column::ExternalId.is_null()),
        };
        delete.exec(&*self.db).await.map_err(|e| {
            ServiceError::ReconciliationFailed(format!("failed to delete cart line: {e}"))
        })?;
        Ok(())
    }
}

/// Persistence-time quantity cap. Applied on every write, independently of
/// the mapper's sanity clamp.
pub(crate) fn clamp_line_quantity(requested: f64) -> i32 {
    requested.min(MAX_LINE_QUANTITY as f64) as i32
}

fn decimal_or_zero(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

use crate::{
    config::AppConfig,
    entities::{cart, cart_item, coupon, Cart, CartItem, Coupon},
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::{CartTotals, CouponEvaluator, ExposedCouponResult},
    services::mapper::MappedItems,
    services::MAX_LINE_QUANTITY,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Input for creating a cart
#[derive(Debug, Deserialize)]
pub struct CreateCartInput {
    pub user_id: Uuid,
    pub store_id: Option<String>,
    pub store_name: Option<String>,
    pub note: Option<String>,
    /// Overrides the configured delivery tariff when set
    pub delivery_charges: Option<Decimal>,
    pub delivery_time_minutes: Option<i32>,
}

/// Cart with items
#[derive(Debug, Serialize)]
pub struct CartWithItems {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
}

/// Cart lifecycle service: creation, AI/search ingestion, retrieval, and
/// coupon application.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
    evaluator: CouponEvaluator,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            event_sender,
            config,
            evaluator: CouponEvaluator::new(),
        }
    }

    /// Creates an empty cart with zero totals and the configured delivery
    /// tariff stamped on.
    #[instrument(skip(self))]
    pub async fn create_cart(&self, input: CreateCartInput) -> Result<cart::Model, ServiceError> {
        let cart_id = Uuid::new_v4();
        let commerce = &self.config.commerce;

        let cart = cart::ActiveModel {
            id: Set(cart_id),
            user_id: Set(input.user_id),
            store_id: Set(input.store_id),
            store_name: Set(input.store_name),
            sub_total: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            saved_amount: Set(Decimal::ZERO),
            savings_message: Set(None),
            delivery_charges: Set(input.delivery_charges.unwrap_or(commerce.delivery_charges)),
            delivery_time_minutes: Set(input
                .delivery_time_minutes
                .unwrap_or(commerce.delivery_time_minutes)),
            discount: Set(Decimal::ZERO),
            free_delivery_threshold: Set(commerce.free_delivery_threshold),
            coupon_id: Set(None),
            note: Set(input.note),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        let cart = cart.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CartCreated(cart_id))
            .await;

        info!("Created cart: {}", cart_id);
        Ok(cart)
    }

    /// Persists mapper output into a freshly created cart: confirmed lines
    /// plus up-sell lines, then totals derived from the confirmed lines only.
    ///
    /// Quantities are capped at the persistence limit here, independently of
    /// the mapper's own sanity clamp.
    #[instrument(skip(self, matched, upsells))]
    pub async fn ingest_mapped_items(
        &self,
        cart_id: Uuid,
        matched: MappedItems,
        upsells: MappedItems,
    ) -> Result<CartWithItems, ServiceError> {
        let cart = Cart::find_by_id(cart_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))?;

        let sub_total = matched.sub_total;
        let saved_amount = matched.saved_amount;

        for item in matched.items.into_iter().chain(upsells.items) {
            let external_id = item.external_id.clone();
            let line = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart_id),
                external_id: Set(item.external_id),
                name: Set(item.name),
                description: Set(item.description),
                image_urls: Set(serde_json::json!(item.image_urls)),
                quantity: Set(item.quantity.min(MAX_LINE_QUANTITY)),
                original_price: Set(item.original_price),
                discounted_price: Set(item.discounted_price),
                stock_status: Set(item.stock_status),
                weight: Set(item.weight),
                weight_unit: Set(item.weight_unit),
                recommended: Set(item.recommended),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            line.insert(&*self.db).await?;

            self.event_sender
                .send_or_log(Event::CartItemAdded {
                    cart_id,
                    external_id,
                })
                .await;
        }

        let savings_message = (saved_amount > Decimal::ZERO)
            .then(|| format!("You are saving {saved_amount} on this order"));

        let delivery_charges = cart.delivery_charges;
        let mut active: cart::ActiveModel = cart.into();
        active.sub_total = Set(sub_total);
        active.saved_amount = Set(saved_amount);
        active.savings_message = Set(savings_message);
        active.total = Set(sub_total + delivery_charges);
        active.updated_at = Set(Utc::now());
        let cart = active.update(&*self.db).await?;

        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&*self.db)
            .await?;

        info!(
            cart_id = %cart_id,
            items = items.len(),
            sub_total = %cart.sub_total,
            "Cart populated from catalogue matches"
        );
        Ok(CartWithItems { cart, items })
    }

    /// Retrieves a cart with its items, verifying ownership.
    #[instrument(skip(self))]
    pub async fn get_cart(
        &self,
        user_id: Uuid,
        cart_id: Uuid,
    ) -> Result<CartWithItems, ServiceError> {
        let cart = self.owned_cart(user_id, cart_id).await?;
        let items = CartItem::find()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .all(&*self.db)
            .await?;

        Ok(CartWithItems { cart, items })
    }

    /// Applies a coupon code to the cart. Ineligible or unknown codes are not
    /// errors: the outcome carries `applied = false` and a user-facing
    /// message, and the cart is left untouched. Eligible codes persist the
    /// coupon reference, the discount, and the discounted total.
    #[instrument(skip(self))]
    pub async fn apply_coupon_code(
        &self,
        user_id: Uuid,
        cart_id: Uuid,
        code: &str,
    ) -> Result<(cart::Model, ExposedCouponResult), ServiceError> {
        let cart = self.owned_cart(user_id, cart_id).await?;

        let Some(matched) = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?
        else {
            return Ok((cart, ExposedCouponResult::not_applied("Invalid coupon code")));
        };

        let outcome =
            self.evaluator
                .apply_coupon(CartTotals::of_cart(&cart), Some(&matched), Utc::now());
        if !outcome.result.applied {
            return Ok((cart, outcome.result));
        }

        let mut active: cart::ActiveModel = cart.into();
        active.coupon_id = Set(Some(matched.id));
        active.discount = Set(outcome.result.discounted_amount.unwrap_or(Decimal::ZERO));
        active.total = Set(outcome.discounted_total);
        active.updated_at = Set(Utc::now());
        let cart = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::CouponApplied {
                cart_id,
                coupon_id: matched.id,
            })
            .await;

        info!(
            cart_id = %cart_id,
            coupon = %matched.code,
            total = %cart.total,
            "Coupon applied to cart"
        );
        Ok((cart, outcome.result))
    }

    async fn owned_cart(&self, user_id: Uuid, cart_id: Uuid) -> Result<cart::Model, ServiceError> {
        Cart::find_by_id(cart_id)
            .filter(cart::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {cart_id} not found")))
    }
}

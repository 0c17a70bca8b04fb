use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One purchasable line in a cart.
///
/// `external_id` links the line to the upstream catalogue; `None` means no
/// catalogue linkage. Within one cart, `external_id` identifies a line for
/// reconciliation diffing. `recommended` marks up-sell suggestions the system
/// added on its own; such lines never contribute to cart totals.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cart_id: Uuid,
    #[sea_orm(nullable)]
    pub external_id: Option<String>,
    pub name: String,
    pub description: String,
    #[sea_orm(column_type = "Json")]
    pub image_urls: Json,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub original_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discounted_price: Decimal,
    pub stock_status: StockStatus,
    pub weight: f64,
    pub weight_unit: String,
    pub recommended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id"
    )]
    Cart,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Stock availability bucket, used for urgency messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum StockStatus {
    #[sea_orm(string_value = "OUT_OF_STOCK")]
    OutOfStock,
    #[sea_orm(string_value = "VERY_LIMITED_STOCK")]
    VeryLimitedStock,
    #[sea_orm(string_value = "IN_STOCK")]
    InStock,
}

impl StockStatus {
    /// Lenient parse for wire values; unknown strings fall back to `InStock`.
    /// The field is display-only, pricing never reads it.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "OUT_OF_STOCK" => StockStatus::OutOfStock,
            "VERY_LIMITED_STOCK" => StockStatus::VeryLimitedStock,
            _ => StockStatus::InStock,
        }
    }
}

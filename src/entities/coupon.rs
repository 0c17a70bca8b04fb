use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Promotional code with eligibility constraints.
///
/// `applied_user_ids` is an append-only audit trail of redeeming users, not a
/// one-per-user enforcement. Administrative create/update flows live outside
/// this crate; the payment-verification collaborator drives the usage
/// increment through `CouponService::record_redemption`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    /// "PERCENTAGE", "FLAT", "FIXED"; anything else evaluates as a no-op
    pub discount_type: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub minimum_order_value: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub maximum_order_value: Option<Decimal>,
    pub usage_limit: i32,
    pub usage_count: i32,
    #[sea_orm(column_type = "Json")]
    pub applied_user_ids: Json,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart::Entity")]
    Carts,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

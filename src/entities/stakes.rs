//! SeaORM Entity for stakes
//!
//! Immutable except for `status`, which moves locked -> unlockable -> unstaked.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stakes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    /// EUR amount locked
    pub amount: Decimal,
    /// Lock period in days (30, 90 or 365)
    pub period: i32,
    /// APY in percent for the chosen period
    pub apy: Decimal,
    pub start_date: DateTimeWithTimeZone,
    pub unlock_date: DateTimeWithTimeZone,
    /// amount * apy * period/365, fixed at creation
    pub projected_reward: Decimal,
    /// "locked" | "unlockable" | "unstaked"
    pub status: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! SeaORM Entity for user profiles
//!
//! Identity and display metadata plus credential material for sign-in.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub full_name: Option<String>,
    /// Hex-encoded salted blake3 digest of the password
    pub password_hash: String,
    pub password_salt: String,
    /// Sign-up leaves this false until the first successful sign-in
    pub confirmed: bool,
    pub created_at: DateTimeWithTimeZone,
    pub last_sign_in_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

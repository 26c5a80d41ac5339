pub use super::investments::Entity as Investments;
pub use super::profiles::Entity as Profiles;
pub use super::stakes::Entity as Stakes;

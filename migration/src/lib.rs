pub use sea_orm_migration::prelude::*;

mod m20260810_000001_create_profiles;
mod m20260810_000002_create_investments;
mod m20260810_000003_create_stakes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260810_000001_create_profiles::Migration),
            Box::new(m20260810_000002_create_investments::Migration),
            Box::new(m20260810_000003_create_stakes::Migration),
        ]
    }
}

//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`
//! so the schema always matches the Rust structs; the few constraints an entity cannot
//! express (partial unique indexes) are added with plain SQL afterwards.

use crate::entities::{
    Beneficiary, Disbursement, Donation, Group, Payer, PayerName, Session, Subdivision, User,
    ZakatRate,
};
use crate::errors::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Establishes a pooled connection to the database at `database_url`.
#[instrument(skip(database_url))]
pub async fn create_connection(database_url: &str, pool_size: u32) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(pool_size.max(1))
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    debug!("Connecting to database");
    Database::connect(options).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Tables are created parents-first so the foreign keys generated from the
/// `belongs_to` relations always point at an existing table.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Session).await?;
    create_table(db, &schema, Group).await?;
    create_table(db, &schema, Subdivision).await?;
    create_table(db, &schema, ZakatRate).await?;
    create_table(db, &schema, Payer).await?;
    create_table(db, &schema, PayerName).await?;
    create_table(db, &schema, Donation).await?;
    create_table(db, &schema, Beneficiary).await?;
    create_table(db, &schema, Disbursement).await?;

    // At most one change-tracking donation per payer.
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_donations_change_per_payer \
         ON donations (payer_id) WHERE source = 'change'",
    )
    .await?;
    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_payers_subdivision ON payers (subdivision_id)",
    )
    .await?;
    db.execute_unprepared(
        "CREATE INDEX IF NOT EXISTS idx_disbursements_kind_status ON disbursements (kind, status)",
    )
    .await?;

    info!("Database tables ensured");
    Ok(())
}

/// Connects and makes sure the schema exists. Used by the binary and by tests.
pub async fn connect_and_migrate(database_url: &str, pool_size: u32) -> Result<DatabaseConnection> {
    let db = create_connection(database_url, pool_size).await?;
    create_tables(&db).await?;
    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        disbursement::Model as DisbursementModel, donation::Model as DonationModel,
        payer::Model as PayerModel, user::Model as UserModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<PayerModel> = Payer::find().limit(1).all(&db).await?;
        let _: Vec<DonationModel> = Donation::find().limit(1).all(&db).await?;
        let _: Vec<DisbursementModel> = Disbursement::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}

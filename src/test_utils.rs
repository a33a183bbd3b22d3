//! Shared test utilities for the zakat ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        auth,
        beneficiary::{self, BeneficiaryInput},
        obligation::RateSelection,
        payer::{self, PayerInput, PayerNameInput, PayerRecord},
        subdivision::{self, SubdivisionInput},
        zakat_rate::{self, RateInput},
    },
    entities::{self, Role},
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Password every test user is created with
pub const TEST_PASSWORD: &str = "rahasia123";

/// Common rows most ledger tests need
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Committee member recording the payments
    pub user: entities::user::Model,
    /// RT the payers live in
    pub subdivision: entities::subdivision::Model,
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user with the given phone and role.
///
/// # Defaults
/// * name: "Panitia Test" (or "Admin Test" for admins)
/// * password: [`TEST_PASSWORD`]
pub async fn create_test_user(
    db: &DatabaseConnection,
    phone: &str,
    role: Role,
) -> Result<entities::user::Model> {
    let name = match role {
        Role::Admin => "Admin Test",
        Role::Panitia => "Panitia Test",
    };
    auth::create_user(
        db,
        auth::NewUser {
            name: name.to_string(),
            phone: phone.to_string(),
            password: TEST_PASSWORD.to_string(),
            role,
        },
    )
    .await
}

/// Creates a master rate.
pub async fn create_test_rate(
    db: &DatabaseConnection,
    name: &str,
    unit_price: f64,
    unit_weight_kg: f64,
) -> Result<entities::zakat_rate::Model> {
    zakat_rate::create_rate(
        db,
        RateInput {
            name: name.to_string(),
            unit_price,
            unit_weight_kg,
        },
        None,
    )
    .await
}

/// Creates an RT with the given number and no RW.
pub async fn create_test_subdivision(
    db: &DatabaseConnection,
    number: &str,
) -> Result<entities::subdivision::Model> {
    subdivision::create_subdivision(
        db,
        SubdivisionInput {
            number: number.to_string(),
            leader: "Pak RT".to_string(),
            note: None,
            group_id: None,
        },
    )
    .await
}

/// Creates a beneficiary in the given RT.
///
/// # Defaults
/// * category: "fakir"
pub async fn create_test_beneficiary(
    db: &DatabaseConnection,
    name: &str,
    subdivision_id: Option<i64>,
) -> Result<entities::beneficiary::Model> {
    beneficiary::create_beneficiary(
        db,
        BeneficiaryInput {
            name: name.to_string(),
            category: "fakir".to_string(),
            subdivision_id,
        },
    )
    .await
}

/// Records a payer named "Ahmad" in the fixture's RT.
pub async fn create_test_payer(
    db: &DatabaseConnection,
    fixture: &Fixture,
    rate: RateSelection,
    headcount: i32,
    amount_paid: f64,
) -> Result<PayerRecord> {
    payer::create_payer(
        db,
        PayerInput {
            subdivision_id: fixture.subdivision.id,
            headcount,
            rate,
            amount_paid,
            note: None,
            names: vec![PayerNameInput {
                full_name: "Ahmad".to_string(),
                patronymic: None,
                parent_name: None,
            }],
        },
        fixture.user.id,
    )
    .await
}

/// Sets up a database with one committee member and one RT ("RT 01").
/// Returns (db, fixture) for ledger tests.
pub async fn setup_with_subdivision() -> Result<(DatabaseConnection, Fixture)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "081200000001", Role::Panitia).await?;
    let subdivision = create_test_subdivision(&db, "RT 01").await?;
    Ok((db, Fixture { user, subdivision }))
}

//! Master zakat rate business logic - CRUD for selectable rates and seeding.

use crate::{
    config::rates::RateConfig,
    core::obligation::{Rate, RateSelection},
    entities::{Payer, ZakatRate, payer, zakat_rate},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tracing::info;

/// Fields a client submits to create or update a rate
#[derive(Debug, Clone, Deserialize)]
pub struct RateInput {
    /// Display name
    pub name: String,
    /// Price per head in rupiah
    pub unit_price: f64,
    /// Rice weight per head, 0 for money rates
    #[serde(default)]
    pub unit_weight_kg: f64,
}

fn validate(input: &RateInput) -> Result<String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::validation("Rate name cannot be empty"));
    }
    if !input.unit_price.is_finite() || input.unit_price <= 0.0 {
        return Err(Error::validation("Unit price must be greater than 0"));
    }
    if !input.unit_weight_kg.is_finite() || input.unit_weight_kg < 0.0 {
        return Err(Error::validation("Unit weight cannot be negative"));
    }
    Ok(name.to_string())
}

/// Lists all rates ordered by name.
pub async fn list_rates(db: &DatabaseConnection) -> Result<Vec<zakat_rate::Model>> {
    ZakatRate::find()
        .order_by_asc(zakat_rate::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a rate by id.
pub async fn get_rate_by_id<C>(db: &C, rate_id: i64) -> Result<Option<zakat_rate::Model>>
where
    C: ConnectionTrait,
{
    ZakatRate::find_by_id(rate_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Resolves a client's rate selection into numbers and the rate id to store.
///
/// # Errors
/// Returns [`Error::Validation`] when the selected master rate does not exist.
pub async fn resolve_selection<C>(db: &C, selection: RateSelection) -> Result<(Rate, Option<i64>)>
where
    C: ConnectionTrait,
{
    match selection {
        RateSelection::Legacy { legacy } => Ok((Rate::Legacy(legacy), None)),
        RateSelection::Master { rate_id } => {
            let rate = get_rate_by_id(db, rate_id)
                .await?
                .ok_or_else(|| Error::validation(format!("Zakat rate {rate_id} does not exist")))?;
            Ok((Rate::from(&rate), Some(rate.id)))
        }
    }
}

/// Creates a rate on behalf of `user_id`.
pub async fn create_rate(
    db: &DatabaseConnection,
    input: RateInput,
    user_id: Option<i64>,
) -> Result<zakat_rate::Model> {
    let name = validate(&input)?;
    let now = chrono::Utc::now();

    let rate = zakat_rate::ActiveModel {
        name: Set(name),
        unit_price: Set(input.unit_price),
        unit_weight_kg: Set(input.unit_weight_kg),
        created_by: Set(user_id),
        updated_by: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(rate_id = rate.id, name = %rate.name, "Created zakat rate");
    Ok(rate)
}

/// Updates a rate. Existing payers keep the amounts they were recorded with.
pub async fn update_rate(
    db: &DatabaseConnection,
    rate_id: i64,
    input: RateInput,
    user_id: Option<i64>,
) -> Result<zakat_rate::Model> {
    let name = validate(&input)?;
    let rate = get_rate_by_id(db, rate_id)
        .await?
        .ok_or_else(|| Error::not_found("Zakat rate", rate_id))?;

    let mut rate: zakat_rate::ActiveModel = rate.into();
    rate.name = Set(name);
    rate.unit_price = Set(input.unit_price);
    rate.unit_weight_kg = Set(input.unit_weight_kg);
    rate.updated_by = Set(user_id);
    rate.updated_at = Set(chrono::Utc::now());
    rate.update(db).await.map_err(Into::into)
}

/// Deletes a rate, detaching the payers that referenced it.
pub async fn delete_rate(db: &DatabaseConnection, rate_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let rate = get_rate_by_id(&txn, rate_id)
        .await?
        .ok_or_else(|| Error::not_found("Zakat rate", rate_id))?;

    let detached = Payer::update_many()
        .col_expr(payer::Column::RateId, Expr::value(Option::<i64>::None))
        .filter(payer::Column::RateId.eq(rate_id))
        .exec(&txn)
        .await?;

    rate.delete(&txn).await?;
    txn.commit().await?;

    info!(
        rate_id,
        detached_payers = detached.rows_affected,
        "Deleted zakat rate"
    );
    Ok(())
}

/// Inserts the configured rates when the table is still empty.
///
/// Returns the number of rates inserted.
pub async fn seed_rates(db: &DatabaseConnection, rates: &[RateConfig]) -> Result<usize> {
    if ZakatRate::find().count(db).await? > 0 {
        return Ok(0);
    }

    for rate in rates {
        create_rate(
            db,
            RateInput {
                name: rate.name.clone(),
                unit_price: rate.unit_price,
                unit_weight_kg: rate.unit_weight_kg,
            },
            None,
        )
        .await?;
    }
    Ok(rates.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::ZakatKind;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_rate_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let empty_name = RateInput {
            name: "  ".to_string(),
            unit_price: 45_000.0,
            unit_weight_kg: 0.0,
        };
        assert!(matches!(
            create_rate(&db, empty_name, None).await,
            Err(Error::Validation { .. })
        ));

        let zero_price = RateInput {
            name: "Uang".to_string(),
            unit_price: 0.0,
            unit_weight_kg: 0.0,
        };
        assert!(matches!(
            create_rate(&db, zero_price, None).await,
            Err(Error::Validation { .. })
        ));

        let negative_weight = RateInput {
            name: "Beras".to_string(),
            unit_price: 45_000.0,
            unit_weight_kg: -1.0,
        };
        assert!(matches!(
            create_rate(&db, negative_weight, None).await,
            Err(Error::Validation { .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_selection() -> Result<()> {
        let db = setup_test_db().await?;
        let rice = create_test_rate(&db, "Beras Standar", 45_000.0, 2.5).await?;

        let (rate, rate_id) =
            resolve_selection(&db, RateSelection::Master { rate_id: rice.id }).await?;
        assert_eq!(rate.kind(), ZakatKind::Rice);
        assert_eq!(rate_id, Some(rice.id));

        let (rate, rate_id) = resolve_selection(
            &db,
            RateSelection::Legacy {
                legacy: ZakatKind::Money,
            },
        )
        .await?;
        assert_eq!(rate, Rate::Legacy(ZakatKind::Money));
        assert_eq!(rate_id, None);

        let missing = resolve_selection(&db, RateSelection::Master { rate_id: 999 }).await;
        assert!(matches!(missing, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_rate() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "08111", crate::entities::Role::Admin).await?;
        let rate = create_test_rate(&db, "Uang Standar", 45_000.0, 0.0).await?;

        let updated = update_rate(
            &db,
            rate.id,
            RateInput {
                name: "Uang 2025".to_string(),
                unit_price: 47_000.0,
                unit_weight_kg: 0.0,
            },
            Some(user.id),
        )
        .await?;
        assert_eq!(updated.name, "Uang 2025");
        assert_eq!(updated.unit_price, 47_000.0);
        assert_eq!(updated.updated_by, Some(user.id));

        delete_rate(&db, rate.id).await?;
        assert!(get_rate_by_id(&db, rate.id).await?.is_none());

        let missing = delete_rate(&db, rate.id).await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_rate_detaches_payers() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rate = create_test_rate(&db, "Uang Standar", 45_000.0, 0.0).await?;
        let payer =
            create_test_payer(&db, &fixture, RateSelection::Master { rate_id: rate.id }, 1, 45_000.0)
                .await?;
        assert_eq!(payer.payer.rate_id, Some(rate.id));

        delete_rate(&db, rate.id).await?;

        let reloaded = Payer::find_by_id(payer.payer.id).one(&db).await?.unwrap();
        assert_eq!(reloaded.rate_id, None);
        assert_eq!(reloaded.money_amount, Some(45_000.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_rates_only_once() -> Result<()> {
        let db = setup_test_db().await?;
        let rates = crate::config::rates::SeedConfig::default().rates;

        assert_eq!(seed_rates(&db, &rates).await?, 2);
        assert_eq!(seed_rates(&db, &rates).await?, 0);
        assert_eq!(list_rates(&db).await?.len(), 2);
        Ok(())
    }
}

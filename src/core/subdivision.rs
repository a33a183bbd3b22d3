//! RT business logic - CRUD with uniqueness and referential guards.

use crate::{
    entities::{Beneficiary, Group, Payer, Subdivision, beneficiary, payer, subdivision},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Fields a client submits to create or update an RT
#[derive(Debug, Clone, Deserialize)]
pub struct SubdivisionInput {
    /// RT number (e.g., "RT 03")
    pub number: String,
    /// Name of the RT head
    pub leader: String,
    /// Free-form note
    #[serde(default)]
    pub note: Option<String>,
    /// RW the RT belongs to
    #[serde(default)]
    pub group_id: Option<i64>,
}

struct Cleaned {
    number: String,
    leader: String,
    note: Option<String>,
}

fn validate(input: &SubdivisionInput) -> Result<Cleaned> {
    let number = input.number.trim();
    let leader = input.leader.trim();
    if number.is_empty() || leader.is_empty() {
        return Err(Error::validation("RT number and RT head are required"));
    }
    Ok(Cleaned {
        number: number.to_string(),
        leader: leader.to_string(),
        note: crate::core::payer::clean_optional(input.note.as_deref()),
    })
}

async fn ensure_unique(db: &DatabaseConnection, number: &str, except: Option<i64>) -> Result<()> {
    let mut query = Subdivision::find().filter(subdivision::Column::Number.eq(number));
    if let Some(id) = except {
        query = query.filter(subdivision::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(Error::conflict(format!("{number} is already registered")));
    }
    Ok(())
}

async fn ensure_group(db: &DatabaseConnection, group_id: Option<i64>) -> Result<()> {
    if let Some(group_id) = group_id {
        if Group::find_by_id(group_id).one(db).await?.is_none() {
            return Err(Error::validation(format!("RW {group_id} does not exist")));
        }
    }
    Ok(())
}

/// Lists all RTs ordered by number.
pub async fn list_subdivisions(db: &DatabaseConnection) -> Result<Vec<subdivision::Model>> {
    Subdivision::find()
        .order_by_asc(subdivision::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an RT by id.
pub async fn get_subdivision(db: &DatabaseConnection, id: i64) -> Result<Option<subdivision::Model>> {
    Subdivision::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Registers a new RT.
pub async fn create_subdivision(
    db: &DatabaseConnection,
    input: SubdivisionInput,
) -> Result<subdivision::Model> {
    let cleaned = validate(&input)?;
    ensure_unique(db, &cleaned.number, None).await?;
    ensure_group(db, input.group_id).await?;

    let rt = subdivision::ActiveModel {
        number: Set(cleaned.number),
        leader: Set(cleaned.leader),
        note: Set(cleaned.note),
        group_id: Set(input.group_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(subdivision_id = rt.id, number = %rt.number, "Created RT");
    Ok(rt)
}

/// Updates an RT.
pub async fn update_subdivision(
    db: &DatabaseConnection,
    id: i64,
    input: SubdivisionInput,
) -> Result<subdivision::Model> {
    let cleaned = validate(&input)?;
    let rt = get_subdivision(db, id)
        .await?
        .ok_or_else(|| Error::not_found("RT", id))?;
    ensure_unique(db, &cleaned.number, Some(id)).await?;
    ensure_group(db, input.group_id).await?;

    let mut rt: subdivision::ActiveModel = rt.into();
    rt.number = Set(cleaned.number);
    rt.leader = Set(cleaned.leader);
    rt.note = Set(cleaned.note);
    rt.group_id = Set(input.group_id);
    rt.update(db).await.map_err(Into::into)
}

/// Deletes an RT that no payer or beneficiary references.
///
/// # Errors
/// [`Error::Conflict`] while payers or beneficiaries still belong to the RT.
pub async fn delete_subdivision(db: &DatabaseConnection, id: i64) -> Result<()> {
    let rt = get_subdivision(db, id)
        .await?
        .ok_or_else(|| Error::not_found("RT", id))?;

    let payers = Payer::find()
        .filter(payer::Column::SubdivisionId.eq(id))
        .count(db)
        .await?;
    if payers > 0 {
        return Err(Error::conflict(format!(
            "{} still has {payers} payer(s)",
            rt.number
        )));
    }

    let beneficiaries = Beneficiary::find()
        .filter(beneficiary::Column::SubdivisionId.eq(id))
        .count(db)
        .await?;
    if beneficiaries > 0 {
        return Err(Error::conflict(format!(
            "{} still has {beneficiaries} beneficiar(ies)",
            rt.number
        )));
    }

    rt.delete(db).await?;
    info!(subdivision_id = id, "Deleted RT");
    Ok(())
}

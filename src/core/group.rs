//! RW business logic - CRUD with uniqueness and referential guards.

use crate::{
    core::payer::clean_optional,
    entities::{Group, Subdivision, group, subdivision},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Fields a client submits to create or update an RW
#[derive(Debug, Clone, Deserialize)]
pub struct GroupInput {
    /// RW number (e.g., "RW 01")
    pub number: String,
    /// Name of the RW head
    pub leader: String,
    /// Free-form note
    #[serde(default)]
    pub note: Option<String>,
}

fn validate(input: &GroupInput) -> Result<(String, String)> {
    let number = input.number.trim();
    let leader = input.leader.trim();
    if number.is_empty() || leader.is_empty() {
        return Err(Error::validation("RW number and RW head are required"));
    }
    Ok((number.to_string(), leader.to_string()))
}

async fn ensure_unique(db: &DatabaseConnection, number: &str, except: Option<i64>) -> Result<()> {
    let mut query = Group::find().filter(group::Column::Number.eq(number));
    if let Some(id) = except {
        query = query.filter(group::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(Error::conflict(format!("{number} is already registered")));
    }
    Ok(())
}

/// Lists all RWs ordered by number.
pub async fn list_groups(db: &DatabaseConnection) -> Result<Vec<group::Model>> {
    Group::find()
        .order_by_asc(group::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an RW by id.
pub async fn get_group(db: &DatabaseConnection, id: i64) -> Result<Option<group::Model>> {
    Group::find_by_id(id).one(db).await.map_err(Into::into)
}

/// RTs that belong to an RW, ordered by number.
pub async fn subdivisions_of(db: &DatabaseConnection, id: i64) -> Result<Vec<subdivision::Model>> {
    Subdivision::find()
        .filter(subdivision::Column::GroupId.eq(id))
        .order_by_asc(subdivision::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a new RW.
pub async fn create_group(db: &DatabaseConnection, input: GroupInput) -> Result<group::Model> {
    let (number, leader) = validate(&input)?;
    ensure_unique(db, &number, None).await?;

    let rw = group::ActiveModel {
        number: Set(number),
        leader: Set(leader),
        note: Set(clean_optional(input.note.as_deref())),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(group_id = rw.id, number = %rw.number, "Created RW");
    Ok(rw)
}

/// Updates an RW.
pub async fn update_group(
    db: &DatabaseConnection,
    id: i64,
    input: GroupInput,
) -> Result<group::Model> {
    let (number, leader) = validate(&input)?;
    let rw = get_group(db, id)
        .await?
        .ok_or_else(|| Error::not_found("RW", id))?;
    ensure_unique(db, &number, Some(id)).await?;

    let mut rw: group::ActiveModel = rw.into();
    rw.number = Set(number);
    rw.leader = Set(leader);
    rw.note = Set(clean_optional(input.note.as_deref()));
    rw.update(db).await.map_err(Into::into)
}

/// Deletes an RW that no RT belongs to.
///
/// # Errors
/// [`Error::Conflict`] while RTs still reference the RW.
pub async fn delete_group(db: &DatabaseConnection, id: i64) -> Result<()> {
    let rw = get_group(db, id)
        .await?
        .ok_or_else(|| Error::not_found("RW", id))?;

    let children = Subdivision::find()
        .filter(subdivision::Column::GroupId.eq(id))
        .count(db)
        .await?;
    if children > 0 {
        return Err(Error::conflict(format!(
            "{} still has {children} RT(s)",
            rw.number
        )));
    }

    rw.delete(db).await?;
    info!(group_id = id, "Deleted RW");
    Ok(())
}

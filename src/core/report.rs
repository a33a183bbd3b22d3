//! Report generation business logic.
//!
//! Aggregates are computed in Rust from the loaded rows. Rice obligations are
//! valued in rupiah with the configured price per kilogram so rice and money
//! payers can be summed together; a payer is settled once the amount paid
//! covers that valued obligation.

use crate::{
    core::{donation::total_donations, payer::display_names},
    entities::{
        Group, Payer, PayerName, Subdivision, ZakatKind, group, payer, payer_name, subdivision,
    },
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

/// Number of payers shown on the dashboard
pub const RECENT_PAYERS: u64 = 5;

/// Number of RTs shown on the dashboard
pub const DASHBOARD_SUBDIVISIONS: usize = 10;

/// A payer's obligation in rupiah.
///
/// Money obligations are taken as recorded; rice obligations are valued at
/// `rice_price_per_kg`.
#[must_use]
pub fn valued_obligation(payer: &payer::Model, rice_price_per_kg: f64) -> f64 {
    match payer.zakat_kind {
        ZakatKind::Money => payer.money_amount.unwrap_or(0.0),
        ZakatKind::Rice => payer.rice_kg.unwrap_or(0.0) * rice_price_per_kg,
    }
}

/// Whether the amount paid covers the valued obligation.
///
/// Legacy rice payers hand over kilograms, which are compared against the
/// rupiah value, so they always count as unsettled.
#[must_use]
pub fn is_settled(payer: &payer::Model, rice_price_per_kg: f64) -> bool {
    payer.amount_paid >= valued_obligation(payer, rice_price_per_kg)
}

/// Per-RT collection statistics
#[derive(Debug, Clone, Serialize)]
pub struct SubdivisionStats {
    /// The RT
    #[serde(flatten)]
    pub subdivision: subdivision::Model,
    /// Number of payers
    pub payer_count: u64,
    /// Sum of valued obligations
    pub total_zakat: f64,
    /// Payers whose payment covers the obligation
    pub settled: u64,
    /// Payers who paid less than the obligation
    pub unsettled: u64,
}

/// A payer with its display names and valuation
#[derive(Debug, Clone, Serialize)]
pub struct PayerSummary {
    /// The payer row
    #[serde(flatten)]
    pub payer: payer::Model,
    /// Names joined for display
    pub names: String,
    /// RT number
    pub subdivision_number: Option<String>,
    /// Obligation in rupiah
    pub valued_obligation: f64,
    /// Whether the payment covers the obligation
    pub settled: bool,
}

/// Dashboard figures
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Number of payers
    pub payer_count: u64,
    /// Sum of valued obligations
    pub total_zakat: f64,
    /// Payers who paid less than the obligation
    pub unsettled_count: u64,
    /// Sum of all donations
    pub total_donations: f64,
    /// Most recently recorded payers
    pub recent_payers: Vec<PayerSummary>,
    /// First RTs by number, with statistics
    pub subdivisions: Vec<SubdivisionStats>,
}

/// One row of the per-RT report
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubdivisionReportRow {
    /// RT number
    pub number: String,
    /// RT head
    pub leader: String,
    /// Number of payers
    pub payer_count: u64,
    /// Rice owed by rice payers, in kilograms
    pub rice_kg: f64,
    /// Money owed by money payers, in rupiah
    pub money_obligation: f64,
    /// Everything handed over
    pub total_paid: f64,
    /// Outstanding change
    pub total_change: f64,
}

/// Per-RT report with the donation total
#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    /// One row per RT, ordered by number
    pub rows: Vec<SubdivisionReportRow>,
    /// Sum of all donations
    pub total_donations: f64,
}

/// Totals shown on an RT detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailTotals {
    /// Number of payers
    pub payer_count: u64,
    /// Sum of valued obligations
    pub total_zakat: f64,
    /// Everything handed over
    pub total_paid: f64,
    /// Outstanding change
    pub total_change: f64,
    /// Payers whose payment covers the obligation
    pub settled: u64,
    /// Payers who paid less than the obligation
    pub unsettled: u64,
}

/// An RT with its payers
#[derive(Debug, Clone, Serialize)]
pub struct SubdivisionDetail {
    /// The RT
    pub subdivision: subdivision::Model,
    /// Its payers, ordered by name
    pub payers: Vec<PayerSummary>,
    /// Totals over the payers
    pub totals: DetailTotals,
}

/// An RW with statistics for each of its RTs
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    /// The RW
    pub group: group::Model,
    /// Its RTs, ordered by number
    pub subdivisions: Vec<SubdivisionStats>,
}

fn stats_for(
    subdivision: subdivision::Model,
    payers: &[&payer::Model],
    rice_price_per_kg: f64,
) -> SubdivisionStats {
    let settled = payers
        .iter()
        .filter(|p| is_settled(p, rice_price_per_kg))
        .count() as u64;
    SubdivisionStats {
        subdivision,
        payer_count: payers.len() as u64,
        total_zakat: payers
            .iter()
            .map(|p| valued_obligation(p, rice_price_per_kg))
            .sum(),
        settled,
        unsettled: payers.len() as u64 - settled,
    }
}

async fn names_by_payer<C>(db: &C, payer_ids: Vec<i64>) -> Result<HashMap<i64, Vec<payer_name::Model>>>
where
    C: ConnectionTrait,
{
    let mut names: HashMap<i64, Vec<payer_name::Model>> = HashMap::new();
    for name in PayerName::find()
        .filter(payer_name::Column::PayerId.is_in(payer_ids))
        .order_by_asc(payer_name::Column::Id)
        .all(db)
        .await?
    {
        names.entry(name.payer_id).or_default().push(name);
    }
    Ok(names)
}

fn summarize(
    payer: payer::Model,
    names: &HashMap<i64, Vec<payer_name::Model>>,
    subdivision_number: Option<String>,
    rice_price_per_kg: f64,
) -> PayerSummary {
    PayerSummary {
        names: names
            .get(&payer.id)
            .map(|n| display_names(n))
            .unwrap_or_default(),
        subdivision_number,
        valued_obligation: valued_obligation(&payer, rice_price_per_kg),
        settled: is_settled(&payer, rice_price_per_kg),
        payer,
    }
}

/// Statistics for every RT in `subdivisions`, keeping their order.
async fn stats_for_subdivisions(
    db: &DatabaseConnection,
    subdivisions: Vec<subdivision::Model>,
    rice_price_per_kg: f64,
) -> Result<Vec<SubdivisionStats>> {
    let ids: Vec<i64> = subdivisions.iter().map(|s| s.id).collect();
    let payers = Payer::find()
        .filter(payer::Column::SubdivisionId.is_in(ids))
        .all(db)
        .await?;

    let mut by_subdivision: HashMap<i64, Vec<&payer::Model>> = HashMap::new();
    for payer in &payers {
        by_subdivision.entry(payer.subdivision_id).or_default().push(payer);
    }

    Ok(subdivisions
        .into_iter()
        .map(|s| {
            let payers = by_subdivision.remove(&s.id).unwrap_or_default();
            stats_for(s, &payers, rice_price_per_kg)
        })
        .collect())
}

/// Collection statistics for every RT, ordered by RT number.
pub async fn subdivision_stats(
    db: &DatabaseConnection,
    rice_price_per_kg: f64,
) -> Result<Vec<SubdivisionStats>> {
    let subdivisions = Subdivision::find()
        .order_by_asc(subdivision::Column::Number)
        .all(db)
        .await?;
    stats_for_subdivisions(db, subdivisions, rice_price_per_kg).await
}

/// Builds the dashboard.
pub async fn dashboard(db: &DatabaseConnection, rice_price_per_kg: f64) -> Result<Dashboard> {
    let payers = Payer::find().all(db).await?;
    let unsettled_count = payers
        .iter()
        .filter(|p| !is_settled(p, rice_price_per_kg))
        .count() as u64;
    let total_zakat = payers
        .iter()
        .map(|p| valued_obligation(p, rice_price_per_kg))
        .sum();

    let recent = Payer::find()
        .order_by_desc(payer::Column::CreatedAt)
        .order_by_desc(payer::Column::Id)
        .limit(RECENT_PAYERS)
        .all(db)
        .await?;
    let names = names_by_payer(db, recent.iter().map(|p| p.id).collect()).await?;
    let rt_numbers: HashMap<i64, String> = Subdivision::find()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.number))
        .collect();
    let recent_payers = recent
        .into_iter()
        .map(|p| {
            let number = rt_numbers.get(&p.subdivision_id).cloned();
            summarize(p, &names, number, rice_price_per_kg)
        })
        .collect();

    let mut subdivisions = subdivision_stats(db, rice_price_per_kg).await?;
    subdivisions.truncate(DASHBOARD_SUBDIVISIONS);

    Ok(Dashboard {
        payer_count: payers.len() as u64,
        total_zakat,
        unsettled_count,
        total_donations: total_donations(db).await?,
        recent_payers,
        subdivisions,
    })
}

/// Builds the per-RT collection report.
pub async fn collection_report(db: &DatabaseConnection) -> Result<CollectionReport> {
    let subdivisions = Subdivision::find()
        .order_by_asc(subdivision::Column::Number)
        .all(db)
        .await?;
    let payers = Payer::find().all(db).await?;

    let mut rows: Vec<SubdivisionReportRow> = Vec::with_capacity(subdivisions.len());
    let mut index: HashMap<i64, usize> = HashMap::new();
    for rt in subdivisions {
        index.insert(rt.id, rows.len());
        rows.push(SubdivisionReportRow {
            number: rt.number,
            leader: rt.leader,
            ..Default::default()
        });
    }

    for payer in &payers {
        let Some(row) = index.get(&payer.subdivision_id).and_then(|&i| rows.get_mut(i)) else {
            continue;
        };
        row.payer_count += 1;
        row.rice_kg += payer.rice_kg.unwrap_or(0.0);
        row.money_obligation += payer.money_amount.unwrap_or(0.0);
        row.total_paid += payer.amount_paid;
        row.total_change += payer.change_amount;
    }

    Ok(CollectionReport {
        rows,
        total_donations: total_donations(db).await?,
    })
}

/// Loads an RT with its payers and totals.
pub async fn subdivision_detail(
    db: &DatabaseConnection,
    subdivision_id: i64,
    rice_price_per_kg: f64,
) -> Result<Option<SubdivisionDetail>> {
    let Some(subdivision) = Subdivision::find_by_id(subdivision_id).one(db).await? else {
        return Ok(None);
    };

    let payers = Payer::find()
        .filter(payer::Column::SubdivisionId.eq(subdivision_id))
        .all(db)
        .await?;
    let names = names_by_payer(db, payers.iter().map(|p| p.id).collect()).await?;

    let mut summaries: Vec<PayerSummary> = payers
        .into_iter()
        .map(|p| summarize(p, &names, Some(subdivision.number.clone()), rice_price_per_kg))
        .collect();
    summaries.sort_by(|a, b| a.names.cmp(&b.names));

    let totals = summaries.iter().fold(DetailTotals::default(), |mut acc, s| {
        acc.payer_count += 1;
        acc.total_zakat += s.valued_obligation;
        acc.total_paid += s.payer.amount_paid;
        acc.total_change += s.payer.change_amount;
        if s.settled {
            acc.settled += 1;
        } else {
            acc.unsettled += 1;
        }
        acc
    });

    Ok(Some(SubdivisionDetail {
        subdivision,
        payers: summaries,
        totals,
    }))
}

/// Loads an RW with statistics for its RTs.
pub async fn group_detail(
    db: &DatabaseConnection,
    group_id: i64,
    rice_price_per_kg: f64,
) -> Result<Option<GroupDetail>> {
    let Some(group) = Group::find_by_id(group_id).one(db).await? else {
        return Ok(None);
    };
    let subdivisions = Subdivision::find()
        .filter(subdivision::Column::GroupId.eq(group_id))
        .order_by_asc(subdivision::Column::Number)
        .all(db)
        .await?;

    Ok(Some(GroupDetail {
        group,
        subdivisions: stats_for_subdivisions(db, subdivisions, rice_price_per_kg).await?,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::group::{self, GroupInput};
    use crate::core::obligation::RateSelection;
    use crate::core::subdivision::{self, SubdivisionInput};
    use crate::test_utils::*;

    const RICE_PRICE: f64 = 12_000.0;
    const MONEY: RateSelection = RateSelection::Legacy {
        legacy: ZakatKind::Money,
    };
    const RICE: RateSelection = RateSelection::Legacy {
        legacy: ZakatKind::Rice,
    };

    #[tokio::test]
    async fn test_valuation_and_settlement() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let money = create_test_payer(&db, &fixture, MONEY, 2, 100_000.0).await?;
        // 2.5 kg valued at 30000, paid in rice units only
        let rice = create_test_payer(&db, &fixture, RICE, 1, 2.5).await?;

        assert_eq!(valued_obligation(&money.payer, RICE_PRICE), 90_000.0);
        assert!(is_settled(&money.payer, RICE_PRICE));
        assert_eq!(valued_obligation(&rice.payer, RICE_PRICE), 30_000.0);
        assert!(!is_settled(&rice.payer, RICE_PRICE));

        // Even four times the rice owed stays unsettled
        let generous = create_test_payer(&db, &fixture, RICE, 1, 10.0).await?;
        assert_eq!(generous.payer.change_amount, 7.5);
        assert!(!is_settled(&generous.payer, RICE_PRICE));
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        create_test_subdivision(&db, "RT 02").await?;
        for _ in 0..6 {
            create_test_payer(&db, &fixture, MONEY, 1, 50_000.0).await?;
        }
        create_test_payer(&db, &fixture, RICE, 2, 5.0).await?;

        let dashboard = dashboard(&db, RICE_PRICE).await?;
        assert_eq!(dashboard.payer_count, 7);
        assert_eq!(dashboard.total_zakat, 6.0 * 45_000.0 + 5.0 * RICE_PRICE);
        assert_eq!(dashboard.unsettled_count, 1);
        assert_eq!(dashboard.total_donations, 6.0 * 5_000.0);
        assert_eq!(dashboard.recent_payers.len(), 5);
        assert_eq!(dashboard.recent_payers[0].payer.zakat_kind, ZakatKind::Rice);
        assert_eq!(dashboard.recent_payers[0].names, "Ahmad");
        assert_eq!(dashboard.subdivisions.len(), 2);
        assert_eq!(dashboard.subdivisions[0].payer_count, 7);
        assert_eq!(dashboard.subdivisions[1].payer_count, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_collection_report() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        create_test_subdivision(&db, "RT 02").await?;
        create_test_payer(&db, &fixture, MONEY, 2, 100_000.0).await?;
        create_test_payer(&db, &fixture, RICE, 3, 7.5).await?;
        crate::core::donation::create_manual_donation(&db, 15_000.0, None, None).await?;

        let report = collection_report(&db).await?;
        assert_eq!(report.rows.len(), 2);
        let first = &report.rows[0];
        assert_eq!(first.number, "RT 01");
        assert_eq!(first.payer_count, 2);
        assert_eq!(first.rice_kg, 7.5);
        assert_eq!(first.money_obligation, 90_000.0);
        assert_eq!(first.total_paid, 100_007.5);
        assert_eq!(first.total_change, 10_000.0);
        assert_eq!(report.rows[1].payer_count, 0);
        assert_eq!(report.total_donations, 25_000.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_subdivision_and_group_detail() -> Result<()> {
        let (db, fixture) = setup_with_subdivision().await?;
        let rw = group::create_group(
            &db,
            GroupInput {
                number: "RW 01".to_string(),
                leader: "Pak Hasan".to_string(),
                note: None,
            },
        )
        .await?;
        subdivision::update_subdivision(
            &db,
            fixture.subdivision.id,
            SubdivisionInput {
                number: "RT 01".to_string(),
                leader: "Pak RT".to_string(),
                note: None,
                group_id: Some(rw.id),
            },
        )
        .await?;
        create_test_payer(&db, &fixture, MONEY, 1, 50_000.0).await?;
        create_test_payer(&db, &fixture, MONEY, 2, 45_000.0).await?;

        let detail = subdivision_detail(&db, fixture.subdivision.id, RICE_PRICE)
            .await?
            .unwrap();
        assert_eq!(detail.payers.len(), 2);
        assert_eq!(detail.totals.total_zakat, 135_000.0);
        assert_eq!(detail.totals.total_paid, 95_000.0);
        assert_eq!(detail.totals.total_change, 5_000.0);
        assert_eq!(detail.totals.settled, 1);
        assert_eq!(detail.totals.unsettled, 1);
        assert!(subdivision_detail(&db, 404, RICE_PRICE).await?.is_none());

        let rw_detail = group_detail(&db, rw.id, RICE_PRICE).await?.unwrap();
        assert_eq!(rw_detail.subdivisions.len(), 1);
        assert_eq!(rw_detail.subdivisions[0].payer_count, 2);
        assert_eq!(rw_detail.subdivisions[0].settled, 1);
        assert!(group_detail(&db, 404, RICE_PRICE).await?.is_none());
        Ok(())
    }
}

//! Payer export - one worksheet per RT with a totals row, written as xlsx.

use crate::{
    core::payer::display_names,
    entities::{Payer, PayerName, Subdivision, ZakatKind, payer, payer_name, subdivision},
    errors::{Error, Result},
};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use sea_orm::{QueryOrder, prelude::*};
use std::collections::{HashMap, HashSet};

const HEADER: [&str; 8] = [
    "No",
    "Nama",
    "Jumlah Jiwa",
    "Jenis Zakat",
    "Beras (kg)",
    "Uang (Rp)",
    "Dibayar (Rp)",
    "Kembalian (Rp)",
];

/// One payer in an export sheet
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    /// Names joined for display
    pub names: String,
    /// Number of people covered
    pub headcount: i32,
    /// "beras" or "uang"
    pub kind: &'static str,
    /// Rice owed, in kilograms
    pub rice_kg: f64,
    /// Money owed, in rupiah
    pub money: f64,
    /// Amount handed over
    pub paid: f64,
    /// Outstanding change
    pub change: f64,
}

/// Column sums of a sheet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTotals {
    /// Sum of headcounts
    pub headcount: i64,
    /// Sum of rice, in kilograms
    pub rice_kg: f64,
    /// Sum of money obligations
    pub money: f64,
    /// Sum of amounts handed over
    pub paid: f64,
    /// Sum of outstanding change
    pub change: f64,
}

/// All payers of one RT
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSheet {
    /// Sheet title, e.g. "RT 01"
    pub label: String,
    /// One row per payer, ordered by recording time
    pub rows: Vec<ExportRow>,
    /// Column sums
    pub totals: ExportTotals,
}

/// Collects one sheet per RT, ordered by RT number.
pub async fn export_sheets(db: &DatabaseConnection) -> Result<Vec<ExportSheet>> {
    let subdivisions = Subdivision::find()
        .order_by_asc(subdivision::Column::Number)
        .all(db)
        .await?;
    let payers = Payer::find()
        .order_by_asc(payer::Column::CreatedAt)
        .order_by_asc(payer::Column::Id)
        .all(db)
        .await?;

    let mut names: HashMap<i64, Vec<payer_name::Model>> = HashMap::new();
    for name in PayerName::find()
        .order_by_asc(payer_name::Column::Id)
        .all(db)
        .await?
    {
        names.entry(name.payer_id).or_default().push(name);
    }

    let mut by_subdivision: HashMap<i64, Vec<payer::Model>> = HashMap::new();
    for payer in payers {
        by_subdivision.entry(payer.subdivision_id).or_default().push(payer);
    }

    Ok(subdivisions
        .into_iter()
        .map(|rt| {
            let rows: Vec<ExportRow> = by_subdivision
                .remove(&rt.id)
                .unwrap_or_default()
                .into_iter()
                .map(|p| ExportRow {
                    names: names.get(&p.id).map(|n| display_names(n)).unwrap_or_default(),
                    headcount: p.headcount,
                    kind: match p.zakat_kind {
                        ZakatKind::Rice => "beras",
                        ZakatKind::Money => "uang",
                    },
                    rice_kg: p.rice_kg.unwrap_or(0.0),
                    money: p.money_amount.unwrap_or(0.0),
                    paid: p.amount_paid,
                    change: p.change_amount,
                })
                .collect();

            let totals = rows.iter().fold(ExportTotals::default(), |mut acc, r| {
                acc.headcount += i64::from(r.headcount);
                acc.rice_kg += r.rice_kg;
                acc.money += r.money;
                acc.paid += r.paid;
                acc.change += r.change;
                acc
            });

            ExportSheet {
                label: rt.number,
                rows,
                totals,
            }
        })
        .collect())
}

/// Fallback title for a workbook without any RT
const EMPTY_SHEET: &str = "Data Muzakki";

/// Longest worksheet name Excel accepts
const MAX_SHEET_NAME: usize = 31;

/// Turns an RT label into a worksheet name Excel accepts, unique within `taken`.
fn sheet_name(label: &str, taken: &mut HashSet<String>) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base: String = if cleaned.is_empty() {
        EMPTY_SHEET.to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut name = base.clone();
    let mut n = 2;
    while !taken.insert(name.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        name = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    name
}

fn row_index(i: usize) -> Result<u32> {
    u32::try_from(i).map_err(|_| Error::Export {
        message: "Too many rows for one worksheet".to_string(),
    })
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &ExportSheet, bold: &Format) -> Result<()> {
    for (col, title) in (0_u16..).zip(HEADER) {
        worksheet.write_string_with_format(0, col, title, bold)?;
    }
    worksheet.set_column_width(1, 32)?;

    for (i, row) in sheet.rows.iter().enumerate() {
        let r = row_index(i + 1)?;
        worksheet.write_number(r, 0, row_index(i + 1)?)?;
        worksheet.write_string(r, 1, &row.names)?;
        worksheet.write_number(r, 2, row.headcount)?;
        worksheet.write_string(r, 3, row.kind)?;
        worksheet.write_number(r, 4, row.rice_kg)?;
        worksheet.write_number(r, 5, row.money)?;
        worksheet.write_number(r, 6, row.paid)?;
        worksheet.write_number(r, 7, row.change)?;
    }

    let r = row_index(sheet.rows.len() + 1)?;
    let totals = &sheet.totals;
    worksheet.write_string_with_format(r, 1, "TOTAL", bold)?;
    // Sums stay far below 2^53, so the float is exact
    #[allow(clippy::cast_precision_loss)]
    let headcount = totals.headcount as f64;
    worksheet.write_number_with_format(r, 2, headcount, bold)?;
    worksheet.write_number_with_format(r, 4, totals.rice_kg, bold)?;
    worksheet.write_number_with_format(r, 5, totals.money, bold)?;
    worksheet.write_number_with_format(r, 6, totals.paid, bold)?;
    worksheet.write_number_with_format(r, 7, totals.change, bold)?;
    Ok(())
}

/// Renders the sheets as an xlsx workbook, one worksheet per RT.
///
/// Each worksheet holds the column header, the payer rows and a totals row.
/// A workbook with no RT still gets one empty worksheet.
pub fn write_workbook(sheets: &[ExportSheet]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let mut taken = HashSet::new();

    if sheets.is_empty() {
        let worksheet = workbook.add_worksheet().set_name(EMPTY_SHEET)?;
        for (col, title) in (0_u16..).zip(HEADER) {
            worksheet.write_string_with_format(0, col, title, &bold)?;
        }
    }
    for sheet in sheets {
        let name = sheet_name(&sheet.label, &mut taken);
        let worksheet = workbook.add_worksheet().set_name(name)?;
        write_sheet(worksheet, sheet, &bold)?;
    }

    workbook.save_to_buffer().map_err(Into::into)
}

/// Builds the whole export in memory.
pub async fn export_workbook(db: &DatabaseConnection) -> Result<Vec<u8>> {
    let sheets = export_sheets(db).await?;
    write_workbook(&sheets)
}

/// Attachment name for an export made on `date`
#[must_use]
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("data_muzakki_{}.xlsx", date.format("%Y-%m-%d"))
}

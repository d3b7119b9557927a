use crate::error::Result;
use crate::reports::{PivotTable, ReportTables};
use crate::types::{PerCapitaRecord, TopEntityRow};
use rust_xlsxwriter::{
    Chart, ChartLegendPosition, ChartType, Format, Workbook, Worksheet,
};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

const RAW_SHEET: &str = "Raw_Data";
const RAW_HEADERS: [&str; 12] = [
    "entity",
    "entity_code",
    "year",
    "energy_consumption",
    "renewable_energy_pct",
    "fossil_energy_pct",
    "renewable_energy_consumption",
    "fossil_energy_consumption",
    "population",
    "energy_consumption_per_capita",
    "renewable_energy_per_capita",
    "fossil_energy_per_capita",
];

pub fn write_workbook(path: &str, tables: &ReportTables) -> Result<()> {
    let mut workbook = build_workbook(tables)?;
    workbook.save(path)?;
    Ok(())
}

pub fn build_workbook(tables: &ReportTables) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    write_ranking_sheet(
        &mut workbook,
        "Top_10_Renewable_Max",
        "renewable_energy_per_capita",
        &tables.top_renewable,
        &header,
    )?;
    write_ranking_sheet(
        &mut workbook,
        "Top_10_Fossil_Max",
        "fossil_energy_per_capita",
        &tables.top_fossil,
        &header,
    )?;

    for (idx, pivot) in tables.pivots.iter().enumerate() {
        let sheet = write_pivot_sheet(&mut workbook, pivot, &header)?;
        // The chart goes on the first pivot sheet only.
        if idx == 0 && !pivot.years.is_empty() {
            add_region_chart(sheet, pivot)?;
        }
    }

    write_raw_sheet(&mut workbook, &tables.raw, &header)?;
    Ok(workbook)
}

fn write_ranking_sheet(
    workbook: &mut Workbook,
    name: &str,
    value_header: &str,
    rows: &[TopEntityRow],
    header: &Format,
) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;
    sheet.write_with_format(0, 0, "entity", header)?;
    sheet.write_with_format(0, 1, "year", header)?;
    sheet.write_with_format(0, 2, value_header, header)?;

    for (idx, row) in rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        sheet.write(r, 0, row.entity.as_str())?;
        sheet.write(r, 1, row.year)?;
        sheet.write(r, 2, row.per_capita)?;
    }

    sheet.set_column_width(0, 24)?;
    sheet.set_column_width(2, 28)?;
    Ok(())
}

fn write_pivot_sheet<'a>(
    workbook: &'a mut Workbook,
    pivot: &PivotTable,
    header: &Format,
) -> Result<&'a mut Worksheet> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(pivot.sheet_name)?;
    sheet.write_with_format(0, 0, "year", header)?;
    for (idx, entity) in pivot.entities.iter().enumerate() {
        let col = (idx + 1) as u16;
        sheet.write_with_format(0, col, entity.as_str(), header)?;
        sheet.set_column_width(col, 22)?;
    }

    for (row_idx, year) in pivot.years.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        sheet.write(row, 0, *year)?;
        for (col_idx, value) in pivot.values[row_idx].iter().enumerate() {
            write_metric(sheet, row, (col_idx + 1) as u16, *value)?;
        }
    }

    Ok(sheet)
}

/// Line chart comparing the two region columns across the pivot years,
/// anchored at E2 with the legend below the plot area.
fn add_region_chart(sheet: &mut Worksheet, pivot: &PivotTable) -> Result<()> {
    let last_row = pivot.years.len() as u32;
    let mut chart = Chart::new(ChartType::Line);
    chart
        .title()
        .set_name("NAM vs Iberia: Renewable Energy Per Capita Over Time");

    for idx in 0..pivot.entities.len() {
        let col = (idx + 1) as u16;
        chart
            .add_series()
            .set_name((pivot.sheet_name, 0, col))
            .set_categories((pivot.sheet_name, 1, 0, last_row, 0))
            .set_values((pivot.sheet_name, 1, col, last_row, col));
    }

    chart.legend().set_position(ChartLegendPosition::Bottom);
    sheet.insert_chart(1, 4, &chart)?;
    Ok(())
}

fn write_raw_sheet(
    workbook: &mut Workbook,
    rows: &[PerCapitaRecord],
    header: &Format,
) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(RAW_SHEET)?;
    for (col, name) in RAW_HEADERS.iter().enumerate() {
        sheet.write_with_format(0, col as u16, *name, header)?;
    }

    for (idx, r) in rows.iter().enumerate() {
        let row = (idx + 1) as u32;
        sheet.write(row, 0, r.entity.as_str())?;
        sheet.write(row, 1, r.entity_code.as_str())?;
        sheet.write(row, 2, r.year)?;
        sheet.write(row, 3, r.energy_consumption)?;
        sheet.write(row, 4, r.renewable_energy_pct)?;
        sheet.write(row, 5, r.fossil_energy_pct)?;
        sheet.write(row, 6, r.renewable_energy_consumption)?;
        sheet.write(row, 7, r.fossil_energy_consumption)?;
        if let Some(population) = r.population {
            sheet.write(row, 8, population)?;
        }
        write_metric(sheet, row, 9, r.energy_consumption_per_capita)?;
        write_metric(sheet, row, 10, r.renewable_energy_per_capita)?;
        write_metric(sheet, row, 11, r.fossil_energy_per_capita)?;
    }

    sheet.set_column_width(0, 24)?;
    Ok(())
}

/// XLSX has no representation for non-finite numbers: infinities become
/// the literal strings "inf"/"-inf", NaN and missing values stay blank.
fn write_metric(sheet: &mut Worksheet, row: u32, col: u16, value: Option<f64>) -> Result<()> {
    match value {
        None => {}
        Some(v) if v.is_nan() => {}
        Some(v) if v.is_infinite() => {
            sheet.write(row, col, if v > 0.0 { "inf" } else { "-inf" })?;
        }
        Some(v) => {
            sheet.write(row, col, v)?;
        }
    }
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

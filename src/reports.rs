use crate::checks::CheckOutcome;
use crate::config::EnergyUnit;
use crate::loader::LoadDiagnostics;
use crate::transform::PipelineOutput;
use crate::types::{PerCapitaRecord, TopEntityRow};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

/// The two regions the comparison pivots are restricted to.
pub const PIVOT_REGIONS: [&str; 2] = ["North America", "Iberia"];
/// Window of most recent years shown in the pivots.
pub const PIVOT_YEAR_SPAN: i32 = 10;
const TOP_LIMIT: usize = 10;

/// A metric pivoted with years as rows and entities as columns.
pub struct PivotTable {
    pub sheet_name: &'static str,
    /// Column order, sorted by entity name.
    pub entities: Vec<String>,
    /// Row order, ascending.
    pub years: Vec<i32>,
    /// values[year_idx][entity_idx]; None where no data exists.
    pub values: Vec<Vec<Option<f64>>>,
}

pub struct ReportTables {
    pub top_renewable: Vec<TopEntityRow>,
    pub top_fossil: Vec<TopEntityRow>,
    /// Sheet order: renewable per-capita, fossil percent, consumption
    /// per-capita.
    pub pivots: Vec<PivotTable>,
    pub raw: Vec<PerCapitaRecord>,
    pub latest_year: Option<i32>,
    pub valid_rows: usize,
}

pub fn build_report_tables(per_capita: &[PerCapitaRecord]) -> ReportTables {
    let valid: Vec<&PerCapitaRecord> = per_capita.iter().filter(|r| r.is_valid()).collect();
    let latest_year = latest_year_with_population(per_capita);
    let from_year = latest_year.map(|y| y - (PIVOT_YEAR_SPAN - 1));

    let pivots = vec![
        build_pivot(&valid, "Renewable_Energy_Per_Capita", from_year, |r| {
            r.renewable_energy_per_capita
        }),
        build_pivot(&valid, "Fossil_Energy_Percent", from_year, |r| {
            Some(r.fossil_energy_pct)
        }),
        build_pivot(&valid, "Energy_per_Capita", from_year, |r| {
            r.energy_consumption_per_capita
        }),
    ];

    ReportTables {
        top_renewable: top_entities_by_max(&valid, |r| r.renewable_energy_per_capita, TOP_LIMIT),
        top_fossil: top_entities_by_max(&valid, |r| r.fossil_energy_per_capita, TOP_LIMIT),
        pivots,
        raw: per_capita.to_vec(),
        latest_year,
        valid_rows: valid.len(),
    }
}

/// The reporting window anchors on the latest year for which any entity
/// has a population estimate, not the latest year in the data.
pub fn latest_year_with_population(rows: &[PerCapitaRecord]) -> Option<i32> {
    rows.iter()
        .filter(|r| r.population.is_some())
        .map(|r| r.year)
        .max()
}

/// For each entity, take its own best year for the metric, then rank the
/// entities by that best value and keep the top `limit`.
fn top_entities_by_max(
    valid: &[&PerCapitaRecord],
    metric: impl Fn(&PerCapitaRecord) -> Option<f64>,
    limit: usize,
) -> Vec<TopEntityRow> {
    let mut best: HashMap<&str, (i32, f64)> = HashMap::new();
    for r in valid.iter().copied() {
        let Some(value) = metric(r) else { continue };
        match best.get(r.entity.as_str()) {
            // Strict improvement only, so the earliest row wins a tie.
            Some((_, current)) if *current >= value => {}
            _ => {
                best.insert(r.entity.as_str(), (r.year, value));
            }
        }
    }

    let mut rows: Vec<TopEntityRow> = best
        .into_iter()
        .map(|(entity, (year, per_capita))| TopEntityRow {
            entity: entity.to_string(),
            year,
            per_capita,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.per_capita
            .partial_cmp(&a.per_capita)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entity.cmp(&b.entity))
    });
    rows.truncate(limit);
    rows
}

fn build_pivot(
    valid: &[&PerCapitaRecord],
    sheet_name: &'static str,
    from_year: Option<i32>,
    metric: impl Fn(&PerCapitaRecord) -> Option<f64>,
) -> PivotTable {
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut entities: BTreeSet<String> = BTreeSet::new();
    let mut cells: HashMap<(String, i32), f64> = HashMap::new();

    if let Some(from_year) = from_year {
        for r in valid.iter().copied() {
            if r.year < from_year || !PIVOT_REGIONS.contains(&r.entity.as_str()) {
                continue;
            }
            if let Some(value) = metric(r) {
                years.insert(r.year);
                entities.insert(r.entity.clone());
                cells.insert((r.entity.clone(), r.year), value);
            }
        }
    }

    let entities: Vec<String> = entities.into_iter().collect();
    let years: Vec<i32> = years.into_iter().collect();
    let values = years
        .iter()
        .map(|year| {
            entities
                .iter()
                .map(|entity| cells.get(&(entity.clone(), *year)).copied())
                .collect()
        })
        .collect();

    PivotTable {
        sheet_name,
        entities,
        years,
        values,
    }
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub energy_unit: &'static str,
    pub population_rows: usize,
    pub energy_consumption_rows: usize,
    pub renewable_share_rows: usize,
    pub regional_grouping_rows: usize,
    pub country_rows: usize,
    pub region_rows: usize,
    pub per_capita_rows: usize,
    pub valid_rows: usize,
    pub latest_year_with_population: Option<i32>,
    pub checks: Vec<CheckOutcome>,
}

pub fn build_summary(
    unit: EnergyUnit,
    diagnostics: &LoadDiagnostics,
    output: &PipelineOutput,
    tables: &ReportTables,
    checks: &[CheckOutcome],
) -> RunSummary {
    RunSummary {
        energy_unit: unit.label(),
        population_rows: diagnostics.population_rows_kept,
        energy_consumption_rows: diagnostics.energy_rows,
        renewable_share_rows: diagnostics.renewable_rows,
        regional_grouping_rows: diagnostics.grouping_rows,
        country_rows: output.country_rows,
        region_rows: output.region_rows,
        per_capita_rows: output.per_capita.len(),
        valid_rows: tables.valid_rows,
        latest_year_with_population: tables.latest_year,
        checks: checks.to_vec(),
    }
}

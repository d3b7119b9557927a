use serde::Deserialize;
use tabled::Tabled;

// Raw CSV rows, with field names bound to the source headers. Numeric
// fields deserialize strictly so a malformed cell fails the whole load
// instead of slipping a bad key into the joins.

#[derive(Debug, Deserialize)]
pub struct RawPopulationRow {
    #[serde(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Code")]
    pub code: Option<String>,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "population__sex_all__age_all__variant_estimates")]
    pub population: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawEnergyRow {
    #[serde(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Code")]
    pub code: Option<String>,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "primary_energy_consumption__twh")]
    pub consumption_twh: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawRenewableRow {
    #[serde(rename = "Entity")]
    pub entity: String,
    #[serde(rename = "Code")]
    pub code: Option<String>,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "renewables__pct_equivalent_primary_energy")]
    pub renewable_pct: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawGroupingRow {
    pub entity_code: String,
    pub region_entity_code: String,
    pub region_name: String,
}

// Normalized tables: one metric column each, shared entity/entity_code/year
// key columns.

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationRecord {
    pub entity: String,
    pub entity_code: String,
    pub year: i32,
    pub population: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyConsumptionRecord {
    pub entity: String,
    pub entity_code: String,
    pub year: i32,
    /// In the unit configured for the run (TWh or GWh).
    pub energy_consumption: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenewableShareRecord {
    pub entity: String,
    /// Some source rows (continent aggregates) carry no code.
    pub entity_code: Option<String>,
    pub year: i32,
    /// Fraction in [0, 1]; the source publishes whole-number percentages.
    pub renewable_energy_pct: f64,
}

/// Country-to-region mapping row; each country belongs to exactly one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalGroupingRecord {
    pub entity_code: String,
    pub region_entity_code: String,
    pub region_name: String,
}

/// Consumption split into fossil and renewable components.
///
/// Invariant: fossil_energy_pct + renewable_energy_pct == 1.0 within 1e-6,
/// and the two absolute components sum back to energy_consumption.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyBreakdownRecord {
    pub entity: String,
    pub entity_code: String,
    pub year: i32,
    pub energy_consumption: f64,
    pub renewable_energy_pct: f64,
    pub fossil_energy_pct: f64,
    pub renewable_energy_consumption: f64,
    pub fossil_energy_consumption: f64,
}

/// Breakdown row with population attached. Region rollups share this shape
/// so country and region rows can be concatenated into one table.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownWithPopulation {
    pub entity: String,
    pub entity_code: String,
    pub year: i32,
    pub energy_consumption: f64,
    pub renewable_energy_pct: f64,
    pub fossil_energy_pct: f64,
    pub renewable_energy_consumption: f64,
    pub fossil_energy_consumption: f64,
    /// None when no population estimate exists for (entity, year).
    pub population: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerCapitaRecord {
    pub entity: String,
    pub entity_code: String,
    pub year: i32,
    pub energy_consumption: f64,
    pub renewable_energy_pct: f64,
    pub fossil_energy_pct: f64,
    pub renewable_energy_consumption: f64,
    pub fossil_energy_consumption: f64,
    pub population: Option<i64>,
    pub energy_consumption_per_capita: Option<f64>,
    pub renewable_energy_per_capita: Option<f64>,
    pub fossil_energy_per_capita: Option<f64>,
}

impl PerCapitaRecord {
    /// Rows with a missing or zero population divide into None or infinity;
    /// the rankings and pivots only ever see rows where all three metrics
    /// are present and finite.
    pub fn is_valid(&self) -> bool {
        [
            self.energy_consumption_per_capita,
            self.renewable_energy_per_capita,
            self.fossil_energy_per_capita,
        ]
        .iter()
        .all(|m| m.map_or(false, f64::is_finite))
    }
}

/// One row of a Top-10 ranking sheet: the entity's own best year for the
/// ranked metric.
#[derive(Debug, Clone, Tabled)]
pub struct TopEntityRow {
    #[tabled(rename = "Entity")]
    pub entity: String,
    #[tabled(rename = "Year")]
    pub year: i32,
    #[tabled(rename = "PerCapita", display_with = "crate::util::display_per_capita")]
    pub per_capita: f64,
}

// Post-hoc validation checks over the finished tables. Plausibility is
// advisory; conservation failures mean a join or arithmetic defect and
// block the export.
use crate::config::EnergyUnit;
use crate::types::PerCapitaRecord;
use serde::Serialize;

pub const CONSERVATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub blocking: bool,
    pub violations: usize,
    pub description: String,
}

/// Flag rows whose total per-capita consumption exceeds 0.1 GWh
/// (~100 MWh) per person per year, expressed in the run's unit. Infinite
/// values from zero populations count as violations; missing populations
/// do not.
pub fn per_capita_plausibility(rows: &[PerCapitaRecord], unit: EnergyUnit) -> CheckOutcome {
    let threshold = unit.plausibility_threshold();
    let violations = rows
        .iter()
        .filter(|r| r.energy_consumption_per_capita.map_or(false, |v| v > threshold))
        .count();
    CheckOutcome {
        name: "per_capita_plausibility",
        passed: violations == 0,
        blocking: false,
        violations,
        description: format!(
            "per-capita bounds: {} violations (max allowed: {} {} per person)",
            violations,
            threshold,
            unit.label()
        ),
    }
}

/// The conservation invariant: fossil and renewable shares must sum to
/// 1.0 within tolerance on every row.
pub fn energy_conservation(rows: &[PerCapitaRecord]) -> CheckOutcome {
    let violations = rows
        .iter()
        .filter(|r| (r.fossil_energy_pct + r.renewable_energy_pct - 1.0).abs() > CONSERVATION_TOLERANCE)
        .count();
    CheckOutcome {
        name: "energy_conservation",
        passed: violations == 0,
        blocking: true,
        violations,
        description: format!(
            "energy conservation: {} invalid rows out of {}",
            violations,
            rows.len()
        ),
    }
}

// Stage-boundary schema checks.
//
// Column presence and types are fixed by the record structs at load time;
// what remains are the value-level constraints the type system cannot
// carry: non-empty names, non-negative metrics, shares inside [0, 1].
// Any violation aborts the run with an error naming the stage and column.
use crate::error::{ReportError, Result};
use crate::types::{
    BreakdownWithPopulation, EnergyBreakdownRecord, EnergyConsumptionRecord, PopulationRecord,
    RegionalGroupingRecord, RenewableShareRecord,
};

fn violation(stage: &'static str, column: &'static str, detail: String) -> ReportError {
    ReportError::Schema {
        stage,
        column,
        detail,
    }
}

pub fn check_population(rows: &[PopulationRecord]) -> Result<()> {
    const STAGE: &str = "population";
    for r in rows {
        if r.entity.trim().is_empty() {
            return Err(violation(STAGE, "entity", format!("blank entity name in year {}", r.year)));
        }
        if r.population < 0 {
            return Err(violation(
                STAGE,
                "population",
                format!("negative value {} for {} in {}", r.population, r.entity, r.year),
            ));
        }
    }
    Ok(())
}

pub fn check_energy_consumption(rows: &[EnergyConsumptionRecord]) -> Result<()> {
    const STAGE: &str = "energy_consumption";
    for r in rows {
        if r.entity.trim().is_empty() {
            return Err(violation(STAGE, "entity", format!("blank entity name in year {}", r.year)));
        }
        if !r.energy_consumption.is_finite() || r.energy_consumption < 0.0 {
            return Err(violation(
                STAGE,
                "energy_consumption",
                format!("invalid value {} for {} in {}", r.energy_consumption, r.entity, r.year),
            ));
        }
    }
    Ok(())
}

pub fn check_renewable_share(rows: &[RenewableShareRecord]) -> Result<()> {
    const STAGE: &str = "renewable_share";
    for r in rows {
        if r.entity.trim().is_empty() {
            return Err(violation(STAGE, "entity", format!("blank entity name in year {}", r.year)));
        }
        let pct = r.renewable_energy_pct;
        if !pct.is_finite() || !(0.0..=1.0).contains(&pct) {
            return Err(violation(
                STAGE,
                "renewable_energy_pct",
                format!("share {} outside [0, 1] for {} in {}", pct, r.entity, r.year),
            ));
        }
    }
    Ok(())
}

pub fn check_regional_grouping(rows: &[RegionalGroupingRecord]) -> Result<()> {
    const STAGE: &str = "regional_grouping";
    for r in rows {
        if r.entity_code.trim().is_empty() {
            return Err(violation(STAGE, "entity_code", "blank country code".to_string()));
        }
        if r.region_entity_code.trim().is_empty() {
            return Err(violation(
                STAGE,
                "region_entity_code",
                format!("blank region code for {}", r.entity_code),
            ));
        }
        if r.region_name.trim().is_empty() {
            return Err(violation(
                STAGE,
                "region_name",
                format!("blank region name for {}", r.entity_code),
            ));
        }
    }
    Ok(())
}

pub fn check_breakdown(stage: &'static str, rows: &[EnergyBreakdownRecord]) -> Result<()> {
    for r in rows {
        let absolutes: [(&'static str, f64); 3] = [
            ("energy_consumption", r.energy_consumption),
            ("renewable_energy_consumption", r.renewable_energy_consumption),
            ("fossil_energy_consumption", r.fossil_energy_consumption),
        ];
        for (column, value) in absolutes {
            if !value.is_finite() || value < 0.0 {
                return Err(violation(
                    stage,
                    column,
                    format!("invalid value {} for {} in {}", value, r.entity, r.year),
                ));
            }
        }
        let shares: [(&'static str, f64); 2] = [
            ("renewable_energy_pct", r.renewable_energy_pct),
            ("fossil_energy_pct", r.fossil_energy_pct),
        ];
        for (column, pct) in shares {
            if !pct.is_finite() || !(0.0..=1.0).contains(&pct) {
                return Err(violation(
                    stage,
                    column,
                    format!("share {} outside [0, 1] for {} in {}", pct, r.entity, r.year),
                ));
            }
        }
    }
    Ok(())
}

pub fn check_rollups(stage: &'static str, rows: &[BreakdownWithPopulation]) -> Result<()> {
    for r in rows {
        if let Some(p) = r.population {
            if p < 0 {
                return Err(violation(
                    stage,
                    "population",
                    format!("negative value {} for {} in {}", p, r.entity, r.year),
                ));
            }
        }
        if !r.energy_consumption.is_finite() || r.energy_consumption < 0.0 {
            return Err(violation(
                stage,
                "energy_consumption",
                format!("invalid value {} for {} in {}", r.energy_consumption, r.entity, r.year),
            ));
        }
    }
    Ok(())
}

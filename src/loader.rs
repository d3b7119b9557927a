use crate::config::{Config, EnergyUnit};
use crate::error::{ReportError, Result};
use crate::types::{
    EnergyConsumptionRecord, PopulationRecord, RawEnergyRow, RawGroupingRow, RawPopulationRow,
    RawRenewableRow, RegionalGroupingRecord, RenewableShareRecord,
};
use csv::ReaderBuilder;
use std::fs::File;

const POPULATION_COLUMN: &str = "population__sex_all__age_all__variant_estimates";
const CONSUMPTION_COLUMN: &str = "primary_energy_consumption__twh";
const RENEWABLE_COLUMN: &str = "renewables__pct_equivalent_primary_energy";

/// The four normalized source tables the pipeline runs on.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub population: Vec<PopulationRecord>,
    pub energy_consumption: Vec<EnergyConsumptionRecord>,
    pub renewable_share: Vec<RenewableShareRecord>,
    pub regional_grouping: Vec<RegionalGroupingRecord>,
}

/// Row counts for console diagnostics.
#[derive(Debug, Clone)]
pub struct LoadDiagnostics {
    pub population_rows_seen: usize,
    pub population_rows_kept: usize,
    pub energy_rows: usize,
    pub renewable_rows: usize,
    pub grouping_rows: usize,
}

pub fn load_sources(config: &Config) -> Result<(SourceTables, LoadDiagnostics)> {
    let (population, population_rows_seen) = load_population(&config.data.population)?;
    let energy_consumption =
        load_energy_consumption(&config.data.energy_consumption, config.energy_unit)?;
    let renewable_share = load_renewable_share(&config.data.renewable_share)?;
    let regional_grouping = load_regional_grouping(&config.data.regional_grouping)?;

    let diagnostics = LoadDiagnostics {
        population_rows_seen,
        population_rows_kept: population.len(),
        energy_rows: energy_consumption.len(),
        renewable_rows: renewable_share.len(),
        grouping_rows: regional_grouping.len(),
    };
    let tables = SourceTables {
        population,
        energy_consumption,
        renewable_share,
        regional_grouping,
    };
    Ok((tables, diagnostics))
}

/// Population by country. Rows without an estimate are dropped here; every
/// surviving row carries an integer population.
pub fn load_population(path: &str) -> Result<(Vec<PopulationRecord>, usize)> {
    let mut rdr = open(path)?;
    require_columns(path, &mut rdr, &["Entity", "Code", "Year", POPULATION_COLUMN])?;

    let mut seen = 0usize;
    let mut records = Vec::new();
    for result in rdr.deserialize::<RawPopulationRow>() {
        let row = result.map_err(|e| load_err(path, e))?;
        seen += 1;
        let Some(population) = row.population else {
            continue;
        };
        records.push(PopulationRecord {
            entity: row.entity,
            entity_code: row.code.unwrap_or_default(),
            year: row.year,
            population: population as i64,
        });
    }
    Ok((records, seen))
}

/// Primary energy consumption. The source unit is TWh; a GWh run rescales
/// here so every later stage sees one consistent unit.
pub fn load_energy_consumption(
    path: &str,
    unit: EnergyUnit,
) -> Result<Vec<EnergyConsumptionRecord>> {
    let mut rdr = open(path)?;
    require_columns(path, &mut rdr, &["Entity", "Code", "Year", CONSUMPTION_COLUMN])?;

    let scale = unit.scale_from_twh();
    let mut records = Vec::new();
    for result in rdr.deserialize::<RawEnergyRow>() {
        let row = result.map_err(|e| load_err(path, e))?;
        records.push(EnergyConsumptionRecord {
            entity: row.entity,
            entity_code: row.code.unwrap_or_default(),
            year: row.year,
            energy_consumption: row.consumption_twh * scale,
        });
    }
    Ok(records)
}

/// Renewable share of primary energy, rescaled from whole-number
/// percentages to a fraction in [0, 1].
pub fn load_renewable_share(path: &str) -> Result<Vec<RenewableShareRecord>> {
    let mut rdr = open(path)?;
    require_columns(path, &mut rdr, &["Entity", "Code", "Year", RENEWABLE_COLUMN])?;

    let mut records = Vec::new();
    for result in rdr.deserialize::<RawRenewableRow>() {
        let row = result.map_err(|e| load_err(path, e))?;
        records.push(RenewableShareRecord {
            entity: row.entity,
            entity_code: row.code.filter(|c| !c.is_empty()),
            year: row.year,
            renewable_energy_pct: row.renewable_pct / 100.0,
        });
    }
    Ok(records)
}

/// Country-to-region taxonomy; already in canonical column names.
pub fn load_regional_grouping(path: &str) -> Result<Vec<RegionalGroupingRecord>> {
    let mut rdr = open(path)?;
    require_columns(path, &mut rdr, &["entity_code", "region_entity_code", "region_name"])?;

    let mut records = Vec::new();
    for result in rdr.deserialize::<RawGroupingRow>() {
        let row = result.map_err(|e| load_err(path, e))?;
        records.push(RegionalGroupingRecord {
            entity_code: row.entity_code,
            region_entity_code: row.region_entity_code,
            region_name: row.region_name,
        });
    }
    Ok(records)
}

fn open(path: &str) -> Result<csv::Reader<File>> {
    ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| load_err(path, e))
}

fn require_columns(path: &str, rdr: &mut csv::Reader<File>, required: &[&str]) -> Result<()> {
    // Checked up front so the error can name the column; a missing header
    // would otherwise surface as a per-row deserialize failure.
    let headers = rdr.headers().map_err(|e| load_err(path, e))?;
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(ReportError::MissingColumn {
                path: path.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

fn load_err(path: &str, source: csv::Error) -> ReportError {
    ReportError::Load {
        path: path.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn population_drops_rows_without_estimates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "population.csv",
            "Entity,Code,Year,population__sex_all__age_all__variant_estimates\n\
             United States,USA,2020,331002651\n\
             Atlantis,ATL,2020,\n",
        );

        let (records, seen) = load_population(path.to_str().unwrap()).unwrap();
        assert_eq!(seen, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entity, "United States");
        assert_eq!(records[0].population, 331_002_651);
    }

    #[test]
    fn population_rejects_malformed_year() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "population.csv",
            "Entity,Code,Year,population__sex_all__age_all__variant_estimates\n\
             United States,USA,twenty-twenty,331002651\n",
        );

        let err = load_population(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ReportError::Load { .. }));
    }

    #[test]
    fn missing_column_is_named_in_the_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "population.csv", "Entity,Code,Year\nFrance,FRA,2020\n");

        let err = load_population(path.to_str().unwrap()).unwrap_err();
        match err {
            ReportError::MissingColumn { column, .. } => assert_eq!(column, POPULATION_COLUMN),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn consumption_rescales_for_gwh_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "energy.csv",
            "Entity,Code,Year,primary_energy_consumption__twh\nUnited States,USA,2020,4000\n",
        );

        let twh = load_energy_consumption(path.to_str().unwrap(), EnergyUnit::Twh).unwrap();
        assert_eq!(twh[0].energy_consumption, 4000.0);

        let gwh = load_energy_consumption(path.to_str().unwrap(), EnergyUnit::Gwh).unwrap();
        assert_eq!(gwh[0].energy_consumption, 4_000_000.0);
    }

    #[test]
    fn renewable_share_becomes_a_fraction() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "renewables.csv",
            "Entity,Code,Year,renewables__pct_equivalent_primary_energy\n\
             United States,USA,2020,12\n\
             Africa,,2020,9.5\n",
        );

        let records = load_renewable_share(path.to_str().unwrap()).unwrap();
        assert_eq!(records[0].renewable_energy_pct, 0.12);
        assert_eq!(records[0].entity_code.as_deref(), Some("USA"));
        // A blank code stays absent rather than becoming an empty string.
        assert_eq!(records[1].entity_code, None);
        assert_eq!(records[1].renewable_energy_pct, 0.095);
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(load_regional_grouping("no/such/file.csv").is_err());
    }
}

// Run configuration: where the four source CSVs live, where the report
// goes, and which energy unit the whole pipeline uses.
//
// The file is optional; a missing config.toml falls back to the defaults
// below, while a present-but-malformed one is a fatal error.
use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Energy unit for a whole pipeline run. The raw consumption data is
/// published in terawatt-hours; a GWh run rescales it at load time and
/// every downstream metric (including the plausibility threshold) follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyUnit {
    Twh,
    Gwh,
}

impl EnergyUnit {
    /// Factor applied to the raw TWh consumption column at load time.
    pub fn scale_from_twh(self) -> f64 {
        match self {
            EnergyUnit::Twh => 1.0,
            EnergyUnit::Gwh => 1000.0,
        }
    }

    /// Per-capita plausibility ceiling expressed in this unit.
    ///
    /// Defined as 0.1 GWh (~100 MWh) per person per year regardless of the
    /// unit the run uses.
    pub fn plausibility_threshold(self) -> f64 {
        match self {
            EnergyUnit::Gwh => 0.1,
            EnergyUnit::Twh => 0.1 / 1000.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EnergyUnit::Twh => "TWh",
            EnergyUnit::Gwh => "GWh",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataPaths,
    pub report: ReportPaths,
    pub energy_unit: EnergyUnit,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub population: String,
    pub energy_consumption: String,
    pub renewable_share: String,
    pub regional_grouping: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportPaths {
    pub workbook: String,
    pub summary: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            population: "data/population-with-un-projections.csv".to_string(),
            energy_consumption: "data/primary-energy-cons.csv".to_string(),
            renewable_share: "data/renewable-share-energy.csv".to_string(),
            regional_grouping: "data/regional-grouping.csv".to_string(),
        }
    }
}

impl Default for ReportPaths {
    fn default() -> Self {
        Self {
            workbook: "energy_analysis_report.xlsx".to_string(),
            summary: "run_summary.json".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            report: ReportPaths::default(),
            energy_unit: EnergyUnit::Twh,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

// The transform pipeline: breakdown combiner, population joiner, regional
// aggregator, per-capita calculator. Every stage is a pure function of its
// inputs; `run_pipeline` fixes the order and runs the schema checks at
// each boundary.
use crate::error::Result;
use crate::loader::SourceTables;
use crate::schema;
use crate::types::{
    BreakdownWithPopulation, EnergyBreakdownRecord, EnergyConsumptionRecord, PerCapitaRecord,
    PopulationRecord, RegionalGroupingRecord, RenewableShareRecord,
};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Country rows followed by regional rollups, with per-capita metrics.
    pub per_capita: Vec<PerCapitaRecord>,
    pub country_rows: usize,
    pub region_rows: usize,
}

pub fn run_pipeline(tables: &SourceTables) -> Result<PipelineOutput> {
    schema::check_population(&tables.population)?;
    schema::check_energy_consumption(&tables.energy_consumption)?;
    schema::check_renewable_share(&tables.renewable_share)?;
    schema::check_regional_grouping(&tables.regional_grouping)?;

    let breakdown = combine_energy_breakdown(&tables.energy_consumption, &tables.renewable_share);
    schema::check_breakdown("energy_breakdown", &breakdown)?;

    let countries = join_population(&breakdown, &tables.population);
    let regions = rollup_regions(&countries, &tables.regional_grouping);
    schema::check_rollups("regional_rollups", &regions)?;

    let country_rows = countries.len();
    let region_rows = regions.len();
    let mut all = countries;
    all.extend(regions);
    let per_capita = compute_per_capita(&all);

    Ok(PipelineOutput {
        per_capita,
        country_rows,
        region_rows,
    })
}

/// Left-join consumption with renewable share on (entity, entity_code,
/// year) and derive the fossil/renewable split. Consumption rows with no
/// share match are treated as fully fossil; that is the documented default
/// for incomplete source coverage, not an error.
pub fn combine_energy_breakdown(
    consumption: &[EnergyConsumptionRecord],
    renewable: &[RenewableShareRecord],
) -> Vec<EnergyBreakdownRecord> {
    let mut share_index: HashMap<(String, String, i32), f64> = HashMap::new();
    for r in renewable {
        // A row without a code can only match consumption rows that also
        // lack one.
        let code = r.entity_code.clone().unwrap_or_default();
        share_index.insert((r.entity.clone(), code, r.year), r.renewable_energy_pct);
    }

    consumption
        .iter()
        .map(|c| {
            let key = (c.entity.clone(), c.entity_code.clone(), c.year);
            let renewable_pct = share_index.get(&key).copied().unwrap_or(0.0);
            let fossil_pct = 1.0 - renewable_pct;
            EnergyBreakdownRecord {
                entity: c.entity.clone(),
                entity_code: c.entity_code.clone(),
                year: c.year,
                energy_consumption: c.energy_consumption,
                renewable_energy_pct: renewable_pct,
                fossil_energy_pct: fossil_pct,
                renewable_energy_consumption: c.energy_consumption * renewable_pct,
                fossil_energy_consumption: c.energy_consumption * fossil_pct,
            }
        })
        .collect()
}

/// Left-join the breakdown with population; rows without a population
/// estimate keep None rather than being dropped.
pub fn join_population(
    breakdown: &[EnergyBreakdownRecord],
    population: &[PopulationRecord],
) -> Vec<BreakdownWithPopulation> {
    let mut population_index: HashMap<(String, String, i32), i64> = HashMap::new();
    for p in population {
        population_index.insert((p.entity.clone(), p.entity_code.clone(), p.year), p.population);
    }

    breakdown
        .iter()
        .map(|b| {
            let key = (b.entity.clone(), b.entity_code.clone(), b.year);
            BreakdownWithPopulation {
                entity: b.entity.clone(),
                entity_code: b.entity_code.clone(),
                year: b.year,
                energy_consumption: b.energy_consumption,
                renewable_energy_pct: b.renewable_energy_pct,
                fossil_energy_pct: b.fossil_energy_pct,
                renewable_energy_consumption: b.renewable_energy_consumption,
                fossil_energy_consumption: b.fossil_energy_consumption,
                population: population_index.get(&key).copied(),
            }
        })
        .collect()
}

/// Roll countries up into regions: inner-join to the mapping on
/// entity_code, sum the absolutes per (region, year), then recompute the
/// percentage split from the summed absolutes. Averaging the per-country
/// percentages would ignore consumption weights.
pub fn rollup_regions(
    rows: &[BreakdownWithPopulation],
    grouping: &[RegionalGroupingRecord],
) -> Vec<BreakdownWithPopulation> {
    let mut region_by_country: HashMap<&str, &RegionalGroupingRecord> = HashMap::new();
    for g in grouping {
        region_by_country.insert(g.entity_code.as_str(), g);
    }

    #[derive(Default)]
    struct Acc {
        entity: String,
        entity_code: String,
        year: i32,
        population: i64,
        energy: f64,
        renewable: f64,
        fossil: f64,
    }

    let mut map: HashMap<(String, i32), Acc> = HashMap::new();
    for r in rows {
        // Countries absent from the mapping contribute to no region; they
        // still appear in the per-country output.
        let Some(group) = region_by_country.get(r.entity_code.as_str()) else {
            continue;
        };
        let e = map
            .entry((group.region_entity_code.clone(), r.year))
            .or_insert_with(|| Acc {
                entity: group.region_name.clone(),
                entity_code: group.region_entity_code.clone(),
                year: r.year,
                ..Default::default()
            });
        // Members without an estimate contribute nothing to the sum.
        e.population += r.population.unwrap_or(0);
        e.energy += r.energy_consumption;
        e.renewable += r.renewable_energy_consumption;
        e.fossil += r.fossil_energy_consumption;
    }

    let mut out: Vec<BreakdownWithPopulation> = map
        .into_values()
        .map(|acc| BreakdownWithPopulation {
            entity: acc.entity,
            entity_code: acc.entity_code,
            year: acc.year,
            energy_consumption: acc.energy,
            renewable_energy_pct: acc.renewable / acc.energy,
            fossil_energy_pct: acc.fossil / acc.energy,
            renewable_energy_consumption: acc.renewable,
            fossil_energy_consumption: acc.fossil,
            population: Some(acc.population),
        })
        .collect();
    out.sort_by(|a, b| a.entity_code.cmp(&b.entity_code).then(a.year.cmp(&b.year)));
    out
}

/// Divide the three consumption metrics by population. A missing
/// population yields None, a zero population an infinite value; the
/// calculator never filters, that is the report layer's job.
pub fn compute_per_capita(rows: &[BreakdownWithPopulation]) -> Vec<PerCapitaRecord> {
    rows.iter()
        .map(|r| {
            let per = |v: f64| r.population.map(|p| v / p as f64);
            PerCapitaRecord {
                entity: r.entity.clone(),
                entity_code: r.entity_code.clone(),
                year: r.year,
                energy_consumption: r.energy_consumption,
                renewable_energy_pct: r.renewable_energy_pct,
                fossil_energy_pct: r.fossil_energy_pct,
                renewable_energy_consumption: r.renewable_energy_consumption,
                fossil_energy_consumption: r.fossil_energy_consumption,
                population: r.population,
                energy_consumption_per_capita: per(r.energy_consumption),
                renewable_energy_per_capita: per(r.renewable_energy_consumption),
                fossil_energy_per_capita: per(r.fossil_energy_consumption),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumption(entity: &str, code: &str, year: i32, value: f64) -> EnergyConsumptionRecord {
        EnergyConsumptionRecord {
            entity: entity.to_string(),
            entity_code: code.to_string(),
            year,
            energy_consumption: value,
        }
    }

    fn share(entity: &str, code: &str, year: i32, pct: f64) -> RenewableShareRecord {
        RenewableShareRecord {
            entity: entity.to_string(),
            entity_code: Some(code.to_string()),
            year,
            renewable_energy_pct: pct,
        }
    }

    fn person_count(entity: &str, code: &str, year: i32, population: i64) -> PopulationRecord {
        PopulationRecord {
            entity: entity.to_string(),
            entity_code: code.to_string(),
            year,
            population,
        }
    }

    fn grouping(code: &str, region_code: &str, region: &str) -> RegionalGroupingRecord {
        RegionalGroupingRecord {
            entity_code: code.to_string(),
            region_entity_code: region_code.to_string(),
            region_name: region.to_string(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn breakdown_splits_consumption() {
        let rows = combine_energy_breakdown(
            &[consumption("United States", "USA", 2020, 4000.0)],
            &[share("United States", "USA", 2020, 0.12)],
        );

        assert_eq!(rows.len(), 1);
        let r = &rows[0];
        assert!(close(r.renewable_energy_pct, 0.12));
        assert!(close(r.fossil_energy_pct, 0.88));
        assert!(close(r.renewable_energy_consumption, 480.0));
        assert!(close(r.fossil_energy_consumption, 3520.0));
    }

    #[test]
    fn unmatched_consumption_defaults_to_fully_fossil() {
        let rows = combine_energy_breakdown(
            &[consumption("Kosovo", "XKX", 2019, 30.0)],
            &[share("France", "FRA", 2019, 0.2)],
        );

        let r = &rows[0];
        assert_eq!(r.renewable_energy_pct, 0.0);
        assert_eq!(r.fossil_energy_pct, 1.0);
        assert_eq!(r.fossil_energy_consumption, 30.0);
    }

    #[test]
    fn breakdown_conserves_energy() {
        let rows = combine_energy_breakdown(
            &[
                consumption("France", "FRA", 2020, 2500.0),
                consumption("Spain", "ESP", 2020, 1200.0),
                consumption("Portugal", "PRT", 2020, 260.0),
            ],
            &[
                share("France", "FRA", 2020, 0.19),
                share("Spain", "ESP", 2020, 0.31),
            ],
        );

        for r in &rows {
            assert!((r.fossil_energy_pct + r.renewable_energy_pct - 1.0).abs() < 1e-6);
            assert!(close(
                r.renewable_energy_consumption + r.fossil_energy_consumption,
                r.energy_consumption
            ));
        }
    }

    #[test]
    fn population_join_keeps_unmatched_rows() {
        let breakdown = combine_energy_breakdown(
            &[
                consumption("France", "FRA", 2020, 2500.0),
                consumption("Spain", "ESP", 2020, 1200.0),
            ],
            &[],
        );
        let joined = join_population(&breakdown, &[person_count("France", "FRA", 2020, 67_000_000)]);

        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].population, Some(67_000_000));
        assert_eq!(joined[1].population, None);
    }

    #[test]
    fn rollup_weights_shares_by_consumption() {
        let with_population = vec![
            BreakdownWithPopulation {
                entity: "Aland".to_string(),
                entity_code: "A".to_string(),
                year: 2020,
                energy_consumption: 100.0,
                renewable_energy_pct: 0.5,
                fossil_energy_pct: 0.5,
                renewable_energy_consumption: 50.0,
                fossil_energy_consumption: 50.0,
                population: Some(10),
            },
            BreakdownWithPopulation {
                entity: "Borduria".to_string(),
                entity_code: "B".to_string(),
                year: 2020,
                energy_consumption: 50.0,
                renewable_energy_pct: 0.2,
                fossil_energy_pct: 0.8,
                renewable_energy_consumption: 10.0,
                fossil_energy_consumption: 40.0,
                population: Some(20),
            },
        ];
        let regions = rollup_regions(
            &with_population,
            &[grouping("A", "REG", "Testland"), grouping("B", "REG", "Testland")],
        );

        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!(r.entity, "Testland");
        assert_eq!(r.entity_code, "REG");
        assert_eq!(r.population, Some(30));
        assert!(close(r.energy_consumption, 150.0));
        // Consumption-weighted: (100*0.5 + 50*0.2) / 150, not the 0.35
        // simple average.
        assert!(close(r.renewable_energy_pct, 0.4));
        assert!(close(r.fossil_energy_pct, 0.6));
    }

    #[test]
    fn unmapped_countries_stay_out_of_rollups() {
        let with_population = join_population(
            &combine_energy_breakdown(
                &[
                    consumption("France", "FRA", 2020, 2500.0),
                    consumption("Kosovo", "XKX", 2020, 30.0),
                ],
                &[],
            ),
            &[],
        );
        let regions = rollup_regions(&with_population, &[grouping("FRA", "EUR", "Europe")]);

        assert_eq!(regions.len(), 1);
        assert!(close(regions[0].energy_consumption, 2500.0));
        // The unmapped country is still a per-country row.
        assert!(with_population.iter().any(|r| r.entity == "Kosovo"));
    }

    #[test]
    fn per_capita_divides_by_population() {
        let rows = compute_per_capita(&[BreakdownWithPopulation {
            entity: "United States".to_string(),
            entity_code: "USA".to_string(),
            year: 2020,
            energy_consumption: 4000.0,
            renewable_energy_pct: 0.12,
            fossil_energy_pct: 0.88,
            renewable_energy_consumption: 480.0,
            fossil_energy_consumption: 3520.0,
            population: Some(331_000_000),
        }]);

        let r = &rows[0];
        let expected = 4000.0 / 331_000_000.0;
        assert!(close(r.energy_consumption_per_capita.unwrap(), expected));
        assert!((expected - 1.208e-5).abs() < 1e-8);
        assert!(close(r.renewable_energy_per_capita.unwrap(), 480.0 / 331_000_000.0));
    }

    #[test]
    fn per_capita_edge_cases_stay_in_the_table() {
        let base = BreakdownWithPopulation {
            entity: "Nowhere".to_string(),
            entity_code: "NWH".to_string(),
            year: 2020,
            energy_consumption: 10.0,
            renewable_energy_pct: 0.0,
            fossil_energy_pct: 1.0,
            renewable_energy_consumption: 0.0,
            fossil_energy_consumption: 10.0,
            population: None,
        };
        let zero_population = BreakdownWithPopulation {
            population: Some(0),
            ..base.clone()
        };

        let rows = compute_per_capita(&[base, zero_population]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].energy_consumption_per_capita, None);
        assert!(rows[1].energy_consumption_per_capita.unwrap().is_infinite());
        assert!(!rows[0].is_valid());
        assert!(!rows[1].is_valid());
    }

    fn sample_tables() -> SourceTables {
        SourceTables {
            population: vec![
                person_count("United States", "USA", 2020, 331_000_000),
                person_count("Spain", "ESP", 2020, 47_000_000),
                person_count("Portugal", "PRT", 2020, 10_000_000),
            ],
            energy_consumption: vec![
                consumption("United States", "USA", 2020, 4000.0),
                consumption("Spain", "ESP", 2020, 1200.0),
                consumption("Portugal", "PRT", 2020, 260.0),
            ],
            renewable_share: vec![
                share("United States", "USA", 2020, 0.12),
                share("Spain", "ESP", 2020, 0.31),
            ],
            regional_grouping: vec![
                grouping("ESP", "IBE", "Iberia"),
                grouping("PRT", "IBE", "Iberia"),
                grouping("USA", "NAM", "North America"),
            ],
        }
    }

    #[test]
    fn pipeline_produces_countries_then_regions() {
        let output = run_pipeline(&sample_tables()).unwrap();

        assert_eq!(output.country_rows, 3);
        assert_eq!(output.region_rows, 2);
        assert_eq!(output.per_capita.len(), 5);

        let iberia = output
            .per_capita
            .iter()
            .find(|r| r.entity == "Iberia")
            .unwrap();
        assert_eq!(iberia.population, Some(57_000_000));
        // Spain 1200 * 0.31 renewable, Portugal fully fossil by default.
        assert!(close(iberia.energy_consumption, 1460.0));
        assert!(close(iberia.renewable_energy_consumption, 372.0));
        assert!(close(iberia.renewable_energy_pct, 372.0 / 1460.0));
    }

    #[test]
    fn pipeline_is_deterministic() {
        let tables = sample_tables();
        let first = run_pipeline(&tables).unwrap();
        let second = run_pipeline(&tables).unwrap();
        assert_eq!(first.per_capita, second.per_capita);
    }
}

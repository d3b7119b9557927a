// Entry point and high-level CLI flow.
//
// - Option [1] loads the four source tables, runs the transform pipeline
//   and the validation checks, and prints per-stage diagnostics.
// - Option [2] exports the spreadsheet report plus a JSON run summary and
//   prints markdown previews of the ranking tables.
// - After exporting, the user can choose to go back to the selection menu
//   or exit.
mod checks;
mod config;
mod error;
mod loader;
mod output;
mod reports;
mod schema;
mod transform;
mod types;
mod util;

use checks::CheckOutcome;
use config::Config;
use error::{ReportError, Result};
use loader::LoadDiagnostics;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use transform::PipelineOutput;
use util::format_int;

const CONFIG_PATH: &str = "config.toml";

// Simple in-memory app state so the pipeline runs once but the report can
// be exported multiple times in a single session.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState { run: None }));

struct AppState {
    run: Option<PipelineRun>,
}

#[derive(Clone)]
struct PipelineRun {
    config: Config,
    diagnostics: LoadDiagnostics,
    output: PipelineOutput,
    checks: Vec<CheckOutcome>,
}

/// Read a single line of input after printing the common "Enter choice:"
/// prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the menu after exporting.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Selection Menu (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Load, transform, validate. A conservation failure is a blocking error:
/// the run produces no cached output and nothing can be exported from it.
fn execute_pipeline(config: &Config) -> Result<PipelineRun> {
    let (tables, diagnostics) = loader::load_sources(config)?;
    let output = transform::run_pipeline(&tables)?;

    let conservation = checks::energy_conservation(&output.per_capita);
    if !conservation.passed {
        return Err(ReportError::CheckFailed {
            name: conservation.name,
            description: conservation.description,
        });
    }
    let plausibility = checks::per_capita_plausibility(&output.per_capita, config.energy_unit);

    Ok(PipelineRun {
        config: config.clone(),
        diagnostics,
        output,
        checks: vec![conservation, plausibility],
    })
}

/// Handle option [1]: run the pipeline and stash the output in APP_STATE.
fn handle_run() {
    let config = match Config::load(CONFIG_PATH) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}\n", e);
            return;
        }
    };

    match execute_pipeline(&config) {
        Ok(run) => {
            let d = &run.diagnostics;
            println!(
                "Processing datasets... ({} of {} population rows kept, {} consumption rows, {} renewable-share rows, {} region mappings)",
                format_int(d.population_rows_kept),
                format_int(d.population_rows_seen),
                format_int(d.energy_rows),
                format_int(d.renewable_rows),
                format_int(d.grouping_rows)
            );
            println!(
                "Pipeline complete: {} country rows, {} regional rollups, {} per-capita rows ({}).",
                format_int(run.output.country_rows),
                format_int(run.output.region_rows),
                format_int(run.output.per_capita.len()),
                run.config.energy_unit.label()
            );
            for check in &run.checks {
                if check.passed {
                    println!("Check passed: {}", check.description);
                } else {
                    println!("Warning: {}", check.description);
                }
            }
            println!();
            let mut state = APP_STATE.lock().unwrap();
            state.run = Some(run);
        }
        Err(e) => {
            eprintln!("Pipeline failed: {}\n", e);
        }
    }
}

/// Handle option [2]: build the report tables, write the workbook and the
/// JSON summary, and print previews.
fn handle_export() {
    let run = {
        let state = APP_STATE.lock().unwrap();
        state.run.clone()
    };
    let Some(run) = run else {
        println!("Error: No pipeline output available. Run the pipeline first (option 1).\n");
        return;
    };

    println!("Generating report...");
    let tables = reports::build_report_tables(&run.output.per_capita);

    if let Err(e) = output::write_workbook(&run.config.report.workbook, &tables) {
        eprintln!("Write error: {}", e);
        return;
    }
    let summary = reports::build_summary(
        run.config.energy_unit,
        &run.diagnostics,
        &run.output,
        &tables,
        &run.checks,
    );
    if let Err(e) = output::write_json(&run.config.report.summary, &summary) {
        eprintln!("Write error: {}", e);
    }

    println!("Top 10 renewable per-capita entities (each at its best year):\n");
    output::preview_table_rows(&tables.top_renewable, 10);
    println!("Top 10 fossil per-capita entities (each at its best year):\n");
    output::preview_table_rows(&tables.top_fossil, 10);
    println!(
        "Report exported to {} (run summary in {}).\n",
        run.config.report.workbook, run.config.report.summary
    );
}

fn main() {
    loop {
        println!("Energy mix report:");
        println!("[1] Run pipeline");
        println!("[2] Export report\n");
        match read_choice().as_str() {
            "1" => {
                handle_run();
            }
            "2" => {
                println!();
                handle_export();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
}

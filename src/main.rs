// ==========================================
// Day Treatment Planner - command line entry
// ==========================================
// Usage:
//   day-treatment-planner <request.json> [--apply] [--set key=value]...
//
// Reads a day request document, plans the day and prints the plan
// as JSON on stdout. With --apply the request's patients are printed
// instead, with every planned timeline already replaced.
// --set overrides one clinic config key (see config::config_keys).
// ==========================================

use day_treatment_planner::engine::{plan_request, DayRequest};
use day_treatment_planner::logging;
use std::collections::HashMap;

const USAGE: &str = "usage: day-treatment-planner <request.json> [--apply] [--set key=value]...";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let request_path = args.next().ok_or(USAGE)?;
    let mut apply = false;
    let mut overrides = HashMap::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--apply" => apply = true,
            "--set" => {
                let pair = args.next().ok_or(USAGE)?;
                let (key, value) = pair.split_once('=').ok_or(USAGE)?;
                overrides.insert(key.trim().to_string(), value.trim().to_string());
            }
            other => return Err(format!("unknown argument '{}'\n{}", other, USAGE).into()),
        }
    }

    tracing::info!(version = day_treatment_planner::VERSION, path = %request_path, "planning day");

    let mut request = DayRequest::from_json_file(&request_path)?;
    if !overrides.is_empty() {
        let mut config = request.config.take().unwrap_or_default();
        config.apply_overrides(&overrides)?;
        request.config = Some(config);
    }

    let plan = plan_request(&request)?;
    for warning in &plan.warnings {
        tracing::warn!("{}", warning);
    }

    if apply {
        let mut patients = request.patients.clone();
        let applied = plan.apply_to(&mut patients);
        tracing::info!(applied, "timelines applied");
        println!("{}", serde_json::to_string_pretty(&patients)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }
    Ok(())
}

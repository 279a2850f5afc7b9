//! Entry points for the `run`, `merge` and `format` commands

use anyhow::{bail, Result};
use chrono::Local;
use std::path::Path;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::format::{StyledSheet, Theme};
use crate::obstacle::{ObstacleHandler, TerminalResolver};
use crate::processor::{BatchReport, Outcome, RecordProcessor};
use crate::raw::{read_raw_csv, write_raw_csv};
use crate::reconcile::reconcile;
use crate::reshape::WideTable;
use crate::session::ChromeSession;
use crate::source::MasterTable;
use crate::workbook;

/// Reshape, merge and style. Pure; the caller decides where it goes.
pub fn assemble(master: &MasterTable, wide: &WideTable, tint_bound: usize) -> StyledSheet {
    Theme::new(tint_bound).apply(reconcile(master, wide))
}

fn print_summary(report: &BatchReport, output: &Path, started: chrono::DateTime<Local>) {
    let elapsed = Local::now() - started;

    println!();
    println!(
        "Processed {} RUCs in {}m{:02}s: {} done, {} failed, {} skipped",
        report.outcomes.len(),
        elapsed.num_minutes(),
        elapsed.num_seconds() % 60,
        report.done(),
        report.failed(),
        report.skipped()
    );
    for record in &report.outcomes {
        if let Outcome::Failed { state, reason } = &record.outcome {
            println!("  {} failed while {}: {}", record.identifier, state, reason);
        }
    }
    if let Some(reason) = &report.halted {
        println!("Stopped early: {}", reason);
    }
    println!("Wrote {}", output.display());
}

pub fn run(config: &RunConfig) -> Result<()> {
    let started = Local::now();
    let master = MasterTable::load(&config.input)?;
    let identifiers = master.identifiers(config.limit);
    if identifiers.is_empty() {
        bail!("No RUC values found in the first column of {}", config.input.display());
    }
    info!("Querying {} RUCs (limit {})", identifiers.len(), config.limit);

    let mut session = ChromeSession::open(&config.portal_url, config.headless, &config.timing)?;
    let report = RecordProcessor::new(
        &mut session,
        ObstacleHandler::new(TerminalResolver::stdin()),
        config.timing.clone(),
    )
    .process_all(&identifiers);
    drop(session);

    if let Some(path) = &config.raw_csv {
        match write_raw_csv(path, &report.extracted) {
            Ok(n) => info!("Wrote {} raw events to {}", n, path.display()),
            Err(e) => warn!("Could not write raw dump: {:#}", e),
        }
    }

    let wide = WideTable::from_events(report.extracted.iter().cloned());
    let styled = assemble(&master, &wide, config.limit);
    workbook::write_styled(&config.output, &styled)?;

    print_summary(&report, &config.output, started);
    Ok(())
}

/// Rebuild the output from a raw dump without visiting the portal
pub fn run_merge(input: &Path, raw_csv: &Path, output: &Path, tint_bound: usize) -> Result<()> {
    let master = MasterTable::load(input)?;
    let records = read_raw_csv(raw_csv)?;
    info!("Read {} raw events from {}", records.len(), raw_csv.display());

    let wide = WideTable::from_raw(&records);
    let styled = assemble(&master, &wide, tint_bound);
    workbook::write_styled(output, &styled)?;

    println!(
        "Merged {} RUCs with events into {}",
        wide.rows().len(),
        output.display()
    );
    Ok(())
}

/// Re-apply the theme to an existing workbook
pub fn run_format(input: &Path, output: &Path, tint_bound: usize) -> Result<()> {
    let sheet = workbook::read_first_sheet(input)?;
    let styled = Theme::new(tint_bound).apply(sheet);
    workbook::write_styled(output, &styled)?;
    println!("Formatted {}", output.display());
    Ok(())
}

//! Per-identifier portal walk: search, open the DU-E, read its history

use anyhow::anyhow;
use std::fmt;
use std::thread;
use tracing::{error, info, warn};

use crate::config::Timing;
use crate::error::{HaltReason, StepFailure};
use crate::obstacle::{ObstacleHandler, Resolver};
use crate::session::Portal;
use crate::types::{Event, Identifier, IdentifierEvents};

/// Where an identifier is in its walk through the portal. The terminal
/// failed state is [`Outcome::Failed`], which remembers the state it left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Searching,
    Submitted,
    AwaitingResults,
    DetailOpen,
    Extracted,
    Done,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordState::Searching => "searching",
            RecordState::Submitted => "submitted",
            RecordState::AwaitingResults => "awaiting results",
            RecordState::DetailOpen => "detail open",
            RecordState::Extracted => "extracted",
            RecordState::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done { events: usize },
    /// `state` is the last state reached before the failure
    Failed { state: RecordState, reason: String },
    /// Never attempted because the batch halted earlier
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub identifier: Identifier,
    pub outcome: Outcome,
}

/// Result of a whole batch. `extracted` holds one entry per `Done`
/// identifier, in processing order, including those with no events.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
    pub extracted: Vec<IdentifierEvents>,
    pub halted: Option<HaltReason>,
}

impl BatchReport {
    pub fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn done(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Done { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped))
    }
}

/// Drives one portal session through a list of identifiers, strictly in
/// order. A failing identifier is recorded and the batch moves on; only a
/// lost session or an abandoned CAPTCHA stops it.
pub struct RecordProcessor<'a, P: ?Sized, R> {
    portal: &'a mut P,
    obstacles: ObstacleHandler<R>,
    timing: Timing,
}

impl<'a, P: Portal + ?Sized, R: Resolver> RecordProcessor<'a, P, R> {
    pub fn new(portal: &'a mut P, obstacles: ObstacleHandler<R>, timing: Timing) -> Self {
        Self {
            portal,
            obstacles,
            timing,
        }
    }

    pub fn process_all(&mut self, identifiers: &[Identifier]) -> BatchReport {
        let mut report = BatchReport::default();
        let total = identifiers.len();

        for (i, identifier) in identifiers.iter().enumerate() {
            if report.halted.is_some() {
                report.outcomes.push(RecordOutcome {
                    identifier: identifier.clone(),
                    outcome: Outcome::Skipped,
                });
                continue;
            }

            info!("[{}/{}] Processing RUC: {}", i + 1, total, identifier);
            let mut state = RecordState::Searching;

            let outcome = match self.process_one(identifier, &mut state) {
                Ok(events) => {
                    info!(ruc = %identifier, "Extracted {} events", events.len());
                    let count = events.len();
                    report.extracted.push(IdentifierEvents {
                        identifier: identifier.clone(),
                        events,
                    });

                    if let Err(e) = self.return_to_search() {
                        warn!(ruc = %identifier, "Could not return to search page: {}", e);
                        if let Err(halt) = self.recover() {
                            report.halted = Some(halt);
                        }
                    }
                    Outcome::Done { events: count }
                }
                Err(failure) => {
                    error!(
                        ruc = %identifier,
                        state = %state,
                        "Error processing RUC {}: {}",
                        identifier,
                        failure
                    );
                    if failure.halts_batch() {
                        report.halted = Some(HaltReason(failure.to_string()));
                    } else if let Err(halt) = self.recover() {
                        report.halted = Some(halt);
                    }
                    Outcome::Failed {
                        state,
                        reason: failure.to_string(),
                    }
                }
            };

            report.outcomes.push(RecordOutcome {
                identifier: identifier.clone(),
                outcome,
            });
        }

        if let Some(reason) = &report.halted {
            warn!(
                "Batch halted ({}); {} identifiers not processed",
                reason,
                report.skipped()
            );
        }
        report
    }

    /// Steps 1-4 of the walk, ending in `Extracted` (or `Done` when there
    /// is no DU-E to open). `state` tracks progress so a failure can be
    /// reported against the step that broke.
    fn process_one(
        &mut self,
        identifier: &Identifier,
        state: &mut RecordState,
    ) -> Result<Vec<Event>, StepFailure> {
        self.portal
            .select_mode()
            .map_err(|e| StepFailure::step("select mode", e))?;
        self.portal
            .fill_identifier(identifier)
            .map_err(|e| StepFailure::step("fill identifier", e))?;
        self.obstacles.clear(&mut *self.portal, identifier)?;
        self.portal
            .submit_search()
            .map_err(|e| StepFailure::step("submit search", e))?;
        self.obstacles.clear(&mut *self.portal, identifier)?;
        *state = RecordState::Submitted;

        if !self.portal.wait_for_table(self.timing.results_timeout) {
            return Err(StepFailure::NoResultsFound);
        }
        *state = RecordState::AwaitingResults;

        let opened = self
            .portal
            .open_first_detail_link()
            .map_err(|e| StepFailure::step("open detail link", e))?;
        if !opened {
            info!(ruc = %identifier, "No DU-E links found for this RUC");
            *state = RecordState::Done;
            return Ok(Vec::new());
        }

        thread::sleep(self.timing.detail_settle);
        self.obstacles.clear(&mut *self.portal, identifier)?;
        if !self.portal.wait_for_table(self.timing.detail_timeout) {
            return Err(StepFailure::step(
                "wait for detail table",
                anyhow!("timed out after {:?}", self.timing.detail_timeout),
            ));
        }
        *state = RecordState::DetailOpen;

        let rows = self
            .portal
            .extract_detail_rows()
            .map_err(|e| StepFailure::step("extract detail rows", e))?;
        let events: Vec<Event> = rows.iter().map(|cells| Event::from_cells(cells)).collect();
        *state = RecordState::Extracted;
        Ok(events)
    }

    /// Step 5: back to the search form for the next identifier
    fn return_to_search(&mut self) -> anyhow::Result<()> {
        self.portal.go_back()?;
        thread::sleep(self.timing.back_settle);
        Ok(())
    }

    /// Put the page back on the search form after a failure. An error here
    /// means the session is unusable and the batch must stop.
    fn recover(&mut self) -> Result<(), HaltReason> {
        if !self.portal.is_alive() {
            return Err(HaltReason(
                StepFailure::SessionLost("page no longer responds".to_string()).to_string(),
            ));
        }
        self.portal
            .reset()
            .map_err(|e| HaltReason(StepFailure::SessionLost(e.to_string()).to_string()))
    }
}

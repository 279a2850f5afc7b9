//! CAPTCHA detection and manual-resolution hand-off

use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

use crate::error::StepFailure;
use crate::session::Portal;
use crate::types::Identifier;

/// Answer from whoever is asked to solve a challenge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    Abandoned,
}

/// Escalation channel for challenges the pipeline cannot solve itself
pub trait Resolver {
    /// Block until the challenge is reported solved or given up
    fn wait_for_resolution(&mut self, identifier: &Identifier) -> Resolution;
}

/// Asks the operator on the terminal and waits for Enter. No timeout.
pub struct TerminalResolver<R> {
    input: R,
}

impl TerminalResolver<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl<R: BufRead> TerminalResolver<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Resolver for TerminalResolver<R> {
    fn wait_for_resolution(&mut self, identifier: &Identifier) -> Resolution {
        println!("hCaptcha detected while processing RUC {}.", identifier);
        print!("Solve the CAPTCHA in the browser window and press Enter to continue...");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => Resolution::Abandoned,
            Ok(_) => Resolution::Resolved,
        }
    }
}

/// Checks the current page for a CAPTCHA and suspends until it is solved
pub struct ObstacleHandler<R> {
    resolver: R,
}

impl<R: Resolver> ObstacleHandler<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }

    /// Returns immediately when no challenge is visible. Otherwise waits on
    /// the resolver and re-checks until the widget is gone.
    pub fn clear<P: Portal + ?Sized>(
        &mut self,
        portal: &mut P,
        identifier: &Identifier,
    ) -> Result<(), StepFailure> {
        loop {
            let visible = match portal.obstacle_visible() {
                Ok(visible) => visible,
                Err(e) => {
                    warn!("CAPTCHA check failed for {}: {}", identifier, e);
                    return Ok(());
                }
            };

            if !visible {
                debug!("No CAPTCHA detected");
                return Ok(());
            }

            info!("CAPTCHA visible for {}, waiting for manual resolution", identifier);
            match self.resolver.wait_for_resolution(identifier) {
                Resolution::Resolved => continue,
                Resolution::Abandoned => return Err(StepFailure::ObstacleUnresolved),
            }
        }
    }
}

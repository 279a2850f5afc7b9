//! Run configuration and defaults

use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;

pub const PORTAL_URL: &str =
    "https://portalunico.siscomex.gov.br/due/x/#/consulta/consulta-filtro?perfil=publico";
pub const DEFAULT_INPUT: &str = "Teste.xlsx";
pub const DEFAULT_LIMIT: usize = 71;

pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(120);
pub const RESULTS_TIMEOUT: Duration = Duration::from_secs(60);
pub const DETAIL_TIMEOUT: Duration = Duration::from_secs(120);
pub const DETAIL_SETTLE: Duration = Duration::from_secs(3);
pub const BACK_SETTLE: Duration = Duration::from_secs(2);

/// Timeouts and settle delays used while driving the portal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub navigation_timeout: Duration,
    pub results_timeout: Duration,
    pub detail_timeout: Duration,
    pub detail_settle: Duration,
    pub back_settle: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            navigation_timeout: NAVIGATION_TIMEOUT,
            results_timeout: RESULTS_TIMEOUT,
            detail_timeout: DETAIL_TIMEOUT,
            detail_settle: DETAIL_SETTLE,
            back_settle: BACK_SETTLE,
        }
    }
}

impl Timing {
    /// No settle delays, short waits. Used by tests driving a fake portal.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            navigation_timeout: Duration::from_millis(10),
            results_timeout: Duration::from_millis(10),
            detail_timeout: Duration::from_millis(10),
            detail_settle: Duration::ZERO,
            back_settle: Duration::ZERO,
        }
    }
}

/// Everything `run` needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub portal_url: String,
    pub input: PathBuf,
    pub output: PathBuf,
    pub limit: usize,
    pub headless: bool,
    pub timing: Timing,
    pub raw_csv: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(input: PathBuf) -> Self {
        Self {
            portal_url: PORTAL_URL.to_string(),
            output: input.clone(),
            input,
            limit: DEFAULT_LIMIT,
            headless: false,
            timing: Timing::default(),
            raw_csv: None,
        }
    }
}

/// Default name for the raw extraction dump, stamped with the local time
pub fn default_raw_csv_path() -> PathBuf {
    PathBuf::from(format!(
        "raw-extraction-{}.csv",
        Local::now().format("%Y%m%d-%H%M%S")
    ))
}

//! Scripted portal used by unit tests

use anyhow::{anyhow, bail, Result};
use std::collections::HashMap;
use std::time::Duration;

use crate::session::Portal;
use crate::types::Identifier;

/// How the fake portal answers for one identifier
#[derive(Debug, Clone)]
pub enum Script {
    /// Results with a detail link leading to these rows
    Rows(Vec<Vec<String>>),
    /// Results table without links
    NoLinks,
    /// Results table never appears
    NoResults,
    /// Named step raises an error: "fill", "submit", "extract", "back"
    FailAt(&'static str),
    /// The browser dies on submit
    KillSession,
}

pub fn rows(cells: &[&[&str]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[derive(Debug)]
pub struct FakePortal {
    pub scripts: HashMap<String, Script>,
    pub captcha_checks: usize,
    pub captcha_probe_fails: bool,
    pub alive: bool,
    pub resets: usize,
    pub backs: usize,
    pub submitted: Vec<String>,
    current: Option<String>,
}

impl Default for FakePortal {
    fn default() -> Self {
        Self {
            scripts: HashMap::new(),
            captcha_checks: 0,
            captcha_probe_fails: false,
            alive: true,
            resets: 0,
            backs: 0,
            submitted: Vec::new(),
            current: None,
        }
    }
}

impl FakePortal {
    pub fn with(mut self, identifier: &str, script: Script) -> Self {
        self.scripts.insert(identifier.to_string(), script);
        self
    }

    fn script(&self) -> Script {
        self.current
            .as_ref()
            .and_then(|id| self.scripts.get(id))
            .cloned()
            .unwrap_or(Script::NoLinks)
    }

    fn ensure_alive(&self) -> Result<()> {
        if !self.alive {
            bail!("target closed");
        }
        Ok(())
    }

    fn fails_at(&self, step: &str) -> bool {
        matches!(self.script(), Script::FailAt(s) if s == step)
    }
}

impl Portal for FakePortal {
    fn select_mode(&mut self) -> Result<()> {
        self.ensure_alive()
    }

    fn fill_identifier(&mut self, identifier: &Identifier) -> Result<()> {
        self.ensure_alive()?;
        self.current = Some(identifier.to_string());
        if self.fails_at("fill") {
            bail!("RUC input field not found");
        }
        Ok(())
    }

    fn submit_search(&mut self) -> Result<()> {
        self.ensure_alive()?;
        if let Some(id) = &self.current {
            self.submitted.push(id.clone());
        }
        match self.script() {
            Script::FailAt("submit") => Err(anyhow!("\"Consultar\" button not found")),
            Script::KillSession => {
                self.alive = false;
                Err(anyhow!("target closed"))
            }
            _ => Ok(()),
        }
    }

    fn wait_for_table(&mut self, _timeout: Duration) -> bool {
        self.alive && !matches!(self.script(), Script::NoResults)
    }

    fn open_first_detail_link(&mut self) -> Result<bool> {
        self.ensure_alive()?;
        Ok(!matches!(self.script(), Script::NoLinks))
    }

    fn extract_detail_rows(&mut self) -> Result<Vec<Vec<String>>> {
        self.ensure_alive()?;
        match self.script() {
            Script::Rows(rows) => Ok(rows),
            Script::FailAt("extract") => Err(anyhow!("detail table detached")),
            _ => Ok(Vec::new()),
        }
    }

    fn go_back(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.backs += 1;
        if self.fails_at("back") {
            bail!("history navigation failed");
        }
        Ok(())
    }

    fn obstacle_visible(&mut self) -> Result<bool> {
        if self.captcha_probe_fails {
            bail!("evaluation failed");
        }
        if self.captcha_checks > 0 {
            self.captcha_checks -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }

    fn reset(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.resets += 1;
        Ok(())
    }
}

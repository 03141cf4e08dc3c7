//! Publish scripts: replay a sequence of panel actions against a session.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use jw_core::{SignalKind, SignalValue};
use jw_project::schema::{StepDef, TargetRef, TargetValue};

use crate::error::{AppError, AppResult};
use crate::session::Session;

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    /// Timeline position when the step finished.
    pub at_ms: u64,
    pub step: String,
    #[serde(flatten)]
    pub status: StepStatus,
}

impl StepOutcome {
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Ok
    }
}

/// Every step's outcome, in order. A failing step does not stop the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    pub outcomes: Vec<StepOutcome>,
}

impl Transcript {
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            match &outcome.status {
                StepStatus::Ok => writeln!(
                    f,
                    "{:>3} {:>6}ms ok    {}",
                    outcome.index, outcome.at_ms, outcome.step
                )?,
                StepStatus::Failed { reason } => writeln!(
                    f,
                    "{:>3} {:>6}ms FAIL  {} ({})",
                    outcome.index, outcome.at_ms, outcome.step, reason
                )?,
            }
        }
        let failed = self.failures().count();
        write!(
            f,
            "{} steps, {} passed, {} failed",
            self.outcomes.len(),
            self.outcomes.len() - failed,
            failed
        )
    }
}

pub fn describe(step: &StepDef) -> String {
    match step {
        StepDef::Publish(tv) => format!("publish {} = {}", tv.target.label(), tv.value),
        StepDef::AdvanceMs(ms) => format!("advance {ms}ms"),
        StepDef::Expect(tv) => format!("expect {} == {}", tv.target.label(), tv.value),
    }
}

/// Run `steps` in order against `session`.
pub fn run(session: &Session, steps: &[StepDef]) -> Transcript {
    let mut transcript = Transcript::default();
    for (index, step) in steps.iter().enumerate() {
        let status = match execute(session, step) {
            Ok(()) => StepStatus::Ok,
            Err(e) => StepStatus::Failed {
                reason: e.to_string(),
            },
        };
        let outcome = StepOutcome {
            index,
            at_ms: session.timeline().now(),
            step: describe(step),
            status,
        };
        match &outcome.status {
            StepStatus::Ok => debug!(index, step = %outcome.step, "step ok"),
            StepStatus::Failed { reason } => {
                warn!(index, step = %outcome.step, %reason, "step failed")
            }
        }
        transcript.outcomes.push(outcome);
    }
    transcript
}

fn execute(session: &Session, step: &StepDef) -> AppResult<()> {
    match step {
        StepDef::Publish(tv) => session.publish(&tv.target, tv.value.clone()),
        StepDef::AdvanceMs(ms) => {
            session.advance(*ms);
            Ok(())
        }
        StepDef::Expect(tv) => {
            let actual = session.state(&tv.target)?;
            if actual == tv.value {
                Ok(())
            } else {
                Err(AppError::InvalidInput(format!(
                    "expected {}, found {}",
                    tv.value, actual
                )))
            }
        }
    }
}

/// Parse a command-line step.
///
/// `kind:address=value` publishes to a raw join, `wait:<ms>` advances the
/// timeline.
pub fn parse_step(input: &str) -> AppResult<StepDef> {
    let invalid = || {
        AppError::InvalidInput(format!(
            "step '{input}' is not 'kind:address=value' or 'wait:<ms>'"
        ))
    };

    let (head, rest) = input.split_once(':').ok_or_else(invalid)?;
    if head.trim() == "wait" {
        let ms = rest.trim().parse::<u64>().map_err(|_| invalid())?;
        return Ok(StepDef::AdvanceMs(ms));
    }

    let kind = SignalKind::from_str(head)?;
    let (address, value) = rest.split_once('=').ok_or_else(invalid)?;
    let address = address.trim();
    if address.is_empty() {
        return Err(invalid());
    }
    Ok(StepDef::Publish(TargetValue {
        target: TargetRef::address(kind, address),
        value: SignalValue::parse(kind, value)?,
    }))
}

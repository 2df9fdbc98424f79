//! Probe outcomes and the report they are collected into.

use std::fmt;

use crate::client::{parse_api_error, ProbeFailure, ProbeResponse};

/// Characters of response body shown in a summary line
pub const SNIPPET_LEN: usize = 100;

/// What a probe expects from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// HTTP 200
    Success,
    /// HTTP 200, or the resource already exists (409, or an ejabberd
    /// error body saying so outside 401/403)
    Idempotent,
    /// Any non-200 answer from the server
    Rejected,
    /// Any HTTP answer at all
    Reachable,
}

impl Expectation {
    pub fn is_met(&self, result: &Result<ProbeResponse, ProbeFailure>) -> bool {
        match (self, result) {
            (Self::Success, Ok(_)) => true,
            (Self::Success, Err(_)) => false,
            (Self::Idempotent, Ok(_)) => true,
            (Self::Idempotent, Err(ProbeFailure::Status { status, body })) => match *status {
                409 => true,
                401 | 403 => false,
                _ => parse_api_error(body)
                    .map_or(false, |e| e.message.to_lowercase().contains("already")),
            },
            (Self::Idempotent, Err(_)) => false,
            (Self::Rejected, Ok(_)) => false,
            (Self::Rejected, Err(failure)) => failure.is_http_status(),
            (Self::Reachable, Ok(_)) => true,
            (Self::Reachable, Err(failure)) => failure.is_http_status(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
    Skipped,
}

impl Verdict {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Pass => "✅",
            Self::Fail => "❌",
            Self::Skipped => "⏭️",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skipped => "SKIP",
        };
        f.write_str(label)
    }
}

/// Result of a probe: a completed request, or a skip with its reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Completed(Result<ProbeResponse, ProbeFailure>),
    Skipped(String),
}

/// One probe: what was asked, what was expected, what came back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub name: String,
    pub expectation: Expectation,
    pub result: ProbeResult,
    /// Extra detail for the summary line
    pub note: Option<String>,
}

impl ProbeOutcome {
    pub fn completed(
        name: impl Into<String>,
        expectation: Expectation,
        result: Result<ProbeResponse, ProbeFailure>,
    ) -> Self {
        Self {
            name: name.into(),
            expectation,
            result: ProbeResult::Completed(result),
            note: None,
        }
    }

    pub fn skipped(
        name: impl Into<String>,
        expectation: Expectation,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expectation,
            result: ProbeResult::Skipped(reason.into()),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn verdict(&self) -> Verdict {
        match &self.result {
            ProbeResult::Skipped(_) => Verdict::Skipped,
            ProbeResult::Completed(result) if self.expectation.is_met(result) => Verdict::Pass,
            ProbeResult::Completed(_) => Verdict::Fail,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict() == Verdict::Pass
    }

    /// The 200 response, if there was one.
    pub fn response(&self) -> Option<&ProbeResponse> {
        match &self.result {
            ProbeResult::Completed(Ok(response)) => Some(response),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match &self.result {
            ProbeResult::Completed(Err(failure)) => Some(failure),
            _ => None,
        }
    }

    /// One human-readable line.
    pub fn summary_line(&self) -> String {
        let verdict = self.verdict();
        let detail = match &self.result {
            ProbeResult::Skipped(reason) => format!("skipped: {}", reason),
            ProbeResult::Completed(Ok(response)) => {
                format!("[{}] {}", response.status, response.snippet(SNIPPET_LEN))
            }
            ProbeResult::Completed(Err(ProbeFailure::Status { status, body })) => {
                match parse_api_error(body) {
                    Some(api_error) => format!(
                        "[{}] {} (code {})",
                        status, api_error.message, api_error.code
                    ),
                    None => format!("[{}] {}", status, crate::client::snippet(body, SNIPPET_LEN)),
                }
            }
            ProbeResult::Completed(Err(failure)) => failure.to_string(),
        };

        let mut line = format!("{} {}: {}", verdict.symbol(), self.name, detail);
        if let Some(note) = &self.note {
            line.push_str(&format!(" ({})", note));
        }
        line
    }
}

/// Outcomes of a probe run, in execution order
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    outcomes: Vec<ProbeOutcome>,
}

impl ProbeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ProbeOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ProbeOutcome] {
        &self.outcomes
    }

    /// Look up an outcome by probe name
    pub fn get(&self, name: &str) -> Option<&ProbeOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    fn count(&self, verdict: Verdict) -> usize {
        self.outcomes.iter().filter(|o| o.verdict() == verdict).count()
    }

    pub fn passed(&self) -> usize {
        self.count(Verdict::Pass)
    }

    pub fn failed(&self) -> usize {
        self.count(Verdict::Fail)
    }

    pub fn skipped(&self) -> usize {
        self.count(Verdict::Skipped)
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

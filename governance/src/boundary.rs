//! Serving policy applied by the content-serving boundary.
//!
//! [`ComplianceEngine`](crate::compliance::ComplianceEngine) only classifies.
//! This module turns a report into a serving decision under a mode the
//! caller chooses.

use serde::{Deserialize, Serialize};

#[cfg(feature = "typescript")]
use ts_rs::TS;

use crate::compliance::ComplianceReport;

/// How blockers are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum ServingMode {
    /// Any blocker withholds the content
    #[default]
    Strict,
    /// Relaxable blockers become a notice; hard vetoes still withhold
    Lenient,
}

impl std::str::FromStr for ServingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown serving mode: {}", other)),
        }
    }
}

/// What the boundary does with a piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Disposition {
    /// Serve as-is
    Serve,
    /// Serve with the report's findings shown alongside
    ServeWithNotice { notices: Vec<String> },
    /// Show "content withheld" with a human-readable reason
    Withhold { reason: String },
}

impl Disposition {
    pub fn is_served(&self) -> bool {
        !matches!(self, Self::Withhold { .. })
    }
}

/// Caller-side serving policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ServingPolicy {
    /// Strict or lenient
    pub mode: ServingMode,
}

impl ServingPolicy {
    pub fn strict() -> Self {
        Self {
            mode: ServingMode::Strict,
        }
    }

    pub fn lenient() -> Self {
        Self {
            mode: ServingMode::Lenient,
        }
    }

    /// Decide how to serve content given its report.
    pub fn disposition(&self, report: &ComplianceReport) -> Disposition {
        if report.can_deploy {
            return if report.warnings.is_empty() {
                Disposition::Serve
            } else {
                Disposition::ServeWithNotice {
                    notices: report.warnings.iter().map(|w| w.message.clone()).collect(),
                }
            };
        }

        // Hard vetoes are never relaxed
        let hard: Vec<&str> = report
            .blockers
            .iter()
            .filter(|b| b.is_hard_veto())
            .map(|b| b.message.as_str())
            .collect();

        match self.mode {
            ServingMode::Lenient if hard.is_empty() && !report.blockers.is_empty() => {
                Disposition::ServeWithNotice {
                    notices: report
                        .blockers
                        .iter()
                        .chain(report.warnings.iter())
                        .map(|f| f.message.clone())
                        .collect(),
                }
            }
            _ => {
                let messages: Vec<&str> = if hard.is_empty() {
                    report.blockers.iter().map(|b| b.message.as_str()).collect()
                } else {
                    hard
                };
                let reason = if messages.is_empty() {
                    "content withheld".to_string()
                } else {
                    format!("content withheld: {}", messages.join("; "))
                };
                Disposition::Withhold { reason }
            }
        }
    }
}

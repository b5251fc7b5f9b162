//! # Severity / Priority Mapper — Single Source of Truth
//!
//! Defines the ordered [`Severity`] scale, the [`FindingType`]
//! classification, the escalation [`Priority`], and the one function that
//! relates them: [`escalate`].
//!
//! Every workflow variant (audit, inspection, work permit, license,
//! security incident) derives finding priority and the verification gate
//! from this module. There is no per-variant mapping table.
//!
//! ## Mapping
//!
//! | Severity | Priority | Requires verification |
//! |----------|----------|-----------------------|
//! | Negligible | Low | no |
//! | Minor | Low | no |
//! | Moderate | Medium | no |
//! | Major | High | yes |
//! | Critical | Critical | yes |
//! | Catastrophic | Critical | yes |
//!
//! A [`FindingType::CriticalNonConformance`] always requires verification,
//! whatever its severity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HsseError;

/// Ordered impact scale of a finding.
///
/// Declaration order is the canonical ordering:
/// `Negligible < Minor < Moderate < Major < Critical < Catastrophic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// No measurable impact.
    Negligible,
    /// Minor deviation, no risk to people or environment.
    Minor,
    /// Deviation with limited, contained impact.
    Moderate,
    /// Significant deviation; formal verification required before closure.
    Major,
    /// Serious risk to people, assets or environment.
    Critical,
    /// Loss of life or irreversible environmental damage.
    Catastrophic,
}

impl Severity {
    /// All severities in canonical order.
    pub fn all() -> &'static [Severity] {
        &[
            Self::Negligible,
            Self::Minor,
            Self::Moderate,
            Self::Major,
            Self::Critical,
            Self::Catastrophic,
        ]
    }

    /// The snake_case identifier, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negligible => "negligible",
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Critical => "critical",
            Self::Catastrophic => "catastrophic",
        }
    }

    /// Escalation priority for this severity.
    pub fn priority(&self) -> Priority {
        match self {
            Self::Critical | Self::Catastrophic => Priority::Critical,
            Self::Major => Priority::High,
            Self::Moderate => Priority::Medium,
            Self::Negligible | Self::Minor => Priority::Low,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = HsseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| HsseError::UnknownVariant {
                kind: "severity",
                value: s.to_string(),
            })
    }
}

/// Classification of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingType {
    /// Requirement not met.
    NonConformance,
    /// Noted condition that is not (yet) a non-conformance.
    Observation,
    /// Suggested improvement.
    OpportunityForImprovement,
    /// Good practice worth recording.
    PositiveFinding,
    /// Requirement not met with immediate risk; always verified.
    CriticalNonConformance,
}

impl FindingType {
    /// All finding types.
    pub fn all() -> &'static [FindingType] {
        &[
            Self::NonConformance,
            Self::Observation,
            Self::OpportunityForImprovement,
            Self::PositiveFinding,
            Self::CriticalNonConformance,
        ]
    }

    /// The snake_case identifier, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonConformance => "non_conformance",
            Self::Observation => "observation",
            Self::OpportunityForImprovement => "opportunity_for_improvement",
            Self::PositiveFinding => "positive_finding",
            Self::CriticalNonConformance => "critical_non_conformance",
        }
    }
}

impl std::fmt::Display for FindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingType {
    type Err = HsseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| HsseError::UnknownVariant {
                kind: "finding type",
                value: s.to_string(),
            })
    }
}

/// Escalation priority of a finding or corrective action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Routine follow-up.
    Low,
    /// Address within the normal remediation cycle.
    Medium,
    /// Address ahead of routine work.
    High,
    /// Immediate attention.
    Critical,
}

impl Priority {
    /// All priorities in ascending order.
    pub fn all() -> &'static [Priority] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    /// The snake_case identifier, matching the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = HsseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| HsseError::UnknownVariant {
                kind: "priority",
                value: s.to_string(),
            })
    }
}

/// Result of mapping a finding's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    /// Priority assigned to the finding and to actions derived from it.
    pub priority: Priority,
    /// Whether the finding must pass through Verified before closure.
    pub requires_verification: bool,
}

/// Map a finding's severity and type to its escalation.
///
/// Pure and stateless.
pub fn escalate(severity: Severity, finding_type: FindingType) -> Escalation {
    Escalation {
        priority: severity.priority(),
        requires_verification: severity >= Severity::Major
            || finding_type == FindingType::CriticalNonConformance,
    }
}

//! Column Mapper: free-form SCADA headers to canonical field roles
//!
//! Detection is driven by an ordered rule table ([`DEFAULT_RULES`]). Roles
//! are resolved in table order; within a role the first header (in column
//! order) containing any of the role's keywords, case-insensitively, wins.
//! A header claimed by one role is not offered to later roles.
//!
//! ## Positional Fallback
//!
//! With `positional_fallback` enabled, an undetected `time` role takes the
//! first column and an undetected `power` role takes the second, provided
//! those columns exist and are still unclaimed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::types::AnalysisError;

// ============================================================================
// Roles
// ============================================================================

/// Canonical semantic role a column can play.
///
/// Declaration order is the resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldRole {
    Time,
    Power,
    WindSpeed,
    WindDirection,
    AssetId,
    Temperature,
}

impl FieldRole {
    pub const ALL: [FieldRole; 6] = [
        FieldRole::Time,
        FieldRole::Power,
        FieldRole::WindSpeed,
        FieldRole::WindDirection,
        FieldRole::AssetId,
        FieldRole::Temperature,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldRole::Time => "time",
            FieldRole::Power => "power",
            FieldRole::WindSpeed => "wind_speed",
            FieldRole::WindDirection => "wind_direction",
            FieldRole::AssetId => "asset_id",
            FieldRole::Temperature => "temperature",
        }
    }

    /// Roles without which no analysis is possible.
    pub fn is_required(&self) -> bool {
        matches!(self, FieldRole::Time | FieldRole::Power)
    }

    /// Column index used by positional fallback, if the role has one.
    fn fallback_column(&self) -> Option<usize> {
        match self {
            FieldRole::Time => Some(0),
            FieldRole::Power => Some(1),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Rule Table
// ============================================================================

/// One row of the detection table: a role and the keywords that signal it.
#[derive(Debug, Clone, Copy)]
pub struct RoleRule {
    pub role: FieldRole,
    pub keywords: &'static [&'static str],
}

/// Built-in detection rules, in resolution order.
pub const DEFAULT_RULES: [RoleRule; 6] = [
    RoleRule { role: FieldRole::Time, keywords: &["time", "date", "timestamp", "ts"] },
    RoleRule { role: FieldRole::Power, keywords: &["power", "kw", "mw", "active_power"] },
    RoleRule { role: FieldRole::WindSpeed, keywords: &["speed", "ws", "vel", "velocity"] },
    RoleRule { role: FieldRole::WindDirection, keywords: &["direction", "wd", "angle"] },
    RoleRule { role: FieldRole::AssetId, keywords: &["turbine", "id", "asset"] },
    RoleRule { role: FieldRole::Temperature, keywords: &["temp", "temperature"] },
];

/// Decides whether a header can play a particular role.
///
/// Implementations must be pure functions of the header text.
pub trait RoleDetector: Send + Sync {
    fn role(&self) -> FieldRole;

    fn matches(&self, header: &str) -> bool;
}

/// Case-insensitive substring match against a keyword set.
#[derive(Debug, Clone)]
pub struct KeywordDetector {
    role: FieldRole,
    keywords: Vec<String>,
}

impl KeywordDetector {
    pub fn new(role: FieldRole, keywords: &[&str]) -> Self {
        Self {
            role,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl From<&RoleRule> for KeywordDetector {
    fn from(rule: &RoleRule) -> Self {
        Self::new(rule.role, rule.keywords)
    }
}

impl RoleDetector for KeywordDetector {
    fn role(&self) -> FieldRole {
        self.role
    }

    fn matches(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        self.keywords.iter().any(|k| header.contains(k.as_str()))
    }
}

// ============================================================================
// Role Map
// ============================================================================

/// How a column came to be bound to its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    Keyword,
    Positional,
}

/// A column bound to a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnBinding {
    pub index: usize,
    pub header: String,
    pub source: BindingSource,
}

/// Role → column assignment for one dataset. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldRoleMap {
    bindings: BTreeMap<FieldRole, ColumnBinding>,
}

impl FieldRoleMap {
    pub fn get(&self, role: FieldRole) -> Option<&ColumnBinding> {
        self.bindings.get(&role)
    }

    pub fn column(&self, role: FieldRole) -> Option<usize> {
        self.get(role).map(|b| b.index)
    }

    pub fn header(&self, role: FieldRole) -> Option<&str> {
        self.get(role).map(|b| b.header.as_str())
    }

    pub fn contains(&self, role: FieldRole) -> bool {
        self.bindings.contains_key(&role)
    }

    /// The binding for `role`, or `MissingRequiredField` naming it.
    pub fn require(&self, role: FieldRole) -> Result<&ColumnBinding, AnalysisError> {
        self.get(role)
            .ok_or(AnalysisError::MissingRequiredField { role })
    }

    /// Fail on the first unresolved required role, in resolution order.
    pub fn ensure_required(&self) -> Result<(), AnalysisError> {
        for role in FieldRole::ALL.iter().filter(|r| r.is_required()) {
            self.require(*role)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// One-line summary for logs, e.g. `time='Date' power='kW' wind_speed=-`.
    pub fn summary(&self) -> String {
        FieldRole::ALL
            .iter()
            .map(|role| match self.header(*role) {
                Some(h) => format!("{role}='{h}'"),
                None => format!("{role}=-"),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ============================================================================
// Mapper
// ============================================================================

/// Resolves a header list to a [`FieldRoleMap`].
pub struct ColumnMapper {
    detectors: Vec<Box<dyn RoleDetector>>,
    positional_fallback: bool,
}

impl ColumnMapper {
    /// Mapper over [`DEFAULT_RULES`].
    pub fn new(positional_fallback: bool) -> Self {
        let detectors = DEFAULT_RULES
            .iter()
            .map(|rule| Box::new(KeywordDetector::from(rule)) as Box<dyn RoleDetector>)
            .collect();
        Self::with_detectors(detectors, positional_fallback)
    }

    /// Mapper over custom detectors. Detectors are consulted in the given
    /// order; a later detector for an already-bound role is ignored.
    pub fn with_detectors(detectors: Vec<Box<dyn RoleDetector>>, positional_fallback: bool) -> Self {
        Self {
            detectors,
            positional_fallback,
        }
    }

    pub fn map(&self, headers: &[String]) -> FieldRoleMap {
        let mut claimed = vec![false; headers.len()];
        let mut bindings = BTreeMap::new();

        for detector in &self.detectors {
            let role = detector.role();
            if bindings.contains_key(&role) {
                continue;
            }
            let hit = headers
                .iter()
                .enumerate()
                .find(|(idx, header)| !claimed[*idx] && detector.matches(header));
            if let Some((idx, header)) = hit {
                claimed[idx] = true;
                debug!(role = %role, column = idx, header = %header, "Column matched by keyword");
                bindings.insert(
                    role,
                    ColumnBinding {
                        index: idx,
                        header: header.clone(),
                        source: BindingSource::Keyword,
                    },
                );
            }
        }

        if self.positional_fallback {
            for role in FieldRole::ALL {
                let Some(idx) = role.fallback_column() else { continue };
                if bindings.contains_key(&role) || idx >= headers.len() || claimed[idx] {
                    continue;
                }
                claimed[idx] = true;
                warn!(
                    role = %role,
                    column = idx,
                    header = %headers[idx],
                    "No header matched role, using positional fallback"
                );
                bindings.insert(
                    role,
                    ColumnBinding {
                        index: idx,
                        header: headers[idx].clone(),
                        source: BindingSource::Positional,
                    },
                );
            }
        }

        let map = FieldRoleMap { bindings };
        info!(columns = headers.len(), "Column mapping: {}", map.summary());
        map
    }
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(false)
    }
}

// ============================================================================
// Tests
// ============================================================================

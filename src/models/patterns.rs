use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Aspect, Body};
use crate::error::ChartError;

/// Aspect configurations the pattern detector can recognise
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    GrandTrine,
    TSquare,
    Yod,
    GrandCross,
    Kite,
    MysticRectangle,
}

impl PatternKind {
    pub fn all() -> &'static [PatternKind] {
        &[
            PatternKind::GrandTrine,
            PatternKind::TSquare,
            PatternKind::Yod,
            PatternKind::GrandCross,
            PatternKind::Kite,
            PatternKind::MysticRectangle,
        ]
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternKind::GrandTrine => "Grand Trine",
            PatternKind::TSquare => "T-Square",
            PatternKind::Yod => "Yod",
            PatternKind::GrandCross => "Grand Cross",
            PatternKind::Kite => "Kite",
            PatternKind::MysticRectangle => "Mystic Rectangle",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PatternKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "grandtrine" => Ok(PatternKind::GrandTrine),
            "tsquare" => Ok(PatternKind::TSquare),
            "yod" => Ok(PatternKind::Yod),
            "grandcross" => Ok(PatternKind::GrandCross),
            "kite" => Ok(PatternKind::Kite),
            "mysticrectangle" => Ok(PatternKind::MysticRectangle),
            _ => Err(ChartError::invalid(format!("Invalid pattern type: {}", s))),
        }
    }
}

/// A detected configuration together with the aspects that justify it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Pattern {
    pub kind: PatternKind,
    /// Participants in canonical order
    pub participants: Vec<Body>,
    /// Focal body for T-Square, Yod and Kite
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apex: Option<Body>,
    pub aspects: Vec<Aspect>,
}

//! Skill audit: cross-reference skill documents with current documentation
//! pages and render change recommendations.

pub mod matcher;
pub mod report;
pub mod shapes;

use std::fmt;
use std::str::FromStr;

use crate::detector::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// The skill shows code the docs no longer contain
    Outdated,
    /// The skill makes claims no matched page supports
    Missing,
    /// The docs use a different name for something the skill shows
    Incorrect,
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Outdated => "Outdated",
            Category::Missing => "Missing",
            Category::Incorrect => "Incorrect",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "outdated" | "stale" => Ok(Category::Outdated),
            "missing" => Ok(Category::Missing),
            "incorrect" | "wrong" => Ok(Category::Incorrect),
            _ => Err(()),
        }
    }
}

/// A detected divergence between a skill and the current documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecommendation {
    pub skill_name: String,
    pub category: Category,
    pub current_text: String,
    pub docs_text: String,
    pub suggested_change: String,
}

/// Outcome of auditing one skill document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillAudit {
    pub skill_name: String,
    pub dialect: Dialect,
    /// Documentation URLs consulted, in fetch order
    pub sources: Vec<String>,
    pub recommendations: Vec<AuditRecommendation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_str() {
        assert_eq!(Category::from_str("Outdated"), Ok(Category::Outdated));
        assert_eq!(Category::from_str(" missing "), Ok(Category::Missing));
        assert_eq!(Category::from_str("INCORRECT"), Ok(Category::Incorrect));
        assert!(Category::from_str("maybe").is_err());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Incorrect.to_string(), "Incorrect");
    }
}

//! Dataset filtering and grouping primitives

use crate::core::types::RiskLevel;
use crate::dataset::MerchantRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Requested time window for a query.
///
/// No per-month history exists yet, so applying a time range is a
/// documented pass-through: results always reflect the current snapshot
/// ("all time" semantics). The range is still echoed in results so the
/// composition layer can phrase the limitation honestly.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Pass-through pending historical data. Kept as a pipeline stage so
    /// real filtering can slot in without reshaping the executor.
    pub fn apply<'a>(&self, records: Vec<&'a MerchantRecord>) -> Vec<&'a MerchantRecord> {
        if self.start.is_some() || self.end.is_some() {
            tracing::debug!("time-range filter requested but no history exists; returning all");
        }
        records
    }
}

/// Field a breakdown can be partitioned by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    RiskLevel,
    Category,
    Floor,
}

impl GroupKey {
    /// The partition value of one record.
    pub fn value_of(&self, record: &MerchantRecord) -> String {
        match self {
            GroupKey::RiskLevel => record.risk_level.as_str().to_string(),
            GroupKey::Category => record.category.clone(),
            GroupKey::Floor => record.floor.clone(),
        }
    }
}

/// Conjunction of predicates; an absent field means "no restriction",
/// never "exclude all".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MerchantFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_levels: Option<Vec<RiskLevel>>,
    /// Matches the full category string or its macro segment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
}

impl MerchantFilter {
    pub fn matches(&self, record: &MerchantRecord) -> bool {
        if let Some(levels) = &self.risk_levels {
            if !levels.contains(&record.risk_level) {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            let hit = categories
                .iter()
                .any(|c| record.category == *c || record.macro_category() == c);
            if !hit {
                return false;
            }
        }
        if let Some(floors) = &self.floors {
            if !floors.contains(&record.floor) {
                return false;
            }
        }
        if let Some(min) = self.min_score {
            if record.health_score < min {
                return false;
            }
        }
        if let Some(max) = self.max_score {
            if record.health_score > max {
                return false;
            }
        }
        true
    }

    /// Filter a snapshot, preserving dataset order.
    pub fn apply<'a>(&self, records: &'a [MerchantRecord]) -> Vec<&'a MerchantRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::store::sample_merchants;

    #[test]
    fn test_empty_filter_keeps_everything() {
        let merchants = sample_merchants();
        let filter = MerchantFilter::default();
        assert_eq!(filter.apply(&merchants).len(), merchants.len());
    }

    #[test]
    fn test_risk_level_membership() {
        let merchants = sample_merchants();
        let filter = MerchantFilter {
            risk_levels: Some(vec![RiskLevel::High, RiskLevel::Critical]),
            ..Default::default()
        };
        let out = filter.apply(&merchants);
        assert!(!out.is_empty());
        assert!(out
            .iter()
            .all(|m| m.risk_level >= RiskLevel::High));
    }

    #[test]
    fn test_macro_category_matches() {
        let merchants = sample_merchants();
        let filter = MerchantFilter {
            categories: Some(vec!["餐饮".to_string()]),
            ..Default::default()
        };
        let out = filter.apply(&merchants);
        assert!(!out.is_empty());
        assert!(out.iter().all(|m| m.macro_category() == "餐饮"));
    }

    #[test]
    fn test_score_bounds() {
        let merchants = sample_merchants();
        let filter = MerchantFilter {
            min_score: Some(70.0),
            max_score: Some(85.0),
            ..Default::default()
        };
        for m in filter.apply(&merchants) {
            assert!(m.health_score >= 70.0 && m.health_score <= 85.0);
        }
    }

    #[test]
    fn test_time_range_is_pass_through() {
        let merchants = sample_merchants();
        let all: Vec<&MerchantRecord> = merchants.iter().collect();
        let range = TimeRange {
            start: Some(Utc::now()),
            end: None,
        };
        assert_eq!(range.apply(all).len(), merchants.len());
    }

    #[test]
    fn test_group_key_values() {
        let merchants = sample_merchants();
        let m = &merchants[0];
        assert_eq!(GroupKey::Floor.value_of(m), m.floor);
        assert_eq!(GroupKey::RiskLevel.value_of(m), m.risk_level.as_str());
    }
}

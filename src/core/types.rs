//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// External identifier of a merchant record.
///
/// Ids are assigned by the dataset provider (e.g. "M1024") and are opaque
/// to this core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MerchantId(pub String);

impl MerchantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MerchantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for execution plans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub Uuid);

impl PlanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

/// Risk bucket derived from a merchant's health score.
///
/// Ordered: `None < Low < Medium < High < Critical`. The bucketing itself
/// is maintained by the dataset provider, not by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::None,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Machine-readable key, used for group-by breakdowns and serde.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// User-facing label for prompts and insight text.
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::None => "无风险",
            RiskLevel::Low => "低风险",
            RiskLevel::Medium => "中风险",
            RiskLevel::High => "高风险",
            RiskLevel::Critical => "重大风险",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "无风险" => Some(RiskLevel::None),
            "low" | "低风险" => Some(RiskLevel::Low),
            "medium" | "中风险" => Some(RiskLevel::Medium),
            "high" | "高风险" => Some(RiskLevel::High),
            "critical" | "重大风险" => Some(RiskLevel::Critical),
            _ => None,
        }
    }
}

/// Selector for the numeric fields a reduction or comparison can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    HealthScore,
    Collection,
    Operational,
    SiteQuality,
    CustomerReview,
    RiskResistance,
    MonthlyRevenue,
    MonthlyRent,
    RentToSales,
}

impl MetricField {
    /// Parse the loose field aliases the orchestrating layer produces.
    ///
    /// Accepts both this crate's snake_case names and the legacy camelCase
    /// selectors still emitted by older intent classifiers ("totalScore").
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "health_score" | "healthScore" | "totalScore" | "total_score" | "score" => {
                Some(MetricField::HealthScore)
            }
            "collection" | "collectionScore" => Some(MetricField::Collection),
            "operational" | "operation" | "operationScore" => Some(MetricField::Operational),
            "site_quality" | "siteQuality" | "site" => Some(MetricField::SiteQuality),
            "customer_review" | "customerReview" | "review" => Some(MetricField::CustomerReview),
            "risk_resistance" | "riskResistance" | "resilience" => {
                Some(MetricField::RiskResistance)
            }
            "monthly_revenue" | "monthlyRevenue" | "revenue" | "sales" => {
                Some(MetricField::MonthlyRevenue)
            }
            "monthly_rent" | "monthlyRent" | "rent" => Some(MetricField::MonthlyRent),
            "rent_to_sales" | "rentToSales" | "rent_ratio" => Some(MetricField::RentToSales),
            _ => None,
        }
    }

    /// User-facing label for insight text.
    pub fn label(&self) -> &'static str {
        match self {
            MetricField::HealthScore => "健康分",
            MetricField::Collection => "收缴表现",
            MetricField::Operational => "经营表现",
            MetricField::SiteQuality => "现场品质",
            MetricField::CustomerReview => "顾客口碑",
            MetricField::RiskResistance => "抗风险能力",
            MetricField::MonthlyRevenue => "月营业额",
            MetricField::MonthlyRent => "月租金",
            MetricField::RentToSales => "租售比",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::None < RiskLevel::Low);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_serde_lowercase() {
        let json = serde_json::to_string(&RiskLevel::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        let back: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(back, RiskLevel::Medium);
    }

    #[test]
    fn test_metric_field_legacy_aliases() {
        assert_eq!(MetricField::parse("totalScore"), Some(MetricField::HealthScore));
        assert_eq!(MetricField::parse("revenue"), Some(MetricField::MonthlyRevenue));
        assert_eq!(MetricField::parse("bogus"), None);
    }
}

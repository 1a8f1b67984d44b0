//! Classified query intents
//!
//! Intent classification proper belongs to the orchestrating layer; this
//! module defines the intent vocabulary the planner consumes, plus a
//! keyword fallback classifier for callers (and the demo binary) that do
//! not bring their own model-backed classification.

use serde::{Deserialize, Serialize};

/// The request categories the planner knows how to expand into tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// "这家店经营得怎么样": single-merchant status readout
    MerchantStatus,
    /// "有哪些风险商户": risk surfacing
    RiskWarning,
    /// "给点整改建议": remediation recommendation
    Recommendation,
    /// "统计一下各风险等级的商户数": set-valued aggregation
    Aggregation,
    /// "和同类比怎么样": baseline comparison
    Comparison,
    /// "最近的走势如何": trend over time
    TrendAnalysis,
    /// Small talk and anything else answered purely generatively
    Conversational,
    /// Could not classify
    Unknown,
}

impl QueryIntent {
    /// Intents whose plans go through the analytical executors.
    pub fn is_analytical(&self) -> bool {
        matches!(
            self,
            QueryIntent::Aggregation | QueryIntent::Comparison | QueryIntent::TrendAnalysis
        )
    }

    /// Keyword fallback classifier.
    ///
    /// Production callers are expected to classify upstream and pass the
    /// result in; this heuristic keeps the pipeline usable without one.
    pub fn infer(text: &str) -> QueryIntent {
        let t = text.trim();
        if t.is_empty() {
            return QueryIntent::Unknown;
        }

        const AGGREGATION: &[&str] = &["统计", "多少家", "几家", "总数", "平均", "汇总", "分布"];
        const COMPARISON: &[&str] = &["对比", "比较", "相比", "环比", "同比", "差距", "比一比"];
        const TREND: &[&str] = &["趋势", "走势", "变化", "近几个月"];
        const RECOMMENDATION: &[&str] = &["建议", "怎么办", "如何改", "整改", "提升方案"];
        const RISK: &[&str] = &["风险", "预警", "异常", "警告", "隐患"];
        const STATUS: &[&str] = &["怎么样", "如何", "情况", "状态", "健康", "经营"];

        let hit = |keys: &[&str]| keys.iter().any(|k| t.contains(k));

        if hit(AGGREGATION) {
            QueryIntent::Aggregation
        } else if hit(COMPARISON) {
            QueryIntent::Comparison
        } else if hit(TREND) {
            QueryIntent::TrendAnalysis
        } else if hit(RECOMMENDATION) {
            QueryIntent::Recommendation
        } else if hit(RISK) {
            QueryIntent::RiskWarning
        } else if hit(STATUS) {
            QueryIntent::MerchantStatus
        } else {
            QueryIntent::Conversational
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_aggregation_over_status() {
        // "统计" outranks the trailing "情况"
        assert_eq!(QueryIntent::infer("统计一下高风险商户的情况"), QueryIntent::Aggregation);
    }

    #[test]
    fn test_infer_status() {
        assert_eq!(QueryIntent::infer("海底捞最近怎么样"), QueryIntent::MerchantStatus);
    }

    #[test]
    fn test_infer_comparison() {
        assert_eq!(QueryIntent::infer("和同楼层比一比"), QueryIntent::Comparison);
    }

    #[test]
    fn test_infer_fallbacks() {
        assert_eq!(QueryIntent::infer(""), QueryIntent::Unknown);
        assert_eq!(QueryIntent::infer("你好呀"), QueryIntent::Conversational);
    }
}

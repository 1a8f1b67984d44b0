//! Baseline comparisons for a single merchant
//!
//! Four shapes, dispatched by target: prior period (time), same-category
//! peer average, same-floor peer average, and merchant-vs-merchant. A
//! missing or unrecognized target degrades to the time comparison so the
//! assistant stays responsive instead of failing the turn.

use crate::core::config::AssistantConfig;
use crate::core::error::{OpsError, Result};
use crate::core::types::MetricField;
use crate::dataset::{MerchantRecord, MerchantRef};
use crate::query::history::{BaselineWindow, HistoryProvider, SimulatedHistory};
use crate::query::insight;
use serde::{Deserialize, Serialize};

/// The numeric fields every comparison covers, in report order
const COMPARED_FIELDS: [MetricField; 8] = [
    MetricField::HealthScore,
    MetricField::Collection,
    MetricField::Operational,
    MetricField::SiteQuality,
    MetricField::CustomerReview,
    MetricField::RiskResistance,
    MetricField::MonthlyRevenue,
    MetricField::RentToSales,
];

/// What the subject is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonTarget {
    /// Prior-period snapshot of the same record
    Time,
    /// Arithmetic mean of same-category peers, excluding the subject
    Category,
    /// Arithmetic mean of same-floor peers, excluding the subject
    Floor,
    /// A second explicitly named record
    Merchant,
}

/// One comparison request from the planner/orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRequest {
    /// Absent or unusable targets degrade to `Time`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ComparisonTarget>,
    /// Subject reference: merchant id or display name
    pub merchant: String,
    /// The other record for merchant-vs-merchant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
    #[serde(default)]
    pub window: BaselineWindow,
}

impl ComparisonRequest {
    pub fn new(merchant: impl Into<String>, target: ComparisonTarget) -> Self {
        Self {
            target: Some(target),
            merchant: merchant.into(),
            other: None,
            window: BaselineWindow::default(),
        }
    }
}

/// current − baseline, with the percentage share of the baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaReport {
    pub absolute: f64,
    /// `None` renders as "N/A": the baseline was exactly zero
    pub percent: Option<f64>,
}

impl DeltaReport {
    pub fn between(current: f64, baseline: f64) -> Self {
        let absolute = current - baseline;
        let percent = if baseline == 0.0 {
            None
        } else {
            Some(crate::query::aggregation::round2(absolute / baseline * 100.0))
        };
        Self { absolute, percent }
    }
}

impl std::fmt::Display for DeltaReport {
    /// `<absolute> (<signed percentage>)`, percentage "N/A" on a zero
    /// baseline.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.percent {
            Some(pct) => write!(f, "{:+.2} ({:+.1}%)", self.absolute, pct),
            None => write!(f, "{:+.2} (N/A)", self.absolute),
        }
    }
}

/// One compared field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldComparison {
    pub field: MetricField,
    pub current: f64,
    pub baseline: f64,
    pub delta: DeltaReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Effective target after any degrade
    pub target: ComparisonTarget,
    pub subject: MerchantRef,
    /// Human-readable description of the baseline
    pub baseline_label: String,
    pub fields: Vec<FieldComparison>,
    /// 1–4 short observations
    pub insights: Vec<String>,
    /// The literal records the baseline was computed over
    pub baseline_records: Vec<MerchantRef>,
}

pub struct ComparisonExecutor<H: HistoryProvider = SimulatedHistory> {
    history: H,
    config: AssistantConfig,
}

impl Default for ComparisonExecutor<SimulatedHistory> {
    fn default() -> Self {
        Self::new(SimulatedHistory::default(), AssistantConfig::default())
    }
}

impl<H: HistoryProvider> ComparisonExecutor<H> {
    pub fn new(history: H, config: AssistantConfig) -> Self {
        Self { history, config }
    }

    /// Execute one comparison over an immutable snapshot.
    pub fn execute(
        &self,
        request: &ComparisonRequest,
        dataset: &[MerchantRecord],
    ) -> Result<ComparisonResult> {
        let subject = resolve(dataset, &request.merchant)?;

        let target = match request.target {
            Some(ComparisonTarget::Merchant) if request.other.is_none() => {
                tracing::warn!("merchant comparison without counterpart; degrading to time");
                ComparisonTarget::Time
            }
            Some(t) => t,
            None => {
                tracing::warn!("comparison without target; degrading to time");
                ComparisonTarget::Time
            }
        };

        match target {
            ComparisonTarget::Time => self.compare_to_prior(subject, request.window),
            ComparisonTarget::Category => self.compare_to_peers(
                subject,
                dataset,
                ComparisonTarget::Category,
                "同品类",
                |peer| peer.category == subject.category,
            ),
            ComparisonTarget::Floor => self.compare_to_peers(
                subject,
                dataset,
                ComparisonTarget::Floor,
                "同楼层",
                |peer| peer.floor == subject.floor,
            ),
            ComparisonTarget::Merchant => {
                let other_key = request
                    .other
                    .as_deref()
                    .unwrap_or_default();
                let other = resolve(dataset, other_key)?;
                self.compare_to_merchant(subject, other)
            }
        }
    }

    fn compare_to_prior(
        &self,
        subject: &MerchantRecord,
        window: BaselineWindow,
    ) -> Result<ComparisonResult> {
        let prior = self.history.prior_record(subject, window);
        let fields = field_comparisons(subject, |f| prior.metric(f));
        let insights = insight::time_insights(&self.config, &fields);
        Ok(ComparisonResult {
            target: ComparisonTarget::Time,
            subject: MerchantRef::from(subject),
            baseline_label: format!("{}数据", window.label()),
            fields,
            insights,
            baseline_records: vec![MerchantRef::from(&prior)],
        })
    }

    fn compare_to_peers(
        &self,
        subject: &MerchantRecord,
        dataset: &[MerchantRecord],
        target: ComparisonTarget,
        scope: &str,
        is_peer: impl Fn(&MerchantRecord) -> bool,
    ) -> Result<ComparisonResult> {
        let peers: Vec<&MerchantRecord> = dataset
            .iter()
            .filter(|m| m.id != subject.id && is_peer(m))
            .collect();

        let fields = field_comparisons(subject, |f| {
            if peers.is_empty() {
                0.0
            } else {
                peers.iter().map(|p| p.metric(f)).sum::<f64>() / peers.len() as f64
            }
        });

        let insights = if peers.is_empty() {
            vec![format!("暂无{}商户可供对比", scope)]
        } else {
            insight::peer_insights(&self.config, scope, &fields)
        };

        Ok(ComparisonResult {
            target,
            subject: MerchantRef::from(subject),
            baseline_label: format!("{}均值（不含自身，{}家）", scope, peers.len()),
            fields,
            insights,
            baseline_records: peers.iter().map(|p| MerchantRef::from(*p)).collect(),
        })
    }

    fn compare_to_merchant(
        &self,
        subject: &MerchantRecord,
        other: &MerchantRecord,
    ) -> Result<ComparisonResult> {
        let fields = field_comparisons(subject, |f| other.metric(f));
        let insights =
            insight::versus_insights(&self.config, &subject.name, &other.name, &fields);
        Ok(ComparisonResult {
            target: ComparisonTarget::Merchant,
            subject: MerchantRef::from(subject),
            baseline_label: other.name.clone(),
            fields,
            insights,
            baseline_records: vec![MerchantRef::from(other)],
        })
    }
}

fn field_comparisons(
    subject: &MerchantRecord,
    baseline_of: impl Fn(MetricField) -> f64,
) -> Vec<FieldComparison> {
    COMPARED_FIELDS
        .iter()
        .map(|&field| {
            let current = subject.metric(field);
            let baseline = baseline_of(field);
            FieldComparison {
                field,
                current,
                baseline,
                delta: DeltaReport::between(current, baseline),
            }
        })
        .collect()
}

/// Resolve a loose reference (id, exact name, then name fragment) to a
/// record, naming the missing reference on failure.
fn resolve<'a>(dataset: &'a [MerchantRecord], reference: &str) -> Result<&'a MerchantRecord> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(OpsError::MerchantNotFound("<empty>".to_string()));
    }
    dataset
        .iter()
        .find(|m| m.id.as_str() == reference)
        .or_else(|| dataset.iter().find(|m| m.name == reference))
        .or_else(|| dataset.iter().find(|m| m.name.contains(reference)))
        .ok_or_else(|| OpsError::MerchantNotFound(reference.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::store::sample_merchants;

    fn executor() -> ComparisonExecutor<SimulatedHistory> {
        ComparisonExecutor::default()
    }

    #[test]
    fn test_time_comparison_shape() {
        let merchants = sample_merchants();
        let request = ComparisonRequest::new("M001", ComparisonTarget::Time);
        let result = executor().execute(&request, &merchants).unwrap();
        assert_eq!(result.target, ComparisonTarget::Time);
        assert_eq!(result.fields.len(), 8);
        assert!(!result.insights.is_empty() && result.insights.len() <= 4);
        assert_eq!(result.baseline_records.len(), 1);
    }

    #[test]
    fn test_category_peers_exclude_self() {
        let merchants = sample_merchants();
        let request = ComparisonRequest::new("海底捞火锅", ComparisonTarget::Category);
        let result = executor().execute(&request, &merchants).unwrap();
        assert!(result
            .baseline_records
            .iter()
            .all(|r| r.id.as_str() != "M001"));
        // 呷哺呷哺火锅 is the only other 餐饮-火锅 record
        assert_eq!(result.baseline_records.len(), 1);
        let health = &result.fields[0];
        let peer = merchants.iter().find(|m| m.id.as_str() == "M002").unwrap();
        assert_eq!(health.baseline, peer.health_score);
    }

    #[test]
    fn test_floor_peer_mean() {
        let merchants = sample_merchants();
        let request = ComparisonRequest::new("M003", ComparisonTarget::Floor);
        let result = executor().execute(&request, &merchants).unwrap();
        let peers: Vec<&MerchantRecord> = merchants
            .iter()
            .filter(|m| m.floor == "F1" && m.id.as_str() != "M003")
            .collect();
        let mean = peers.iter().map(|m| m.health_score).sum::<f64>() / peers.len() as f64;
        assert!((result.fields[0].baseline - mean).abs() < 1e-9);
    }

    #[test]
    fn test_merchant_vs_merchant() {
        let merchants = sample_merchants();
        let mut request = ComparisonRequest::new("海底捞火锅", ComparisonTarget::Merchant);
        request.other = Some("呷哺呷哺火锅".to_string());
        let result = executor().execute(&request, &merchants).unwrap();
        assert_eq!(result.target, ComparisonTarget::Merchant);
        assert_eq!(result.baseline_label, "呷哺呷哺火锅");
        let health = &result.fields[0];
        assert!((health.delta.absolute - (88.0 - 74.0)).abs() < 1e-9);
    }

    #[test]
    fn test_missing_target_degrades_to_time() {
        let merchants = sample_merchants();
        let request = ComparisonRequest {
            target: None,
            merchant: "M001".to_string(),
            other: None,
            window: BaselineWindow::default(),
        };
        let result = executor().execute(&request, &merchants).unwrap();
        assert_eq!(result.target, ComparisonTarget::Time);
    }

    #[test]
    fn test_merchant_target_without_other_degrades() {
        let merchants = sample_merchants();
        let request = ComparisonRequest::new("M001", ComparisonTarget::Merchant);
        let result = executor().execute(&request, &merchants).unwrap();
        assert_eq!(result.target, ComparisonTarget::Time);
    }

    #[test]
    fn test_unknown_merchant_names_the_reference() {
        let merchants = sample_merchants();
        let request = ComparisonRequest::new("不存在的店", ComparisonTarget::Time);
        let err = executor().execute(&request, &merchants).unwrap_err();
        match err {
            OpsError::MerchantNotFound(name) => assert_eq!(name, "不存在的店"),
            other => panic!("expected not-found, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_baseline_reports_na() {
        let delta = DeltaReport::between(5.0, 0.0);
        assert!(delta.percent.is_none());
        assert_eq!(delta.to_string(), "+5.00 (N/A)");
    }

    #[test]
    fn test_delta_display_format() {
        let delta = DeltaReport::between(110.0, 100.0);
        assert_eq!(delta.to_string(), "+10.00 (+10.0%)");
        let delta = DeltaReport::between(90.0, 100.0);
        assert_eq!(delta.to_string(), "-10.00 (-10.0%)");
    }

    #[test]
    fn test_execution_is_idempotent_across_targets() {
        let merchants = sample_merchants();
        let exec = executor();
        for target in [
            ComparisonTarget::Time,
            ComparisonTarget::Category,
            ComparisonTarget::Floor,
        ] {
            let request = ComparisonRequest::new("M001", target);
            let a = exec.execute(&request, &merchants).unwrap();
            let b = exec.execute(&request, &merchants).unwrap();
            for (x, y) in a.fields.iter().zip(&b.fields) {
                assert_eq!(x.baseline, y.baseline);
                assert_eq!(x.delta.absolute, y.delta.absolute);
            }
        }
    }
}

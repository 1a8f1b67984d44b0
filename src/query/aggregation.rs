//! Set-valued aggregation over the merchant snapshot
//!
//! Pipeline: predicate filter → time-range stage (pass-through pending
//! history) → optional group-by partition → reduction, plus an optional
//! baseline comparison against the history provider. Results always carry
//! the literal record list they were computed over so the downstream text
//! generator cites real merchants instead of inventing them.

use crate::core::error::{OpsError, Result};
use crate::core::types::MetricField;
use crate::dataset::{MerchantRecord, MerchantRef};
use crate::query::filter::{GroupKey, MerchantFilter, TimeRange};
use crate::query::history::{BaselineWindow, HistoryProvider, SimulatedHistory};
use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reduction applied to the filtered set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Max => "max",
            AggregateOp::Min => "min",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "count" => Some(AggregateOp::Count),
            "sum" => Some(AggregateOp::Sum),
            "avg" | "average" | "mean" => Some(AggregateOp::Avg),
            "max" => Some(AggregateOp::Max),
            "min" => Some(AggregateOp::Min),
            _ => None,
        }
    }

    /// All reductions except count need a field selector.
    pub fn needs_field(&self) -> bool {
        !matches!(self, AggregateOp::Count)
    }
}

impl Default for AggregateOp {
    fn default() -> Self {
        AggregateOp::Count
    }
}

/// One aggregation request from the planner/orchestrator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub operation: AggregateOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<MetricField>,
    #[serde(default)]
    pub filter: MerchantFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupKey>,
    /// When set, the same reduction is re-run over this prior window
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_to: Option<BaselineWindow>,
}

/// Baseline triple attached to a result on request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub window: BaselineWindow,
    pub baseline: f64,
    /// current − baseline
    pub delta: f64,
    /// delta / baseline × 100, rounded; `None` renders as "N/A" when the
    /// baseline is exactly zero
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    pub operation: AggregateOp,
    /// Whole-set reduction, or the sum of breakdown values when grouped
    pub total: f64,
    /// Per-group reduction keyed by the group value, in stable key order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<BaselineComparison>,
    /// Echo of the filter the result was computed under
    pub filter: MerchantFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// The literal records behind the numbers
    pub merchants: Vec<MerchantRef>,
}

pub struct AggregationExecutor<H: HistoryProvider = SimulatedHistory> {
    history: H,
}

impl Default for AggregationExecutor<SimulatedHistory> {
    fn default() -> Self {
        Self::new(SimulatedHistory::default())
    }
}

impl<H: HistoryProvider> AggregationExecutor<H> {
    pub fn new(history: H) -> Self {
        Self { history }
    }

    /// Execute one aggregation over an immutable snapshot.
    pub fn execute(
        &self,
        request: &AggregationRequest,
        dataset: &[MerchantRecord],
    ) -> Result<AggregationResult> {
        if request.operation.needs_field() && request.field.is_none() {
            return Err(OpsError::MissingField {
                operation: request.operation.as_str().to_string(),
            });
        }

        let filtered = request.filter.apply(dataset);
        let filtered = request
            .time_range
            .unwrap_or_default()
            .apply(filtered);

        let (total, breakdown) = match request.group_by {
            Some(key) => {
                let grouped = self.grouped_reduction(request, &filtered, key)?;
                let total = grouped.values().sum();
                (total, Some(grouped))
            }
            None => (reduce(&filtered, request.operation, request.field)?, None),
        };

        let comparison = match request.compare_to {
            Some(window) => Some(self.baseline(request, &filtered, total, window)?),
            None => None,
        };

        tracing::debug!(
            op = request.operation.as_str(),
            records = filtered.len(),
            grouped = breakdown.is_some(),
            "aggregation executed"
        );

        Ok(AggregationResult {
            operation: request.operation,
            total,
            breakdown,
            comparison,
            filter: request.filter.clone(),
            time_range: request.time_range,
            merchants: filtered.iter().map(|r| MerchantRef::from(*r)).collect(),
        })
    }

    fn grouped_reduction(
        &self,
        request: &AggregationRequest,
        filtered: &[&MerchantRecord],
        key: GroupKey,
    ) -> Result<BTreeMap<String, f64>> {
        let mut partitions: AHashMap<String, Vec<&MerchantRecord>> = AHashMap::new();
        for record in filtered {
            partitions
                .entry(key.value_of(record))
                .or_default()
                .push(record);
        }

        let mut breakdown = BTreeMap::new();
        for (value, records) in partitions {
            breakdown.insert(value, reduce(&records, request.operation, request.field)?);
        }
        Ok(breakdown)
    }

    /// Same metric, prior window: re-run the reduction over the history
    /// provider's derived snapshot of the filtered records.
    fn baseline(
        &self,
        request: &AggregationRequest,
        filtered: &[&MerchantRecord],
        current: f64,
        window: BaselineWindow,
    ) -> Result<BaselineComparison> {
        let prior = self.history.prior_dataset(filtered, window);
        let prior_refs: Vec<&MerchantRecord> = prior.iter().collect();
        let baseline = reduce(&prior_refs, request.operation, request.field)?;
        let delta = current - baseline;
        let percent = if baseline == 0.0 {
            None
        } else {
            Some(round2(delta / baseline * 100.0))
        };
        Ok(BaselineComparison {
            window,
            baseline,
            delta,
            percent,
        })
    }
}

/// Apply a reduction to a record set.
///
/// Count ignores the field. Empty sets reduce to 0.0 for every
/// operation. Averages are rounded half-away-from-zero to two decimals;
/// sums, maxima and minima are reported unrounded.
fn reduce(records: &[&MerchantRecord], op: AggregateOp, field: Option<MetricField>) -> Result<f64> {
    if op == AggregateOp::Count {
        return Ok(records.len() as f64);
    }

    let field = field.ok_or_else(|| OpsError::MissingField {
        operation: op.as_str().to_string(),
    })?;
    let values = records.iter().map(|r| r.metric(field));

    Ok(match op {
        AggregateOp::Count => unreachable!("handled above"),
        AggregateOp::Sum => values.sum(),
        AggregateOp::Avg => {
            if records.is_empty() {
                0.0
            } else {
                round2(values.sum::<f64>() / records.len() as f64)
            }
        }
        AggregateOp::Max => values
            .max_by_key(|v| OrderedFloat(*v))
            .unwrap_or(0.0),
        AggregateOp::Min => values
            .min_by_key(|v| OrderedFloat(*v))
            .unwrap_or(0.0),
    })
}

/// Round half-away-from-zero to two decimals.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

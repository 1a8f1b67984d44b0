//! In-memory dataset provider
//!
//! The query core treats the dataset as a synchronous, already-materialized
//! snapshot. This provider owns the records, keeps the risk-level bucketing
//! consistent with health scores, and notifies subscribers on change. The
//! pipeline itself only ever sees `&[MerchantRecord]`.

use crate::core::types::{MerchantId, RiskLevel};
use crate::dataset::merchant::{MerchantRecord, SubMetrics};
use ahash::AHashMap;

/// Read side of the dataset boundary
pub trait DatasetProvider {
    /// The current materialized snapshot, in stable insertion order.
    fn all_merchants(&self) -> &[MerchantRecord];

    fn find_by_id(&self, id: &MerchantId) -> Option<&MerchantRecord> {
        self.all_merchants().iter().find(|m| &m.id == id)
    }
}

type ChangeListener = Box<dyn Fn(&MerchantRecord) + Send>;

/// Owning provider used by the demo binary and tests
pub struct InMemoryDataset {
    merchants: Vec<MerchantRecord>,
    index: AHashMap<MerchantId, usize>,
    listeners: Vec<ChangeListener>,
}

impl InMemoryDataset {
    pub fn new() -> Self {
        Self {
            merchants: Vec::new(),
            index: AHashMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn with_merchants(merchants: Vec<MerchantRecord>) -> Self {
        let mut store = Self::new();
        for m in merchants {
            store.upsert(m);
        }
        store
    }

    /// Insert or replace a record, re-deriving its risk bucket from the
    /// health score. Notifies subscribers.
    pub fn upsert(&mut self, mut record: MerchantRecord) {
        record.risk_level = risk_for_score(record.health_score);
        match self.index.get(&record.id) {
            Some(&i) => self.merchants[i] = record.clone(),
            None => {
                self.index.insert(record.id.clone(), self.merchants.len());
                self.merchants.push(record.clone());
            }
        }
        for listener in &self.listeners {
            listener(&record);
        }
    }

    /// Register a change-notification hook.
    pub fn subscribe(&mut self, listener: impl Fn(&MerchantRecord) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }
}

impl Default for InMemoryDataset {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetProvider for InMemoryDataset {
    fn all_merchants(&self) -> &[MerchantRecord] {
        &self.merchants
    }

    fn find_by_id(&self, id: &MerchantId) -> Option<&MerchantRecord> {
        self.index.get(id).map(|&i| &self.merchants[i])
    }
}

/// Monotone bucketing of health score into risk levels.
///
/// Bucket edges: 85 / 70 / 55 / 40.
pub fn risk_for_score(score: f64) -> RiskLevel {
    if score >= 85.0 {
        RiskLevel::None
    } else if score >= 70.0 {
        RiskLevel::Low
    } else if score >= 55.0 {
        RiskLevel::Medium
    } else if score >= 40.0 {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

fn record(
    id: &str,
    name: &str,
    category: &str,
    floor: &str,
    health: f64,
    metrics: [f64; 5],
    revenue: f64,
    rent: f64,
) -> MerchantRecord {
    MerchantRecord {
        id: MerchantId::new(id),
        name: name.to_string(),
        category: category.to_string(),
        floor: floor.to_string(),
        health_score: health,
        risk_level: risk_for_score(health),
        metrics: SubMetrics {
            collection: metrics[0],
            operational: metrics[1],
            site_quality: metrics[2],
            customer_review: metrics[3],
            risk_resistance: metrics[4],
        },
        monthly_revenue: revenue,
        monthly_rent: rent,
        rent_to_sales: if revenue > 0.0 { rent / revenue } else { 0.0 },
    }
}

/// Demo population used by the binary and by tests
pub fn sample_merchants() -> Vec<MerchantRecord> {
    vec![
        record(
            "M001", "海底捞火锅", "餐饮-火锅", "F4",
            88.0, [92.0, 86.0, 90.0, 89.0, 84.0], 1_850_000.0, 210_000.0,
        ),
        record(
            "M002", "呷哺呷哺火锅", "餐饮-火锅", "F4",
            74.0, [80.0, 72.0, 75.0, 71.0, 70.0], 620_000.0, 98_000.0,
        ),
        record(
            "M003", "星巴克咖啡", "餐饮-咖啡", "F1",
            82.0, [90.0, 81.0, 85.0, 80.0, 76.0], 540_000.0, 120_000.0,
        ),
        record(
            "M004", "瑞幸咖啡", "餐饮-咖啡", "F1",
            68.0, [75.0, 66.0, 70.0, 64.0, 65.0], 310_000.0, 85_000.0,
        ),
        record(
            "M005", "优衣库", "零售-服饰", "F2",
            79.0, [85.0, 78.0, 82.0, 76.0, 74.0], 1_200_000.0, 260_000.0,
        ),
        record(
            "M006", "热风服饰店", "零售-服饰", "F2",
            52.0, [58.0, 50.0, 55.0, 48.0, 49.0], 180_000.0, 72_000.0,
        ),
        record(
            "M007", "周大福金店", "零售-珠宝", "F1",
            86.0, [95.0, 84.0, 88.0, 82.0, 80.0], 2_400_000.0, 300_000.0,
        ),
        record(
            "M008", "孩子王童装坊", "零售-母婴", "F3",
            61.0, [66.0, 60.0, 63.0, 58.0, 57.0], 260_000.0, 88_000.0,
        ),
        record(
            "M009", "万达影城", "娱乐-影院", "F5",
            71.0, [78.0, 70.0, 74.0, 69.0, 66.0], 890_000.0, 190_000.0,
        ),
        record(
            "M010", "星聚会KTV", "娱乐-KTV", "F5",
            38.0, [42.0, 36.0, 40.0, 35.0, 34.0], 95_000.0, 86_000.0,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_risk_bucketing_is_monotone() {
        let mut prev = risk_for_score(100.0);
        for score in (0..=100).rev() {
            let level = risk_for_score(score as f64);
            assert!(level >= prev, "risk must not decrease as score drops");
            prev = level;
        }
    }

    #[test]
    fn test_sample_risk_levels_match_scores() {
        for m in sample_merchants() {
            assert_eq!(m.risk_level, risk_for_score(m.health_score));
        }
    }

    #[test]
    fn test_upsert_replaces_and_rebuckets() {
        let mut store = InMemoryDataset::with_merchants(sample_merchants());
        let n = store.len();
        let mut degraded = store.all_merchants()[0].clone();
        degraded.health_score = 30.0;
        store.upsert(degraded);

        assert_eq!(store.len(), n);
        let updated = store.find_by_id(&MerchantId::new("M001")).unwrap();
        assert_eq!(updated.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_change_notification_fires() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut store = InMemoryDataset::new();
        store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        for m in sample_merchants() {
            store.upsert(m);
        }
        assert_eq!(hits.load(Ordering::SeqCst), store.len());
    }
}

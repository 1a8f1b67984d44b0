//! Prior-period data for baseline computation
//!
//! No historical time-series exists yet, so the default provider
//! synthesizes prior-period records with bounded fluctuation. It is an
//! explicitly labeled stub behind the `HistoryProvider` seam: swapping in
//! a real historical store touches nothing in the executors. Seeding is
//! stable per (merchant, window), which keeps every executor a pure
//! function of its inputs.

use crate::dataset::store::risk_for_score;
use crate::dataset::MerchantRecord;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// The window a baseline is computed over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineWindow {
    #[default]
    PreviousMonth,
    PreviousQuarter,
    YearAgo,
}

impl BaselineWindow {
    pub fn label(&self) -> &'static str {
        match self {
            BaselineWindow::PreviousMonth => "上月",
            BaselineWindow::PreviousQuarter => "上季度",
            BaselineWindow::YearAgo => "去年同期",
        }
    }
}

/// Source of prior-period snapshots
pub trait HistoryProvider {
    /// Derive what `current` looked like in the given window.
    fn prior_record(&self, current: &MerchantRecord, window: BaselineWindow) -> MerchantRecord;

    /// Prior snapshot of a whole record set. Membership is assumed stable
    /// across windows until real history says otherwise.
    fn prior_dataset(
        &self,
        current: &[&MerchantRecord],
        window: BaselineWindow,
    ) -> Vec<MerchantRecord> {
        current
            .iter()
            .map(|r| self.prior_record(r, window))
            .collect()
    }
}

/// Synthesized history with bounded relative fluctuation
#[derive(Debug, Clone)]
pub struct SimulatedHistory {
    /// Maximum relative change per field (0.15 = ±15%)
    fluctuation: f64,
}

impl SimulatedHistory {
    pub fn new(fluctuation: f64) -> Self {
        Self { fluctuation }
    }

    fn jitter(&self, rng: &mut ChaCha8Rng, value: f64) -> f64 {
        if self.fluctuation == 0.0 {
            return value;
        }
        let factor = 1.0 + rng.gen_range(-self.fluctuation..=self.fluctuation);
        value * factor
    }

    fn jitter_score(&self, rng: &mut ChaCha8Rng, value: f64) -> f64 {
        self.jitter(rng, value).clamp(0.0, 100.0)
    }
}

impl Default for SimulatedHistory {
    fn default() -> Self {
        Self::new(crate::core::config::AssistantConfig::default().history_fluctuation)
    }
}

impl HistoryProvider for SimulatedHistory {
    fn prior_record(&self, current: &MerchantRecord, window: BaselineWindow) -> MerchantRecord {
        let mut rng = ChaCha8Rng::seed_from_u64(stable_seed(current.id.as_str(), window));

        let mut prior = current.clone();
        prior.health_score = self.jitter_score(&mut rng, current.health_score);
        prior.metrics.collection = self.jitter_score(&mut rng, current.metrics.collection);
        prior.metrics.operational = self.jitter_score(&mut rng, current.metrics.operational);
        prior.metrics.site_quality = self.jitter_score(&mut rng, current.metrics.site_quality);
        prior.metrics.customer_review =
            self.jitter_score(&mut rng, current.metrics.customer_review);
        prior.metrics.risk_resistance =
            self.jitter_score(&mut rng, current.metrics.risk_resistance);
        prior.monthly_revenue = self.jitter(&mut rng, current.monthly_revenue).max(0.0);
        prior.monthly_rent = current.monthly_rent;
        prior.rent_to_sales = if prior.monthly_revenue > 0.0 {
            prior.monthly_rent / prior.monthly_revenue
        } else {
            0.0
        };
        prior.risk_level = risk_for_score(prior.health_score);
        prior
    }
}

/// FNV-1a fold of the merchant id mixed with the window discriminant.
/// Stable across calls and processes, which is all the stub needs.
fn stable_seed(id: &str, window: BaselineWindow) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in id.bytes() {
        h = (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3);
    }
    h ^ (window as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

//! Merchant record shapes as exposed by the dataset provider
//!
//! Records are read-only to this core. Health score and every sub-metric
//! live in [0, 100]; the risk level is a monotone bucketing of the health
//! score maintained by the provider.

use crate::core::types::{MerchantId, MetricField, RiskLevel};
use serde::{Deserialize, Serialize};

/// The five scored dimensions behind the overall health score
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SubMetrics {
    /// Rent/fee collection performance
    pub collection: f64,
    /// Day-to-day operational performance
    pub operational: f64,
    /// On-site quality (cleanliness, presentation, compliance)
    pub site_quality: f64,
    /// Customer review sentiment
    pub customer_review: f64,
    /// Resistance to market shocks
    pub risk_resistance: f64,
}

/// A merchant as materialized by the dataset provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantRecord {
    pub id: MerchantId,
    /// Display name, e.g. "海底捞火锅"
    pub name: String,
    /// Category string of the form "<macro>-<micro>", e.g. "餐饮-火锅"
    pub category: String,
    /// Floor/location label, e.g. "F3"
    pub floor: String,
    /// Overall health score in [0, 100]
    pub health_score: f64,
    pub risk_level: RiskLevel,
    pub metrics: SubMetrics,
    /// Monthly revenue in yuan
    pub monthly_revenue: f64,
    /// Monthly rent in yuan
    pub monthly_rent: f64,
    /// Rent divided by sales for the month
    pub rent_to_sales: f64,
}

impl MerchantRecord {
    /// Macro segment of the category string ("餐饮" for "餐饮-火锅").
    pub fn macro_category(&self) -> &str {
        self.category.split('-').next().unwrap_or(&self.category)
    }

    /// Read the numeric value a `MetricField` selects.
    pub fn metric(&self, field: MetricField) -> f64 {
        match field {
            MetricField::HealthScore => self.health_score,
            MetricField::Collection => self.metrics.collection,
            MetricField::Operational => self.metrics.operational,
            MetricField::SiteQuality => self.metrics.site_quality,
            MetricField::CustomerReview => self.metrics.customer_review,
            MetricField::RiskResistance => self.metrics.risk_resistance,
            MetricField::MonthlyRevenue => self.monthly_revenue,
            MetricField::MonthlyRent => self.monthly_rent,
            MetricField::RentToSales => self.rent_to_sales,
        }
    }
}

/// The citation-sized view of a record carried inside query results.
///
/// Downstream text generation must quote these instead of inventing
/// records, so every result embeds the literal list it was computed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantRef {
    pub id: MerchantId,
    pub name: String,
    pub risk_level: RiskLevel,
    pub health_score: f64,
    pub category: String,
}

impl From<&MerchantRecord> for MerchantRef {
    fn from(r: &MerchantRecord) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            risk_level: r.risk_level,
            health_score: r.health_score,
            category: r.category.clone(),
        }
    }
}

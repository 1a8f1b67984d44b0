//! Insight generation for comparison results
//!
//! Each comparison shape gets its own generator producing 1–4 short
//! observations from fixed thresholds. Observations are plain strings;
//! the response-composition layer weaves them into prose.

use crate::core::config::AssistantConfig;
use crate::core::types::MetricField;
use crate::query::comparison::FieldComparison;

const MAX_INSIGHTS: usize = 4;

fn field<'a>(fields: &'a [FieldComparison], target: MetricField) -> Option<&'a FieldComparison> {
    fields.iter().find(|f| f.field == target)
}

fn cap(mut insights: Vec<String>, fallback: &str) -> Vec<String> {
    if insights.is_empty() {
        insights.push(fallback.to_string());
    }
    insights.truncate(MAX_INSIGHTS);
    insights
}

/// Observations for a current-vs-prior-period comparison
pub fn time_insights(config: &AssistantConfig, fields: &[FieldComparison]) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(health) = field(fields, MetricField::HealthScore) {
        let delta = health.delta.absolute;
        if delta.abs() > config.health_notable_delta {
            let direction = if delta > 0.0 { "明显提升" } else { "明显下滑" };
            out.push(format!("健康分较上期{}{:.1}分", direction, delta.abs()));
        }
    }

    if let Some(revenue) = field(fields, MetricField::MonthlyRevenue) {
        if let Some(pct) = revenue.delta.percent {
            if pct.abs() > config.revenue_notable_pct {
                let direction = if pct > 0.0 { "增长" } else { "下降" };
                out.push(format!("月营业额环比{}{:.1}%", direction, pct.abs()));
            }
        }
    }

    if let Some(rent) = field(fields, MetricField::RentToSales) {
        if rent.current > config.rent_pressure_ratio {
            out.push(format!("租售比达{:.2}，经营承压明显", rent.current));
        }
    }

    if let Some(review) = field(fields, MetricField::CustomerReview) {
        if review.delta.absolute < -config.health_notable_delta {
            out.push("顾客口碑较上期走低，需关注现场服务".to_string());
        }
    }

    cap(out, "经营状况与上期基本持平")
}

/// Observations for a peer-average comparison. `scope` names the peer
/// group, e.g. "同品类" or "同楼层".
pub fn peer_insights(
    config: &AssistantConfig,
    scope: &str,
    fields: &[FieldComparison],
) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(health) = field(fields, MetricField::HealthScore) {
        let gap = health.delta.absolute;
        if gap.abs() > config.health_peer_gap {
            let (direction, verdict) = if gap > 0.0 {
                ("高于", "表现突出")
            } else {
                ("低于", "明显落后")
            };
            out.push(format!(
                "健康分{}{}均值{:.1}分，{}",
                direction,
                scope,
                gap.abs(),
                verdict
            ));
        } else if gap.abs() > config.health_notable_delta {
            let direction = if gap > 0.0 { "略高于" } else { "略低于" };
            out.push(format!("健康分{}{}均值{:.1}分", direction, scope, gap.abs()));
        }
    }

    if let Some(revenue) = field(fields, MetricField::MonthlyRevenue) {
        if let Some(pct) = revenue.delta.percent {
            if pct.abs() > config.revenue_notable_pct {
                let direction = if pct > 0.0 { "高出" } else { "低于" };
                out.push(format!("月营业额{}{}均值{:.1}%", direction, scope, pct.abs()));
            }
        }
    }

    if let Some(review) = field(fields, MetricField::CustomerReview) {
        if review.delta.absolute < -config.health_peer_gap {
            out.push(format!("顾客口碑落后于{}水平，建议排查差评来源", scope));
        }
    }

    cap(out, &format!("与{}均值基本持平", scope))
}

/// Observations for a merchant-vs-merchant comparison
pub fn versus_insights(
    config: &AssistantConfig,
    subject_name: &str,
    other_name: &str,
    fields: &[FieldComparison],
) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(health) = field(fields, MetricField::HealthScore) {
        let gap = health.delta.absolute;
        if gap.abs() > config.health_notable_delta {
            let (leader, trailer) = if gap > 0.0 {
                (subject_name, other_name)
            } else {
                (other_name, subject_name)
            };
            out.push(format!(
                "{}的健康分领先{}约{:.1}分",
                leader,
                trailer,
                gap.abs()
            ));
        }
    }

    if let Some(revenue) = field(fields, MetricField::MonthlyRevenue) {
        if let Some(pct) = revenue.delta.percent {
            if pct.abs() > config.revenue_notable_pct {
                let (leader, trailer) = if pct > 0.0 {
                    (subject_name, other_name)
                } else {
                    (other_name, subject_name)
                };
                out.push(format!("{}的月营业额高出{}{:.1}%", leader, trailer, pct.abs()));
            }
        }
    }

    if let Some(rent) = field(fields, MetricField::RentToSales) {
        if rent.delta.absolute > 0.05 {
            out.push(format!("{}的租售比更高，成本压力相对更大", subject_name));
        } else if rent.delta.absolute < -0.05 {
            out.push(format!("{}的租售比更高，成本压力相对更大", other_name));
        }
    }

    cap(out, "两家商户整体表现接近")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::comparison::DeltaReport;

    fn cmp(field: MetricField, current: f64, baseline: f64) -> FieldComparison {
        FieldComparison {
            field,
            current,
            baseline,
            delta: DeltaReport::between(current, baseline),
        }
    }

    #[test]
    fn test_time_insights_flag_health_drop() {
        let cfg = AssistantConfig::default();
        let fields = vec![cmp(MetricField::HealthScore, 60.0, 72.0)];
        let insights = time_insights(&cfg, &fields);
        assert!(insights[0].contains("明显下滑"));
        assert!(insights[0].contains("12.0"));
    }

    #[test]
    fn test_time_insights_fallback_when_flat() {
        let cfg = AssistantConfig::default();
        let fields = vec![
            cmp(MetricField::HealthScore, 70.0, 71.0),
            cmp(MetricField::MonthlyRevenue, 100_000.0, 101_000.0),
        ];
        let insights = time_insights(&cfg, &fields);
        assert_eq!(insights, vec!["经营状况与上期基本持平".to_string()]);
    }

    #[test]
    fn test_peer_insights_strong_vs_slight() {
        let cfg = AssistantConfig::default();

        let strong = peer_insights(&cfg, "同品类", &[cmp(MetricField::HealthScore, 88.0, 70.0)]);
        assert!(strong[0].contains("高于同品类均值"));
        assert!(strong[0].contains("表现突出"));

        let slight = peer_insights(&cfg, "同品类", &[cmp(MetricField::HealthScore, 76.0, 70.0)]);
        assert!(slight[0].contains("略高于"));
    }

    #[test]
    fn test_versus_insights_name_the_leader() {
        let cfg = AssistantConfig::default();
        let fields = vec![cmp(MetricField::HealthScore, 88.0, 74.0)];
        let insights = versus_insights(&cfg, "海底捞火锅", "呷哺呷哺火锅", &fields);
        assert!(insights[0].starts_with("海底捞火锅"));
    }

    #[test]
    fn test_insight_count_bounded() {
        let cfg = AssistantConfig::default();
        let fields = vec![
            cmp(MetricField::HealthScore, 50.0, 80.0),
            cmp(MetricField::MonthlyRevenue, 50_000.0, 200_000.0),
            cmp(MetricField::RentToSales, 0.6, 0.2),
            cmp(MetricField::CustomerReview, 40.0, 80.0),
        ];
        let insights = time_insights(&cfg, &fields);
        assert!(!insights.is_empty() && insights.len() <= 4);
    }
}

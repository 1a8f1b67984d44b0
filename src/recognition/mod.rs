//! Entity recognition: free text to ranked merchant candidates
//!
//! Four strategies run in fixed precedence (exact, fuzzy, partial,
//! context), each contributing zero or more candidates. Results are
//! deduplicated per merchant (highest confidence wins) and returned in
//! descending confidence order. Recognition never fails; an empty list is
//! a valid outcome.

pub mod normalize;
pub mod similarity;

use crate::context::ConversationContext;
use crate::core::config::AssistantConfig;
use crate::core::types::MerchantId;
use crate::dataset::MerchantRecord;
use ahash::AHashMap;
use normalize::{char_len, normalize, strip_name_suffix};
use ordered_float::OrderedFloat;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Which strategy produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Exact,
    Fuzzy,
    Partial,
    Context,
}

/// A provisional merchant reference, not yet confirmed.
///
/// Created fresh per recognition call and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntity {
    pub merchant_id: MerchantId,
    pub name: String,
    /// Confidence in [0, 1]
    pub confidence: f32,
    pub source: MatchSource,
    /// The text span that matched, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
}

/// Pronouns that signal an omitted subject
const SUBJECT_PRONOUNS: &[&str] = &[
    "它", "他家", "她家", "他们", "这家", "那家", "这个", "那个", "这边", "那边",
];

pub struct Recognizer {
    config: AssistantConfig,
    omission_patterns: Vec<Regex>,
}

impl Recognizer {
    pub fn new(config: AssistantConfig) -> Self {
        // Utterance shapes that talk about a subject without naming it
        let omission_patterns = ["(怎么样|咋样|如何|还好吗)", "^(那|这)", "最近"]
            .iter()
            .map(|p| Regex::new(p).expect("omission pattern is valid"))
            .collect();
        Self {
            config,
            omission_patterns,
        }
    }

    /// Recognize merchant references in `text` against `registry`.
    pub fn recognize(
        &self,
        text: &str,
        context: Option<&ConversationContext>,
        registry: &[MerchantRecord],
    ) -> Vec<CandidateEntity> {
        let input = normalize(text);
        if input.is_empty() {
            return Vec::new();
        }
        let input_len = char_len(&input);

        // Precompute normalized names and suffix-stripped bases; a base
        // shared by several merchants cannot identify one on its own.
        let entries: Vec<(usize, String, String)> = registry
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let norm = normalize(&m.name);
                let base = strip_name_suffix(&norm);
                (i, norm, base)
            })
            .collect();
        let mut base_counts: AHashMap<&str, usize> = AHashMap::new();
        for (_, _, base) in &entries {
            *base_counts.entry(base.as_str()).or_insert(0) += 1;
        }

        let mut merged: AHashMap<MerchantId, CandidateEntity> = AHashMap::new();

        for (i, norm_name, base) in &entries {
            let merchant = &registry[*i];

            // Exact: full name, or a distinctive unique brand base
            if input.contains(norm_name.as_str()) {
                merge(
                    &mut merged,
                    self.candidate(merchant, MatchSource::Exact, Some(merchant.name.clone())),
                );
                continue;
            }
            let base_hit = base != norm_name && input.contains(base.as_str());
            if base_hit
                && char_len(base) >= self.config.exact_base_min_len
                && base_counts[base.as_str()] == 1
            {
                merge(
                    &mut merged,
                    self.candidate(merchant, MatchSource::Exact, Some(base.clone())),
                );
                continue;
            }

            // Fuzzy: a base hit that is short or shared between merchants
            if base_hit && char_len(base) >= 2 {
                merge(
                    &mut merged,
                    self.candidate(merchant, MatchSource::Fuzzy, Some(base.clone())),
                );
                continue;
            }

            // Partial: blended containment / common-substring score above
            // the length-adaptive threshold
            let score = similarity::partial_score(norm_name, &input);
            if score >= self.config.partial_threshold(input_len) {
                let mut c = self.candidate(merchant, MatchSource::Partial, None);
                c.confidence = score;
                merge(&mut merged, c);
            }
        }

        let best = merged
            .values()
            .map(|c| c.confidence)
            .fold(0.0f32, f32::max);

        // Context: only when nothing above is convincing and the utterance
        // omits its subject
        if best <= self.config.context_trigger_ceiling {
            if let Some(ctx) = context {
                if let (Some(id), Some(name)) = (
                    ctx.prior_merchant_id.clone(),
                    ctx.prior_merchant_name.clone(),
                ) {
                    if self.omits_subject(text) {
                        merge(
                            &mut merged,
                            CandidateEntity {
                                merchant_id: id,
                                name,
                                confidence: self.config.context_confidence,
                                source: MatchSource::Context,
                                matched_text: None,
                            },
                        );
                    }
                }
            }
        }

        let mut candidates: Vec<CandidateEntity> = merged.into_values().collect();
        // Stable order for equal confidence: registry position
        candidates.sort_by_key(|c| {
            registry
                .iter()
                .position(|m| m.id == c.merchant_id)
                .unwrap_or(usize::MAX)
        });
        candidates.sort_by_key(|c| Reverse(OrderedFloat(c.confidence)));
        candidates
    }

    /// Heuristic: does the raw utterance talk about an unnamed subject?
    fn omits_subject(&self, text: &str) -> bool {
        let t = text.trim();
        SUBJECT_PRONOUNS.iter().any(|p| t.contains(p))
            || self.omission_patterns.iter().any(|re| re.is_match(t))
    }

    fn candidate(
        &self,
        merchant: &MerchantRecord,
        source: MatchSource,
        matched_text: Option<String>,
    ) -> CandidateEntity {
        let confidence = match source {
            MatchSource::Exact => self.config.exact_confidence,
            MatchSource::Fuzzy => self.config.fuzzy_confidence,
            MatchSource::Partial => 0.0,
            MatchSource::Context => self.config.context_confidence,
        };
        CandidateEntity {
            merchant_id: merchant.id.clone(),
            name: merchant.name.clone(),
            confidence,
            source,
            matched_text,
        }
    }
}

impl Default for Recognizer {
    fn default() -> Self {
        Self::new(AssistantConfig::default())
    }
}

/// Keep the highest-confidence candidate per merchant; ties keep the
/// earlier (higher-precedence) strategy.
fn merge(map: &mut AHashMap<MerchantId, CandidateEntity>, candidate: CandidateEntity) {
    match map.get(&candidate.merchant_id) {
        Some(existing) if existing.confidence >= candidate.confidence => {}
        _ => {
            map.insert(candidate.merchant_id.clone(), candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::store::sample_merchants;
    use crate::dataset::SubMetrics;
    use crate::core::types::RiskLevel;

    fn merchant(id: &str, name: &str) -> MerchantRecord {
        MerchantRecord {
            id: MerchantId::new(id),
            name: name.to_string(),
            category: "餐饮-其他".to_string(),
            floor: "F1".to_string(),
            health_score: 70.0,
            risk_level: RiskLevel::Low,
            metrics: SubMetrics::default(),
            monthly_revenue: 100_000.0,
            monthly_rent: 20_000.0,
            rent_to_sales: 0.2,
        }
    }

    #[test]
    fn test_full_name_is_exact() {
        let registry = sample_merchants();
        let rec = Recognizer::default();
        let out = rec.recognize("海底捞火锅这个月经营情况", None, &registry);
        assert_eq!(out[0].source, MatchSource::Exact);
        assert_eq!(out[0].confidence, 1.0);
        assert_eq!(out[0].merchant_id, MerchantId::new("M001"));
    }

    #[test]
    fn test_unique_brand_base_is_exact() {
        // Suffix omitted but the brand base is distinctive
        let registry = sample_merchants();
        let rec = Recognizer::default();
        let out = rec.recognize("海底捞最近怎么样", None, &registry);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, MatchSource::Exact);
        assert_eq!(out[0].confidence, 1.0);
        assert_eq!(out[0].name, "海底捞火锅");
    }

    #[test]
    fn test_shared_base_falls_to_fuzzy() {
        let registry = vec![merchant("A", "老王火锅"), merchant("B", "老王餐厅")];
        let rec = Recognizer::default();
        let out = rec.recognize("老王生意怎么样", None, &registry);
        assert_eq!(out.len(), 2);
        for c in &out {
            assert_eq!(c.source, MatchSource::Fuzzy);
            assert!((c.confidence - 0.85).abs() < 1e-6);
        }
    }

    #[test]
    fn test_partial_match_scores_below_fuzzy() {
        let registry = sample_merchants();
        let rec = Recognizer::default();
        // Brand prefix missing: neither the full name nor the base matches,
        // leaving only the partial tier
        let out = rec.recognize("巴克咖啡怎么样", None, &registry);
        let starbucks = out
            .iter()
            .find(|c| c.merchant_id == MerchantId::new("M003"))
            .expect("partial tier should surface 星巴克咖啡");
        assert_eq!(starbucks.source, MatchSource::Partial);
        assert!((starbucks.confidence - 0.8).abs() < 1e-6);
        // 瑞幸咖啡 shares only the category suffix and stays below threshold
        assert!(out
            .iter()
            .all(|c| c.merchant_id != MerchantId::new("M004")));
    }

    #[test]
    fn test_context_candidate_for_omitted_subject() {
        let registry = sample_merchants();
        let rec = Recognizer::default();
        let ctx = ConversationContext::with_prior_merchant(MerchantId::new("M002"), "呷哺呷哺火锅");
        let out = rec.recognize("它最近怎么样", Some(&ctx), &registry);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, MatchSource::Context);
        assert!((out[0].confidence - 0.6).abs() < 1e-6);
        assert_eq!(out[0].merchant_id, MerchantId::new("M002"));
    }

    #[test]
    fn test_context_skipped_when_exact_present() {
        let registry = sample_merchants();
        let rec = Recognizer::default();
        let ctx = ConversationContext::with_prior_merchant(MerchantId::new("M002"), "呷哺呷哺火锅");
        // "最近" would trigger the omission heuristic, but the exact hit
        // already exceeds the trigger ceiling
        let out = rec.recognize("海底捞最近怎么样", Some(&ctx), &registry);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].source, MatchSource::Exact);
    }

    #[test]
    fn test_empty_input_yields_no_candidates() {
        let registry = sample_merchants();
        let rec = Recognizer::default();
        assert!(rec.recognize("  ？！ ", None, &registry).is_empty());
    }

    #[test]
    fn test_ranking_is_descending() {
        let registry = sample_merchants();
        let rec = Recognizer::default();
        // 海底捞 hits the exact tier, 巴克咖啡 only the partial tier
        let out = rec.recognize("对比海底捞和巴克咖啡的生意", None, &registry);
        assert!(out.len() >= 2);
        for pair in out.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert_eq!(out[0].source, MatchSource::Exact);
    }
}

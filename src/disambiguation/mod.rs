//! Entity disambiguation: candidates to one confirmed reference
//!
//! Turns a ranked candidate list into exactly one of three outcomes:
//! a resolved merchant, no match, or a clarification request back to the
//! user. The policy is a deterministic decision tree over the top two
//! candidates; ambiguity is a first-class outcome here, never an error.

use crate::context::ConversationContext;
use crate::core::config::AssistantConfig;
use crate::core::types::MerchantId;
use crate::recognition::{CandidateEntity, MatchSource};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Why a candidate was accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveReason {
    /// Only one candidate existed
    SoleCandidate,
    /// Exact match at high confidence
    ExactMatch,
    /// Clear confidence gap to the runner-up
    ClearGap,
    /// Explicit mention in the current turn outranks carried-over context
    ExplicitOverContext,
    /// Best available candidate, accepted without strong evidence
    LowCertaintyDefault,
}

impl std::fmt::Display for ResolveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResolveReason::SoleCandidate => "唯一候选",
            ResolveReason::ExactMatch => "名称精确命中",
            ResolveReason::ClearGap => "置信度明显领先",
            ResolveReason::ExplicitOverContext => "当前输入的明确提及优先于上文",
            ResolveReason::LowCertaintyDefault => "按最高置信度采纳（把握有限）",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of disambiguation.
///
/// Exactly one shape holds at a time; the enum makes that mutual
/// exclusion structural.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Resolved {
        merchant_id: MerchantId,
        name: String,
        confidence: f32,
        reason: ResolveReason,
        /// Set when the candidate was accepted under rule 7 without
        /// strong evidence
        low_certainty: bool,
    },
    NoMatch {
        reason: String,
    },
    NeedsClarification {
        /// Ordered short-list, at most `clarify_shortlist` entries
        candidates: Vec<CandidateEntity>,
        /// Generated numbered prompt shown to the user
        prompt: String,
    },
}

pub struct Disambiguator {
    config: AssistantConfig,
    ordinal_re: Regex,
}

impl Disambiguator {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            config,
            ordinal_re: Regex::new(r"^第?([123１２３一二三])[个家]?$").expect("ordinal pattern is valid"),
        }
    }

    /// Decide on a candidate list produced by recognition.
    ///
    /// `candidates` must already be sorted by descending confidence (the
    /// recognizer's output order).
    pub fn disambiguate(
        &self,
        candidates: &[CandidateEntity],
        text: &str,
        context: Option<&ConversationContext>,
    ) -> Resolution {
        // Rule 1: nothing to choose from
        let Some(first) = candidates.first() else {
            return Resolution::NoMatch {
                reason: self.no_match_reason(text, context),
            };
        };

        // Rule 2: a single candidate is taken as-is
        let Some(second) = candidates.get(1) else {
            return self.accept(first, ResolveReason::SoleCandidate, false);
        };

        // Rule 3: exact match at high confidence wins outright. Checked
        // before the gap rule so that exact-match precedence holds when
        // both would apply.
        if first.source == MatchSource::Exact && first.confidence >= self.config.exact_accept_floor
        {
            return self.accept(first, ResolveReason::ExactMatch, false);
        }

        // Rule 4: clear confidence gap
        if first.confidence - second.confidence > self.config.clear_gap {
            return self.accept(first, ResolveReason::ClearGap, false);
        }

        // Rule 5: an explicit mention beats carried-over context
        if first.source == MatchSource::Context && second.source != MatchSource::Context {
            return self.accept(second, ResolveReason::ExplicitOverContext, false);
        }

        // Rule 6: not confident enough to guess
        if first.confidence < self.config.clarify_below {
            let shortlist: Vec<CandidateEntity> = candidates
                .iter()
                .take(self.config.clarify_shortlist)
                .cloned()
                .collect();
            let prompt = build_clarification_prompt(&shortlist);
            tracing::debug!(candidates = shortlist.len(), "asking user to clarify");
            return Resolution::NeedsClarification {
                candidates: shortlist,
                prompt,
            };
        }

        // Rule 7: accept the leader, flagged
        self.accept(first, ResolveReason::LowCertaintyDefault, true)
    }

    /// Map a user's reply to a clarification prompt back to a candidate.
    ///
    /// Accepts a bare ordinal indexing the short-list, else a substring
    /// match against candidate names. `None` means the caller must
    /// re-prompt.
    pub fn resolve_clarification<'a>(
        &self,
        reply: &str,
        shortlist: &'a [CandidateEntity],
    ) -> Option<&'a CandidateEntity> {
        let reply = reply.trim();
        if reply.is_empty() {
            return None;
        }

        if let Some(caps) = self.ordinal_re.captures(reply) {
            let idx = match &caps[1] {
                "1" | "１" | "一" => 1,
                "2" | "２" | "二" => 2,
                _ => 3,
            };
            return shortlist.get(idx - 1);
        }

        shortlist
            .iter()
            .find(|c| c.name.contains(reply) || reply.contains(c.name.as_str()))
    }

    fn accept(
        &self,
        candidate: &CandidateEntity,
        reason: ResolveReason,
        low_certainty: bool,
    ) -> Resolution {
        tracing::debug!(
            merchant = %candidate.merchant_id,
            confidence = candidate.confidence,
            ?reason,
            "resolved entity"
        );
        Resolution::Resolved {
            merchant_id: candidate.merchant_id.clone(),
            name: candidate.name.clone(),
            confidence: candidate.confidence,
            reason,
            low_certainty,
        }
    }

    fn no_match_reason(&self, text: &str, context: Option<&ConversationContext>) -> String {
        if context.map(|c| c.has_prior_merchant()).unwrap_or(false) {
            format!("未能在「{}」中识别出商户，请直接说明店铺名称", text.trim())
        } else {
            format!("未能在「{}」中识别出商户", text.trim())
        }
    }
}

impl Default for Disambiguator {
    fn default() -> Self {
        Self::new(AssistantConfig::default())
    }
}

/// Numbered prompt offering the short-list to the user
fn build_clarification_prompt(shortlist: &[CandidateEntity]) -> String {
    let mut prompt = String::from("您想问的是哪一家？请回复序号或店铺名称：");
    for (i, c) in shortlist.iter().enumerate() {
        prompt.push_str(&format!("{}. {}  ", i + 1, c.name));
    }
    prompt.trim_end().to_string()
}

/// Shape invariants of a `Resolution`, in the rule-validation style used
/// across the codebase: all violations collected, not just the first.
pub fn validate_resolution(
    resolution: &Resolution,
    config: &AssistantConfig,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match resolution {
        Resolution::Resolved { confidence, name, .. } => {
            if !(0.0..=1.0).contains(confidence) {
                errors.push(format!("resolved confidence {} outside [0, 1]", confidence));
            }
            if name.is_empty() {
                errors.push("resolved name is empty".to_string());
            }
        }
        Resolution::NoMatch { reason } => {
            if reason.is_empty() {
                errors.push("no-match reason is empty".to_string());
            }
        }
        Resolution::NeedsClarification { candidates, prompt } => {
            if candidates.is_empty() {
                errors.push("clarification short-list is empty".to_string());
            }
            if candidates.len() > config.clarify_shortlist {
                errors.push(format!(
                    "clarification short-list has {} entries (max {})",
                    candidates.len(),
                    config.clarify_shortlist
                ));
            }
            if prompt.is_empty() {
                errors.push("clarification prompt is empty".to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, name: &str, confidence: f32, source: MatchSource) -> CandidateEntity {
        CandidateEntity {
            merchant_id: MerchantId::new(id),
            name: name.to_string(),
            confidence,
            source,
            matched_text: None,
        }
    }

    #[test]
    fn test_empty_candidates_is_no_match() {
        let d = Disambiguator::default();
        let res = d.disambiguate(&[], "随便说点什么", None);
        assert!(matches!(res, Resolution::NoMatch { .. }));
    }

    #[test]
    fn test_single_candidate_accepted() {
        let d = Disambiguator::default();
        let c = vec![candidate("A", "优衣库", 0.7, MatchSource::Partial)];
        match d.disambiguate(&c, "优衣库怎么样", None) {
            Resolution::Resolved { reason, low_certainty, .. } => {
                assert_eq!(reason, ResolveReason::SoleCandidate);
                assert!(!low_certainty);
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_clear_gap_accepts_first() {
        let d = Disambiguator::default();
        let c = vec![
            candidate("A", "优衣库", 0.78, MatchSource::Partial),
            candidate("B", "热风服饰店", 0.40, MatchSource::Partial),
        ];
        match d.disambiguate(&c, "", None) {
            Resolution::Resolved { merchant_id, reason, .. } => {
                assert_eq!(merchant_id, MerchantId::new("A"));
                assert_eq!(reason, ResolveReason::ClearGap);
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_match_precedes_gap_rule() {
        // Both the exact rule and the gap rule apply; the reason must
        // reflect exact-match precedence
        let d = Disambiguator::default();
        let c = vec![
            candidate("A", "海底捞火锅", 1.0, MatchSource::Exact),
            candidate("B", "呷哺呷哺火锅", 0.6, MatchSource::Context),
        ];
        match d.disambiguate(&c, "", None) {
            Resolution::Resolved { reason, .. } => {
                assert_eq!(reason, ResolveReason::ExactMatch);
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_mention_beats_context() {
        let d = Disambiguator::default();
        let c = vec![
            candidate("A", "呷哺呷哺火锅", 0.6, MatchSource::Context),
            candidate("B", "瑞幸咖啡", 0.58, MatchSource::Partial),
        ];
        match d.disambiguate(&c, "", None) {
            Resolution::Resolved { merchant_id, reason, .. } => {
                assert_eq!(merchant_id, MerchantId::new("B"));
                assert_eq!(reason, ResolveReason::ExplicitOverContext);
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_narrow_gap_requests_clarification() {
        // 0.82 vs 0.80 is far too close to guess on; must ask
        let d = Disambiguator::default();
        let c = vec![
            candidate("A", "老王火锅", 0.82, MatchSource::Partial),
            candidate("B", "老王餐厅", 0.80, MatchSource::Partial),
        ];
        match d.disambiguate(&c, "", None) {
            Resolution::NeedsClarification { candidates, prompt } => {
                assert_eq!(candidates.len(), 2);
                assert!(prompt.contains("1. 老王火锅"));
                assert!(prompt.contains("2. 老王餐厅"));
            }
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[test]
    fn test_shortlist_capped_at_three() {
        let d = Disambiguator::default();
        let c = vec![
            candidate("A", "甲", 0.80, MatchSource::Partial),
            candidate("B", "乙", 0.79, MatchSource::Partial),
            candidate("C", "丙", 0.78, MatchSource::Partial),
            candidate("D", "丁", 0.77, MatchSource::Partial),
        ];
        match d.disambiguate(&c, "", None) {
            Resolution::NeedsClarification { candidates, .. } => {
                assert_eq!(candidates.len(), 3);
            }
            other => panic!("expected clarification, got {:?}", other),
        }
    }

    #[test]
    fn test_flagged_low_certainty_accept() {
        let d = Disambiguator::default();
        let c = vec![
            candidate("A", "老王火锅", 0.85, MatchSource::Fuzzy),
            candidate("B", "老王餐厅", 0.85, MatchSource::Fuzzy),
        ];
        match d.disambiguate(&c, "", None) {
            Resolution::Resolved { low_certainty, reason, .. } => {
                assert!(low_certainty);
                assert_eq!(reason, ResolveReason::LowCertaintyDefault);
            }
            other => panic!("expected resolved, got {:?}", other),
        }
    }

    #[test]
    fn test_validator_accepts_well_formed_clarification() {
        let cfg = AssistantConfig::default();
        let shortlist = vec![candidate("A", "老王火锅", 0.8, MatchSource::Partial)];
        let res = Resolution::NeedsClarification {
            prompt: build_clarification_prompt(&shortlist),
            candidates: shortlist,
        };
        assert!(validate_resolution(&res, &cfg).is_ok());
    }

    #[test]
    fn test_validator_rejects_empty_shortlist() {
        let cfg = AssistantConfig::default();
        let res = Resolution::NeedsClarification {
            candidates: vec![],
            prompt: "您想问的是哪一家？".to_string(),
        };
        let errors = validate_resolution(&res, &cfg).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("short-list is empty")));
    }

    #[test]
    fn test_clarification_reply_by_ordinal() {
        let d = Disambiguator::default();
        let shortlist = vec![
            candidate("A", "老王火锅", 0.82, MatchSource::Partial),
            candidate("B", "老王餐厅", 0.80, MatchSource::Partial),
        ];
        assert_eq!(
            d.resolve_clarification("2", &shortlist).map(|c| c.merchant_id.clone()),
            Some(MerchantId::new("B"))
        );
        assert_eq!(
            d.resolve_clarification("第一家", &shortlist).map(|c| c.merchant_id.clone()),
            Some(MerchantId::new("A"))
        );
    }

    #[test]
    fn test_clarification_reply_by_name_substring() {
        let d = Disambiguator::default();
        let shortlist = vec![
            candidate("A", "老王火锅", 0.82, MatchSource::Partial),
            candidate("B", "老王餐厅", 0.80, MatchSource::Partial),
        ];
        assert_eq!(
            d.resolve_clarification("餐厅", &shortlist).map(|c| c.merchant_id.clone()),
            Some(MerchantId::new("B"))
        );
    }

    #[test]
    fn test_clarification_reply_unresolvable() {
        let d = Disambiguator::default();
        let shortlist = vec![candidate("A", "老王火锅", 0.82, MatchSource::Partial)];
        assert!(d.resolve_clarification("都不是", &shortlist).is_none());
        assert!(d.resolve_clarification("", &shortlist).is_none());
        // Ordinal beyond the short-list cannot resolve
        assert!(d.resolve_clarification("3", &shortlist).is_none());
    }
}

//! Assistant configuration with documented constants
//!
//! All decision thresholds of the conversational core are collected here
//! with explanations of their purpose and how they interact with each
//! other.

/// Configuration for the conversational query core
///
/// These values have been tuned against real operator utterances.
/// Changing them shifts the balance between guessing and asking the user
/// to clarify.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    // === ENTITY RECOGNITION ===
    /// Confidence assigned to an exact full-name (or unique brand-base) hit
    ///
    /// Exact hits terminate further consideration of the context strategy,
    /// so this must stay above `context_trigger_ceiling`.
    pub exact_confidence: f32,

    /// Confidence assigned to a suffix-stripped fuzzy hit
    ///
    /// Deliberately above `clarify_below` so that a lone fuzzy hit is
    /// accepted without a clarification round-trip.
    pub fuzzy_confidence: f32,

    /// Confidence assigned to a candidate carried over from the prior turn
    ///
    /// Kept low enough that any explicit mention in the current turn
    /// outranks it.
    pub context_confidence: f32,

    /// The context strategy only runs when no earlier candidate exceeds
    /// this confidence
    pub context_trigger_ceiling: f32,

    /// Partial-match acceptance threshold for short inputs (≤ `short_input_len` chars)
    ///
    /// Short utterances carry little signal, so a high overlap ratio is
    /// required before a partial hit is surfaced at all.
    pub partial_threshold_short: f32,

    /// Partial-match acceptance threshold for long inputs (≥ `long_input_len` chars)
    ///
    /// Long utterances dilute the overlap ratio; the bar is lowered
    /// linearly between `short_input_len` and `long_input_len`.
    pub partial_threshold_long: f32,

    /// Input length (in chars) at or below which the short threshold applies
    pub short_input_len: usize,

    /// Input length (in chars) at or above which the long threshold applies
    pub long_input_len: usize,

    /// Minimum char length for a suffix-stripped brand base to count as an
    /// exact hit on its own
    ///
    /// Bases shorter than this (e.g. a single surname) fall back to the
    /// fuzzy tier.
    pub exact_base_min_len: usize,

    // === DISAMBIGUATION ===
    /// Confidence gap between the top two candidates above which the first
    /// is accepted without asking
    pub clear_gap: f32,

    /// Minimum confidence for the exact-match fast path
    pub exact_accept_floor: f32,

    /// Below this top-candidate confidence the user is asked to choose
    pub clarify_below: f32,

    /// Maximum number of candidates offered in a clarification prompt
    pub clarify_shortlist: usize,

    // === TASK PLANNER ===
    /// Plan-confidence penalty per task beyond the third
    ///
    /// Larger plans are more likely to contain a mis-planned step, so
    /// confidence decays with size.
    pub task_count_penalty: f32,

    /// Plan-confidence penalty per dependency edge beyond the third
    pub dependency_penalty: f32,

    /// Plan-confidence boost when the current intent is a recognized
    /// continuation of the previous turn
    pub continuation_boost: f32,

    /// Lower clamp for plan confidence
    ///
    /// Even a sprawling plan is dispatched rather than discarded; the
    /// floor keeps the downstream strategy chooser from flapping.
    pub plan_confidence_floor: f32,

    // === INSIGHTS ===
    /// Health-score delta (points) considered a notable move
    pub health_notable_delta: f64,

    /// Health-score gap to a peer average considered strongly above/below
    pub health_peer_gap: f64,

    /// Revenue percentage change considered a notable move
    pub revenue_notable_pct: f64,

    /// Rent-to-sales ratio above which occupancy-cost pressure is flagged
    pub rent_pressure_ratio: f64,

    // === SIMULATED HISTORY ===
    /// Maximum relative fluctuation applied when synthesizing a
    /// prior-period value (0.15 = ±15%)
    pub history_fluctuation: f64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            exact_confidence: 1.0,
            fuzzy_confidence: 0.85,
            context_confidence: 0.6,
            context_trigger_ceiling: 0.8,
            partial_threshold_short: 0.75,
            partial_threshold_long: 0.55,
            short_input_len: 3,
            long_input_len: 6,
            exact_base_min_len: 3,
            clear_gap: 0.3,
            exact_accept_floor: 0.9,
            clarify_below: 0.85,
            clarify_shortlist: 3,
            task_count_penalty: 0.1,
            dependency_penalty: 0.05,
            continuation_boost: 0.1,
            plan_confidence_floor: 0.3,
            health_notable_delta: 5.0,
            health_peer_gap: 10.0,
            revenue_notable_pct: 10.0,
            rent_pressure_ratio: 0.3,
            history_fluctuation: 0.15,
        }
    }
}

impl AssistantConfig {
    /// Partial-match threshold for an input of `len` chars, linearly
    /// interpolated between the short and long anchors.
    pub fn partial_threshold(&self, len: usize) -> f32 {
        if len <= self.short_input_len {
            return self.partial_threshold_short;
        }
        if len >= self.long_input_len {
            return self.partial_threshold_long;
        }
        let span = (self.long_input_len - self.short_input_len) as f32;
        let t = (len - self.short_input_len) as f32 / span;
        self.partial_threshold_short + t * (self.partial_threshold_long - self.partial_threshold_short)
    }
}

//! Task planning: a classified intent becomes a validated execution DAG
//!
//! The planner expands per-intent templates into concrete tasks bound to
//! resolved merchants, optionally appends one speculative follow-up task,
//! chooses an execution strategy, and scores its own confidence. Plans are
//! constructed fresh per user turn and never persisted.

pub mod schedule;
pub mod templates;
pub mod validate;

use crate::context::ConversationContext;
use crate::core::config::AssistantConfig;
use crate::core::types::{MerchantId, PlanId};
use crate::intent::QueryIntent;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use templates::IntentTemplates;

/// Atomic analytical actions the executors understand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    FetchMetrics,
    DetectRisks,
    DiagnoseHealth,
    MatchSimilarCases,
    GenerateRecommendation,
    AggregateDataset,
    SummarizeDataset,
    CompareBaseline,
    TrendAnalysis,
    GenerateInsight,
}

impl TaskAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::FetchMetrics => "fetch_metrics",
            TaskAction::DetectRisks => "detect_risks",
            TaskAction::DiagnoseHealth => "diagnose_health",
            TaskAction::MatchSimilarCases => "match_similar_cases",
            TaskAction::GenerateRecommendation => "generate_recommendation",
            TaskAction::AggregateDataset => "aggregate_dataset",
            TaskAction::SummarizeDataset => "summarize_dataset",
            TaskAction::CompareBaseline => "compare_baseline",
            TaskAction::TrendAnalysis => "trend_analysis",
            TaskAction::GenerateInsight => "generate_insight",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fetch_metrics" => Some(TaskAction::FetchMetrics),
            "detect_risks" => Some(TaskAction::DetectRisks),
            "diagnose_health" => Some(TaskAction::DiagnoseHealth),
            "match_similar_cases" => Some(TaskAction::MatchSimilarCases),
            "generate_recommendation" => Some(TaskAction::GenerateRecommendation),
            "aggregate_dataset" => Some(TaskAction::AggregateDataset),
            "summarize_dataset" => Some(TaskAction::SummarizeDataset),
            "compare_baseline" => Some(TaskAction::CompareBaseline),
            "trend_analysis" => Some(TaskAction::TrendAnalysis),
            "generate_insight" => Some(TaskAction::GenerateInsight),
            _ => None,
        }
    }

    /// Actions that operate on the whole dataset rather than one merchant.
    pub fn entity_independent(&self) -> bool {
        matches!(
            self,
            TaskAction::AggregateDataset | TaskAction::SummarizeDataset
        )
    }
}

/// Task priority levels with explicit ordering values
///
/// Higher numeric value = higher priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TaskPriority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl TaskPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TaskPriority::Low),
            "normal" => Some(TaskPriority::Normal),
            "high" => Some(TaskPriority::High),
            "critical" => Some(TaskPriority::Critical),
            _ => None,
        }
    }
}

/// Parameter bag attached to a task.
///
/// Every task needs a merchant unless its action is entity-independent;
/// `extra` carries any additional orchestrator-supplied parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_id: Option<MerchantId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    /// Appended ahead of an anticipated follow-up turn, not user-requested
    #[serde(default)]
    pub speculative: bool,
    #[serde(default, skip_serializing_if = "ahashmap_is_empty")]
    pub extra: AHashMap<String, serde_json::Value>,
}

fn ahashmap_is_empty<K, V>(m: &AHashMap<K, V>) -> bool {
    m.is_empty()
}

/// One node of the execution DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Unique within the plan; dependency edges reference these ids
    pub id: String,
    pub action: TaskAction,
    pub params: TaskParams,
    pub depends_on: Vec<String>,
    pub priority: TaskPriority,
}

impl PlannedTask {
    pub fn new(id: impl Into<String>, action: TaskAction) -> Self {
        Self {
            id: id.into(),
            action,
            params: TaskParams::default(),
            depends_on: Vec::new(),
            priority: TaskPriority::Normal,
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.depends_on = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_merchant(mut self, id: MerchantId, name: impl Into<String>) -> Self {
        self.params.merchant_id = Some(id);
        self.params.merchant_name = Some(name.into());
        self
    }
}

/// How the orchestrator should execute a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// Deterministic task execution only
    RuleEngine,
    /// No executable tasks; answer generatively
    GenerativeFallback,
    /// Analytical tasks whose results feed generative composition
    Hybrid,
}

/// The planner's output for one turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub plan_id: PlanId,
    pub intent: QueryIntent,
    pub tasks: Vec<PlannedTask>,
    pub strategy: PlanStrategy,
    /// True when at least two tasks can start immediately
    pub parallelizable: bool,
    /// Planner self-assessment in [plan_confidence_floor, 1.0]
    pub confidence: f32,
}

impl ExecutionPlan {
    pub fn task(&self, id: &str) -> Option<&PlannedTask> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

/// A merchant reference confirmed by disambiguation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub id: MerchantId,
    pub name: String,
}

/// Keywords in recent messages that hint the user is circling a problem,
/// making a risk-detection follow-up likely
const PROBLEM_KEYWORDS: &[&str] = &[
    "投诉", "下降", "下滑", "风险", "问题", "亏损", "预警", "异常", "差评",
];

pub struct TaskPlanner {
    config: AssistantConfig,
    templates: IntentTemplates,
}

impl TaskPlanner {
    pub fn new(config: AssistantConfig, templates: IntentTemplates) -> Self {
        Self { config, templates }
    }

    /// Expand `intent` into an execution plan over the resolved entities.
    pub fn plan(
        &self,
        intent: QueryIntent,
        entities: &[ResolvedEntity],
        context: &ConversationContext,
    ) -> ExecutionPlan {
        let primary = entities.first();
        let mut tasks: Vec<PlannedTask> = Vec::new();

        for template in self.templates.tasks_for(intent) {
            let mut task = PlannedTask::new(template.action.as_str(), template.action);
            task.priority = template.priority;
            task.depends_on = template
                .depends_on
                .iter()
                .map(|a| a.as_str().to_string())
                .collect();
            if !template.action.entity_independent() {
                if let Some(entity) = primary {
                    task = task.with_merchant(entity.id.clone(), entity.name.clone());
                }
            }
            tasks.push(task);
        }

        // Speculative follow-up: risk detection is pre-planned when recent
        // turns keep circling a problem, trading a little wasted work for
        // lower latency on the likely next question
        if let Some(entity) = primary {
            let has_risk_task = tasks.iter().any(|t| t.action == TaskAction::DetectRisks);
            if !has_risk_task && !tasks.is_empty() && self.suggests_follow_up(context) {
                let mut task = PlannedTask::new("detect_risks", TaskAction::DetectRisks)
                    .with_merchant(entity.id.clone(), entity.name.clone());
                task.priority = TaskPriority::Low;
                task.params.speculative = true;
                tracing::debug!(merchant = %entity.id, "appending speculative risk detection");
                tasks.push(task);
            }
        }

        let strategy = self.choose_strategy(intent, &tasks);
        let parallelizable = is_parallelizable(&tasks);
        let confidence = self.plan_confidence(&tasks, context);

        let plan = ExecutionPlan {
            plan_id: PlanId::new(),
            intent,
            tasks,
            strategy,
            parallelizable,
            confidence,
        };
        tracing::debug!(
            plan_id = ?plan.plan_id,
            tasks = plan.tasks.len(),
            ?strategy,
            confidence,
            "planned turn"
        );
        plan
    }

    fn choose_strategy(&self, intent: QueryIntent, tasks: &[PlannedTask]) -> PlanStrategy {
        if tasks.is_empty()
            || matches!(intent, QueryIntent::Conversational | QueryIntent::Unknown)
        {
            PlanStrategy::GenerativeFallback
        } else if intent.is_analytical() {
            PlanStrategy::Hybrid
        } else {
            PlanStrategy::RuleEngine
        }
    }

    /// Confidence starts at 1.0 and decays with plan size and wiring
    /// density; a recognized continuation of the previous turn restores
    /// some of it.
    fn plan_confidence(&self, tasks: &[PlannedTask], context: &ConversationContext) -> f32 {
        let mut confidence = 1.0f32;

        let task_count = tasks.len();
        if task_count > 3 {
            confidence -= self.config.task_count_penalty * (task_count - 3) as f32;
        }

        let edge_count: usize = tasks.iter().map(|t| t.depends_on.len()).sum();
        if edge_count > 3 {
            confidence -= self.config.dependency_penalty * (edge_count - 3) as f32;
        }

        if let Some(last) = context.last_intent {
            let expected = expected_follow_up_actions(last);
            if tasks.iter().any(|t| expected.contains(&t.action)) {
                confidence += self.config.continuation_boost;
            }
        }

        confidence.clamp(self.config.plan_confidence_floor, 1.0)
    }

    fn suggests_follow_up(&self, context: &ConversationContext) -> bool {
        context
            .recent_messages
            .iter()
            .any(|m| PROBLEM_KEYWORDS.iter().any(|k| m.content.contains(k)))
    }
}

impl Default for TaskPlanner {
    fn default() -> Self {
        Self::new(AssistantConfig::default(), IntentTemplates::builtin())
    }
}

/// At least two tasks startable at once, or a fully flat plan.
fn is_parallelizable(tasks: &[PlannedTask]) -> bool {
    let roots = tasks.iter().filter(|t| t.depends_on.is_empty()).count();
    roots >= 2 || tasks.iter().all(|t| t.depends_on.is_empty())
}

/// Fixed table: after handling `last`, which actions is the user likely to
/// ask for next?
fn expected_follow_up_actions(last: QueryIntent) -> &'static [TaskAction] {
    match last {
        QueryIntent::MerchantStatus => &[
            TaskAction::CompareBaseline,
            TaskAction::DetectRisks,
            TaskAction::TrendAnalysis,
        ],
        QueryIntent::RiskWarning => &[
            TaskAction::DiagnoseHealth,
            TaskAction::GenerateRecommendation,
        ],
        QueryIntent::Recommendation => &[TaskAction::FetchMetrics],
        QueryIntent::Aggregation => &[TaskAction::AggregateDataset, TaskAction::CompareBaseline],
        QueryIntent::Comparison => &[
            TaskAction::GenerateRecommendation,
            TaskAction::TrendAnalysis,
        ],
        QueryIntent::TrendAnalysis => &[TaskAction::CompareBaseline],
        QueryIntent::Conversational | QueryIntent::Unknown => &[],
    }
}

//! Per-intent task templates
//!
//! Each intent expands to a fixed set of actions with static dependency
//! edges. The built-in table mirrors `data/intents.toml`; deployments can
//! override it by loading that file at startup.

use crate::intent::QueryIntent;
use crate::planner::{TaskAction, TaskPriority};
use ahash::AHashMap;
use std::fs;
use std::path::Path;

/// One task slot inside an intent's template
#[derive(Debug, Clone)]
pub struct TaskTemplate {
    pub action: TaskAction,
    pub depends_on: Vec<TaskAction>,
    pub priority: TaskPriority,
}

impl TaskTemplate {
    fn new(action: TaskAction, depends_on: &[TaskAction], priority: TaskPriority) -> Self {
        Self {
            action,
            depends_on: depends_on.to_vec(),
            priority,
        }
    }
}

/// All intent templates known to the planner
#[derive(Debug, Clone)]
pub struct IntentTemplates {
    templates: AHashMap<QueryIntent, Vec<TaskTemplate>>,
}

impl IntentTemplates {
    /// The compiled-in template table.
    pub fn builtin() -> Self {
        use TaskAction::*;
        use TaskPriority::{High, Normal};

        let mut templates: AHashMap<QueryIntent, Vec<TaskTemplate>> = AHashMap::new();

        templates.insert(
            QueryIntent::MerchantStatus,
            vec![
                TaskTemplate::new(FetchMetrics, &[], Normal),
                TaskTemplate::new(GenerateInsight, &[FetchMetrics], Normal),
            ],
        );
        templates.insert(
            QueryIntent::RiskWarning,
            vec![
                TaskTemplate::new(DetectRisks, &[], High),
                TaskTemplate::new(DiagnoseHealth, &[DetectRisks], Normal),
                TaskTemplate::new(GenerateInsight, &[DiagnoseHealth], Normal),
            ],
        );
        templates.insert(
            QueryIntent::Recommendation,
            vec![
                TaskTemplate::new(DetectRisks, &[], High),
                TaskTemplate::new(DiagnoseHealth, &[DetectRisks], Normal),
                TaskTemplate::new(MatchSimilarCases, &[DiagnoseHealth], Normal),
                TaskTemplate::new(
                    GenerateRecommendation,
                    &[DiagnoseHealth, MatchSimilarCases],
                    Normal,
                ),
            ],
        );
        templates.insert(
            QueryIntent::Aggregation,
            vec![
                TaskTemplate::new(AggregateDataset, &[], Normal),
                TaskTemplate::new(SummarizeDataset, &[AggregateDataset], Normal),
            ],
        );
        templates.insert(
            QueryIntent::Comparison,
            vec![
                TaskTemplate::new(FetchMetrics, &[], Normal),
                TaskTemplate::new(CompareBaseline, &[FetchMetrics], Normal),
                TaskTemplate::new(GenerateInsight, &[CompareBaseline], Normal),
            ],
        );
        templates.insert(
            QueryIntent::TrendAnalysis,
            vec![
                TaskTemplate::new(FetchMetrics, &[], Normal),
                TaskTemplate::new(TrendAnalysis, &[FetchMetrics], Normal),
                TaskTemplate::new(GenerateInsight, &[TrendAnalysis], Normal),
            ],
        );

        Self { templates }
    }

    /// Load templates from a TOML file, replacing the built-in table for
    /// every intent the file mentions.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse_toml(&content)
    }

    fn parse_toml(content: &str) -> Result<Self, String> {
        let toml: toml::Value = content
            .parse()
            .map_err(|e| format!("Invalid TOML: {}", e))?;

        let mut out = Self::builtin();

        let Some(intents) = toml.get("intent").and_then(|v| v.as_table()) else {
            return Err("missing [intent] tables".to_string());
        };

        for (intent_key, entries) in intents {
            let intent = parse_intent_key(intent_key)
                .ok_or_else(|| format!("Unknown intent '{}'", intent_key))?;
            let Some(entries) = entries.as_array() else {
                return Err(format!("intent.{} must be an array of tasks", intent_key));
            };

            let mut templates = Vec::new();
            for entry in entries {
                templates.push(parse_task_template(entry, intent_key)?);
            }
            validate_template_edges(intent_key, &templates)?;
            out.templates.insert(intent, templates);
        }

        Ok(out)
    }

    /// Template for `intent`; conversational intents have no tasks.
    pub fn tasks_for(&self, intent: QueryIntent) -> &[TaskTemplate] {
        self.templates
            .get(&intent)
            .map(|t| t.as_slice())
            .unwrap_or(&[])
    }
}

impl Default for IntentTemplates {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_intent_key(key: &str) -> Option<QueryIntent> {
    match key {
        "merchant_status" => Some(QueryIntent::MerchantStatus),
        "risk_warning" => Some(QueryIntent::RiskWarning),
        "recommendation" => Some(QueryIntent::Recommendation),
        "aggregation" => Some(QueryIntent::Aggregation),
        "comparison" => Some(QueryIntent::Comparison),
        "trend_analysis" => Some(QueryIntent::TrendAnalysis),
        _ => None,
    }
}

fn parse_task_template(entry: &toml::Value, intent_key: &str) -> Result<TaskTemplate, String> {
    let action = entry
        .get("action")
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("intent.{}: task missing 'action'", intent_key))?;
    let action = TaskAction::parse(action)
        .ok_or_else(|| format!("intent.{}: unknown action '{}'", intent_key, action))?;

    let mut depends_on = Vec::new();
    if let Some(deps) = entry.get("depends_on").and_then(|v| v.as_array()) {
        for dep in deps {
            let dep = dep
                .as_str()
                .ok_or_else(|| format!("intent.{}: depends_on entries must be strings", intent_key))?;
            depends_on.push(
                TaskAction::parse(dep)
                    .ok_or_else(|| format!("intent.{}: unknown dependency '{}'", intent_key, dep))?,
            );
        }
    }

    let priority = match entry.get("priority").and_then(|v| v.as_str()) {
        Some(p) => TaskPriority::parse(p)
            .ok_or_else(|| format!("intent.{}: unknown priority '{}'", intent_key, p))?,
        None => TaskPriority::Normal,
    };

    Ok(TaskTemplate {
        action,
        depends_on,
        priority,
    })
}

/// Every dependency must name an action defined earlier in the same
/// template; the planner relies on templates being dangling-free.
fn validate_template_edges(intent_key: &str, templates: &[TaskTemplate]) -> Result<(), String> {
    let mut seen: Vec<TaskAction> = Vec::new();
    for t in templates {
        for dep in &t.depends_on {
            if !seen.contains(dep) {
                return Err(format!(
                    "intent.{}: dependency '{}' not defined before '{}'",
                    intent_key,
                    dep.as_str(),
                    t.action.as_str()
                ));
            }
        }
        seen.push(t.action);
    }
    Ok(())
}

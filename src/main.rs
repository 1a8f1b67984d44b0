//! Atrium Ops - demo console
//!
//! A minimal stand-in for the real orchestrating layer: reads operator
//! questions from stdin, runs them through the full pipeline (recognize →
//! disambiguate → plan → validate → execute), and prints the structured
//! results a response-composition layer would normally turn into prose.

use atrium_ops::context::{ConversationContext, ConversationMessage};
use atrium_ops::core::config::AssistantConfig;
use atrium_ops::core::error::Result;
use atrium_ops::core::types::MetricField;
use atrium_ops::dataset::store::sample_merchants;
use atrium_ops::dataset::{DatasetProvider, InMemoryDataset, MerchantRecord};
use atrium_ops::disambiguation::{Disambiguator, Resolution};
use atrium_ops::intent::QueryIntent;
use atrium_ops::planner::templates::IntentTemplates;
use atrium_ops::planner::validate::validate_plan;
use atrium_ops::planner::{schedule, ResolvedEntity, TaskPlanner};
use atrium_ops::query::{
    AggregateOp, AggregationExecutor, AggregationRequest, ComparisonExecutor, ComparisonRequest,
    ComparisonTarget, GroupKey, QueryCache, SimulatedHistory,
};
use atrium_ops::recognition::{CandidateEntity, Recognizer};

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "atrium-ops", about = "Mall operations assistant demo console")]
struct Args {
    /// Intent template TOML overriding the built-in table
    #[arg(long)]
    intents: Option<PathBuf>,

    /// Relative fluctuation of the simulated history (0.15 = ±15%)
    #[arg(long, default_value_t = 0.15)]
    fluctuation: f64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium_ops=info".into()),
        )
        .init();

    let args = Args::parse();

    let templates = match &args.intents {
        Some(path) => match IntentTemplates::load(path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!("falling back to built-in templates: {}", e);
                IntentTemplates::builtin()
            }
        },
        None => IntentTemplates::builtin(),
    };

    let config = AssistantConfig::default();
    let recognizer = Recognizer::new(config.clone());
    let disambiguator = Disambiguator::new(config.clone());
    let planner = TaskPlanner::new(config.clone(), templates);
    let history = SimulatedHistory::new(args.fluctuation);
    let aggregator = AggregationExecutor::new(history.clone());
    let comparator = ComparisonExecutor::new(history, config);
    let mut cache = QueryCache::new(Duration::from_secs(300));

    let store = InMemoryDataset::with_merchants(sample_merchants());
    let dataset = store.all_merchants();
    tracing::info!(merchants = dataset.len(), "dataset loaded");

    println!("场内共 {} 家商户。输入问题（quit 退出）：", dataset.len());

    let mut context = ConversationContext::default();
    let mut pending_shortlist: Option<Vec<CandidateEntity>> = None;

    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "quit" | "exit" | "退出") {
            break;
        }

        // A clarification round-trip takes priority over fresh recognition
        let entity = if let Some(shortlist) = pending_shortlist.take() {
            match disambiguator.resolve_clarification(input, &shortlist) {
                Some(candidate) => Some(ResolvedEntity {
                    id: candidate.merchant_id.clone(),
                    name: candidate.name.clone(),
                }),
                None => {
                    println!("没有对上号，请回复序号或店铺名称。");
                    pending_shortlist = Some(shortlist);
                    continue;
                }
            }
        } else {
            let candidates = recognizer.recognize(input, Some(&context), dataset);
            match disambiguator.disambiguate(&candidates, input, Some(&context)) {
                Resolution::Resolved { merchant_id, name, .. } => Some(ResolvedEntity {
                    id: merchant_id,
                    name,
                }),
                Resolution::NoMatch { .. } => None,
                Resolution::NeedsClarification { candidates, prompt } => {
                    println!("{}", prompt);
                    pending_shortlist = Some(candidates);
                    continue;
                }
            }
        };

        let intent = QueryIntent::infer(input);
        if entity.is_none()
            && !matches!(
                intent,
                QueryIntent::Aggregation | QueryIntent::Conversational | QueryIntent::Unknown
            )
        {
            println!("没听出您问的是哪家商户，请指明店铺名称。");
            continue;
        }
        let entities: Vec<ResolvedEntity> = entity.iter().cloned().collect();
        let plan = planner.plan(intent, &entities, &context);

        let validation = validate_plan(&plan);
        if !validation.valid {
            for error in &validation.errors {
                tracing::warn!("{}", error);
            }
            println!("这个问题我需要换个方式处理，请换种问法试试。");
            continue;
        }

        println!(
            "[计划] 意图 {:?} · {} 个任务 · 置信度 {:.2} · 批次 {:?}",
            plan.intent,
            plan.tasks.len(),
            plan.confidence,
            schedule::execution_batches(&plan)?
        );

        if let Err(e) = answer(
            intent,
            input,
            entity.as_ref(),
            dataset,
            &aggregator,
            &comparator,
            &mut cache,
        ) {
            println!("查询失败：{}", e);
        }

        context.prior_merchant_id = entity.as_ref().map(|e| e.id.clone());
        context.prior_merchant_name = entity.map(|e| e.name);
        context.last_intent = Some(intent);
        context
            .recent_messages
            .push(ConversationMessage::new(input));
        if context.recent_messages.len() > 5 {
            context.recent_messages.remove(0);
        }
    }

    println!("再见！");
    Ok(())
}

/// Execute the analytical part of the turn and print the result.
fn answer(
    intent: QueryIntent,
    input: &str,
    entity: Option<&ResolvedEntity>,
    dataset: &[MerchantRecord],
    aggregator: &AggregationExecutor<SimulatedHistory>,
    comparator: &ComparisonExecutor<SimulatedHistory>,
    cache: &mut QueryCache,
) -> Result<()> {
    match intent {
        QueryIntent::Aggregation => {
            let request = aggregation_request(input);
            let result = cache.get_or_compute(&request, || aggregator.execute(&request, dataset))?;
            println!("[汇总] {} = {}", request.operation.as_str(), result.total);
            if let Some(breakdown) = &result.breakdown {
                for (group, value) in breakdown {
                    println!("  {}: {}", group, value);
                }
            }
            println!("  覆盖 {} 家商户", result.merchants.len());
        }
        _ => {
            let Some(entity) = entity else {
                println!("没听出您问的是哪家商户，请指明店铺名称。");
                return Ok(());
            };
            let request = ComparisonRequest::new(entity.id.as_str(), comparison_target(input));
            let result = comparator.execute(&request, dataset)?;
            println!(
                "[对比] {} vs {}",
                result.subject.name, result.baseline_label
            );
            for insight in &result.insights {
                println!("  · {}", insight);
            }
        }
    }
    Ok(())
}

/// Crude keyword mapping; the real orchestrator supplies structured
/// requests instead.
fn aggregation_request(input: &str) -> AggregationRequest {
    if input.contains("平均") {
        AggregationRequest {
            operation: AggregateOp::Avg,
            field: Some(MetricField::HealthScore),
            group_by: Some(GroupKey::RiskLevel),
            ..Default::default()
        }
    } else {
        AggregationRequest {
            operation: AggregateOp::Count,
            group_by: Some(GroupKey::RiskLevel),
            ..Default::default()
        }
    }
}

fn comparison_target(input: &str) -> ComparisonTarget {
    if input.contains("品类") || input.contains("同类") {
        ComparisonTarget::Category
    } else if input.contains("楼层") || input.contains("同层") {
        ComparisonTarget::Floor
    } else {
        ComparisonTarget::Time
    }
}

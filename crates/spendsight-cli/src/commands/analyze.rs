//! Analysis command implementations (analyze, strategy, compare)

use anyhow::Result;
use spendsight_core::{AIClient, AnalyticsConfig, Database, InsightGenerator, StrategyEngine};

use crate::cli::Scope;

pub async fn cmd_analyze(
    db: Database,
    ai: AIClient,
    config: AnalyticsConfig,
    scope: &Scope,
) -> Result<()> {
    let engine = StrategyEngine::new(db, ai, config);

    if !scope.json {
        println!(
            "🔍 Analyzing spending for user {} ({} via {})...",
            scope.user,
            engine.generator().provider(),
            engine.generator().model()
        );
    }

    let result = engine.analyze(scope.user, scope.from, scope.to).await?;

    if scope.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let meta = &result.metadata;
    println!();
    println!("📊 Analysis ({})", meta.data_period);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Transactions: {}", result.transaction_count);
    println!("   Strategy: {}", result.strategy());
    println!("   Reasoning: {}", meta.reasoning);

    if let Some(aggregate) = &result.aggregate {
        println!();
        println!("   Spent:  {}", aggregate.total_spent);
        println!("   Income: {}", aggregate.total_income);
        println!("   Net:    {}", aggregate.net_amount);
        let top = aggregate.top_categories(5);
        if !top.is_empty() {
            println!("   Top categories:");
            for (name, amount) in top {
                println!("     {:<20} {}", name, amount);
            }
        }
    }

    if let Some(coverage) = meta.coverage.as_ref().filter(|c| c.partial) {
        println!();
        println!(
            "   ⚠️  Partial: {} of {} windows ({} most recent transactions)",
            coverage.processed_windows, coverage.total_windows, coverage.processed_transactions
        );
        println!("      Raise --max-chunks to cover more history.");
    }

    if let Some(kind) = meta.fallback {
        println!();
        println!("   ⚠️  AI provider unavailable ({}); showing a computed summary", kind);
    }

    println!();
    println!("💡 Insights");
    println!("   ─────────────────────────────────────────────────────────────");
    for line in result.narrative.lines() {
        println!("   {}", line);
    }

    println!();
    println!(
        "   ⏱️  {} ms total ({} ms counting, {} ms analysis)",
        meta.timings.total_ms, meta.timings.count_ms, meta.timings.execution_ms
    );

    Ok(())
}

pub fn cmd_strategy(db: Database, config: AnalyticsConfig, scope: &Scope) -> Result<()> {
    let engine = StrategyEngine::new(db, AIClient::mock(), config);
    let recommendation = engine.recommend(scope.user, scope.from, scope.to)?;

    if scope.json {
        println!("{}", serde_json::to_string_pretty(&recommendation)?);
        return Ok(());
    }

    let perf = &recommendation.estimated_performance;
    println!();
    println!("🧭 Recommended Strategy ({})", recommendation.data_period);
    println!("   ─────────────────────────────");
    println!("   Transactions: {}", recommendation.transaction_count);
    println!("   Strategy: {}", recommendation.recommended);
    println!("   Reasoning: {}", recommendation.reasoning);
    println!("   Estimated tokens: {}", perf.estimated_tokens);
    println!("   Response time: {}", perf.estimated_response_time);
    println!("   Cost efficiency: {}", perf.cost_efficiency);

    let insights = &recommendation.performance_insights;
    println!();
    println!("   Selection cost: {}", insights.count_query_latency);
    println!("   Database: {}", insights.database_efficiency);
    println!("   Memory: {}", insights.memory_efficiency);

    Ok(())
}

pub fn cmd_compare(db: Database, config: AnalyticsConfig, scope: &Scope) -> Result<()> {
    let engine = StrategyEngine::new(db, AIClient::mock(), config);
    let comparison = engine.compare(scope.user, scope.from, scope.to)?;

    if scope.json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(());
    }

    println!();
    println!(
        "⚖️  Strategy Comparison: {} transactions ({})",
        comparison.transaction_count, comparison.data_period
    );
    println!("   ─────────────────────────────────────────────────────────────");

    for option in &comparison.strategies {
        let marker = if option.strategy == comparison.recommended {
            "✅"
        } else if option.applicable {
            "  "
        } else {
            "➖"
        };
        println!();
        println!("   {} {}", marker, option.strategy);
        println!(
            "      ~{} tokens, {}, {}",
            option.estimated_tokens, option.estimated_response_time, option.cost_efficiency
        );
        println!("      + {}", option.advantages);
        println!("      - {}", option.disadvantages);
    }

    Ok(())
}

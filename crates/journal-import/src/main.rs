//! Command-line front end for the trade journal: create journals, import
//! broker CSV exports, and inspect metrics and custom options.

mod args;

use ai_client::{AiClient, AiConfig, AiProvider, DisabledAiProvider, HttpAiProvider};
use anyhow::{bail, Context, Result};
use ingest_orchestrator::{recompute_journal_metrics, CsvUpload, IngestConfig, IngestionPipeline};
use journal_core::{JournalInput, Metrics, TradeRepository};
use journal_store::{CustomOptions, JournalDb, OptionKind, SqliteOptionStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::args::{command, flag_value, has_flag, parsed, required, required_parsed, USAGE};

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "journal_import=info,ingest_orchestrator=info".into());

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let database_url = flag_value(&args, "--db")
        .map(str::to_string)
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite:journal.db".to_string());

    let cmd = command(&args)?;
    let db = JournalDb::new(&database_url).await?;
    info!("Using database {}", database_url);

    match cmd {
        "create-journal" => create_journal(&db, &args).await,
        "list-journals" => list_journals(&db).await,
        "import" => import(db, &args).await,
        "sessions" => sessions(&db, &args).await,
        "metrics" => metrics(db, &args).await,
        "options" => options(db, &args).await,
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

async fn create_journal(db: &JournalDb, args: &[String]) -> Result<()> {
    let input = JournalInput {
        name: required(args, "--name")?.to_string(),
        description: flag_value(args, "--description").map(str::to_string),
        broker: flag_value(args, "--broker").map(str::to_string),
        prop_firm: flag_value(args, "--prop-firm").map(str::to_string),
        account_size: parsed(args, "--account-size")?,
    };

    let journal = db.create_journal(&input).await?;
    println!("Created journal {} ({})", journal.id, journal.name);
    Ok(())
}

async fn list_journals(db: &JournalDb) -> Result<()> {
    let journals = db.list_journals().await?;
    if journals.is_empty() {
        println!("No journals yet. Create one with `journal-import create-journal --name NAME`.");
        return Ok(());
    }

    for journal in journals {
        println!(
            "{:>4}  {:<24} {:<16} {}",
            journal.id,
            journal.name,
            journal.broker.as_deref().unwrap_or("-"),
            journal.created_at.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn ai_provider(offline: bool) -> Result<Arc<dyn AiProvider>> {
    let config = AiConfig::from_env();
    if offline || config.disabled {
        info!("AI service disabled, using local heuristics");
        return Ok(Arc::new(DisabledAiProvider));
    }

    let client = AiClient::new(&config).context("failed to build AI client")?;
    info!("AI service at {}", config.base_url);
    Ok(Arc::new(HttpAiProvider::from(client)))
}

async fn import(db: JournalDb, args: &[String]) -> Result<()> {
    let journal_id: i64 = required_parsed(args, "--journal")?;
    let path = required(args, "--file")?;

    if db.get_journal(journal_id).await?.is_none() {
        bail!("journal {} does not exist", journal_id);
    }

    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());

    let repo: Arc<dyn TradeRepository> = Arc::new(db);
    let pipeline = IngestionPipeline::new(
        repo,
        ai_provider(has_flag(args, "--offline"))?,
        IngestConfig::from_env(),
    );

    let summary = match pipeline.ingest(CsvUpload::new(journal_id, file_name, content)).await {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(a) = e.accounting() {
                warn!(
                    "{} rows read: {} saved, {} invalid, {} mock, {} duplicate",
                    a.total_rows,
                    a.inserted,
                    a.parse_errors,
                    a.mock_filtered,
                    a.duplicates_in_file + a.database_duplicates
                );
            }
            bail!("import failed at {}: {}", e.stage(), e)
        }
    };

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{}", summary.message());
    for diagnostic in &summary.diagnostics {
        println!("  {}", diagnostic.message());
    }
    for taken in &summary.fallbacks {
        warn!("{:?}: {}", taken.fallback, taken.reason);
    }
    if let Some(metrics) = &summary.metrics {
        print_metrics(metrics);
    }
    if let Some(insights) = &summary.insights {
        if !insights.ai_key_insight.is_empty() {
            println!("\nKey insight: {}", insights.ai_key_insight);
        }
    }
    Ok(())
}

async fn sessions(db: &JournalDb, args: &[String]) -> Result<()> {
    let journal_id: i64 = required_parsed(args, "--journal")?;
    for session in db.list_sessions(journal_id).await? {
        println!(
            "{:>4}  {:>5} trades  pnl {:>10.2}  win rate {:>5.1}%  {}",
            session.id,
            session.metrics.total_trades,
            session.metrics.total_pnl,
            session.metrics.win_rate,
            session.created_at.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn metrics(db: JournalDb, args: &[String]) -> Result<()> {
    let journal_id: i64 = required_parsed(args, "--journal")?;
    let metrics = recompute_journal_metrics(&db, journal_id).await?;

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        print_metrics(&metrics);
    }
    Ok(())
}

async fn options(db: JournalDb, args: &[String]) -> Result<()> {
    let action = args.get(2).map(String::as_str).unwrap_or("");
    let user = required(args, "--user")?;
    let kind: OptionKind = required_parsed(args, "--kind")?;
    let options = CustomOptions::new(SqliteOptionStore::new(db));

    let values = match action {
        "list" => options.list(user, kind).await?,
        "add" => options.add(user, kind, required(args, "--value")?).await?,
        "remove" => options.remove(user, kind, required(args, "--value")?).await?,
        other => bail!("unknown options action '{}'\n\n{}", other, USAGE),
    };

    for value in values {
        println!("{}", value);
    }
    Ok(())
}

fn print_metrics(m: &Metrics) {
    println!("\nTrades:         {} ({} wins, {} losses)", m.total_trades, m.winning_trades, m.losing_trades);
    println!("Total P&L:      {:.2}", m.total_pnl);
    println!("Win rate:       {:.1}%", m.win_rate);
    println!("Profit factor:  {:.2}", m.profit_factor);
    println!("Avg win/loss:   {:.2} / {:.2}", m.avg_win, m.avg_loss);
    println!("Largest:        {:.2} / {:.2}", m.largest_win, m.largest_loss);
    println!("Max drawdown:   {:.2}", m.max_drawdown);
    println!("Streaks:        {} wins, {} losses", m.max_win_streak, m.max_loss_streak);
    println!("Expectancy:     {:.2}", m.expectancy);
}

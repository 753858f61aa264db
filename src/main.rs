use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use research_digest::config::{ConfigPaths, LlmSettings, Settings};
use research_digest::report::{Report, ReportGenerator};
use research_digest::scoring::llm::build_judge;
use research_digest::scoring::{KeywordScorer, LlmScorer, RelevanceScorer};
use research_digest::sources::{ArxivSource, CrossRefSource, FetchWindow, RssSource, Source};
use research_digest::ui::{self, Status};
use research_digest::utils::{deduplicate_papers, DecisionCache};
use research_digest::Paper;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Research Digest - Collect new papers and rank them against your research interests
#[derive(Parser, Debug)]
#[command(name = "research-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect new papers from arXiv, journal feeds and CrossRef and write a relevance-ranked digest", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Number of days to look back (defaults to search.default_days)
    #[arg(long)]
    days: Option<u32>,

    /// Keywords configuration file
    #[arg(long, default_value = "config/keywords.yaml")]
    config: PathBuf,

    /// Journal sources configuration file
    #[arg(long, default_value = "config/sources.yaml")]
    sources_config: PathBuf,

    /// LLM configuration file
    #[arg(long, global = true, default_value = "config/llm.yaml")]
    llm_config: PathBuf,

    /// Minimum relevance score to keep a paper
    #[arg(long, default_value_t = 1)]
    min_score: u32,

    /// Write the short summary report instead of the full one
    #[arg(long)]
    summary: bool,

    /// Directory for generated reports
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Which sources to fetch from
    #[arg(long, value_enum, default_value_t = SourceSelection::All)]
    source: SourceSelection,

    /// Only fetch this journal code (journal-based sources)
    #[arg(long)]
    journal: Option<String>,

    /// Score papers with an LLM instead of keyword matching
    #[arg(long)]
    use_llm: bool,

    /// Remove duplicate papers across sources before scoring
    #[arg(long)]
    dedup: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Source groups selectable with `--source`
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SourceSelection {
    All,
    Arxiv,
    Sage,
    Nature,
    Other,
    Crossref,
}

impl SourceSelection {
    fn includes(self, other: SourceSelection) -> bool {
        self == SourceSelection::All || self == other
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage the LLM decision cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum CacheCommands {
    /// Show cache directory, entry count and size
    Status,

    /// Remove decisions older than the given age
    Clean {
        /// Maximum age in days (defaults to cache.max_age_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Remove every cached decision
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("research_digest={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Some(Commands::Cache { ref command }) => run_cache_command(&cli, command),
        None => run_digest(&cli).await,
    }
}

fn run_cache_command(cli: &Cli, command: &CacheCommands) -> Result<()> {
    let settings = LlmSettings::load(&cli.llm_config)?;
    let cache = DecisionCache::open(&settings.cache.directory).with_context(|| {
        format!(
            "Failed to open cache directory {}",
            settings.cache.directory.display()
        )
    })?;

    match command {
        CacheCommands::Status => {
            let stats = cache.stats()?;
            println!("Directory: {}", stats.cache_dir.display());
            println!("Decisions: {} ({} KB)", stats.entries, stats.total_size_kb);
        }
        CacheCommands::Clean { days } => {
            let days = days.unwrap_or(settings.cache.max_age_days);
            let removed = cache.evict_older_than(chrono::Duration::days(i64::from(days)))?;
            if !cli.quiet {
                eprintln!("Removed {} decisions older than {} days.", removed, days);
            }
        }
        CacheCommands::Clear => {
            if !cli.quiet {
                eprintln!("Clearing all cached decisions...");
            }
            let removed = cache.clear()?;
            if !cli.quiet {
                eprintln!("Cache cleared successfully ({} decisions).", removed);
            }
        }
    }
    Ok(())
}

async fn run_digest(cli: &Cli) -> Result<()> {
    let paths = ConfigPaths {
        keywords: cli.config.clone(),
        sources: cli.sources_config.clone(),
        llm: cli.llm_config.clone(),
    };
    let settings = Settings::load(&paths)?;

    let days = cli.days.unwrap_or(settings.keywords.search.default_days);

    // Fail on bad LLM settings before any network traffic
    let mut scorer: Box<dyn RelevanceScorer> = if cli.use_llm {
        let judge = build_judge(&settings.llm)?;
        Box::new(LlmScorer::open(
            &settings.llm.cache.directory,
            judge,
            settings.llm.research_interests.clone(),
        )?)
    } else {
        Box::new(KeywordScorer::new(
            &settings.keywords.keywords.primary,
            &settings.keywords.keywords.secondary,
        )?)
    };

    let min_score = if cli.use_llm && cli.min_score <= 1 {
        settings.llm.scoring.min_score
    } else {
        cli.min_score
    };

    if !cli.quiet {
        ui::print_rule();
        ui::print_setting("Research Digest", research_digest::VERSION);
        ui::print_setting("Time range", format!("last {} days", days));
        ui::print_setting("Scoring", scorer.mode());
        ui::print_setting("Minimum score", min_score);
        ui::print_rule();
    }

    let mut window = FetchWindow::last_days(days);
    if let Some(journal) = &cli.journal {
        window = window.journal(journal.clone());
    }

    let sources = build_sources(cli.source, &settings)?;
    let mut papers = fetch_all(&sources, &window, cli.quiet).await;

    if papers.is_empty() {
        ui::print_status(Status::Warning, "No papers fetched. Exiting.");
        return Ok(());
    }

    if cli.dedup {
        let before = papers.len();
        papers = deduplicate_papers(papers);
        if !cli.quiet {
            ui::print_status(
                Status::Info,
                &format!("Removed {} duplicates", before - papers.len()),
            );
        }
    }

    if !cli.quiet {
        ui::print_section(&format!("Scoring {} papers ({})", papers.len(), scorer.mode()));
    }
    let filtered = scorer.score_papers(papers, min_score).await;

    if filtered.is_empty() {
        ui::print_status(
            Status::Warning,
            &format!("No papers passed the filter (min_score={}). Exiting.", min_score),
        );
        return Ok(());
    }

    let groups = scorer.group_by_relevance(&filtered);
    if !cli.quiet {
        ui::print_section("Grouping by relevance");
        ui::print_tiers(&groups, scorer.thresholds());
    }

    let report = Report {
        papers: &filtered,
        groups,
        days,
        mode: scorer.mode(),
        thresholds: scorer.thresholds(),
    };
    let generator = ReportGenerator::new(&cli.output_dir);
    let written = if cli.summary {
        generator.write_summary(&report)
    } else {
        generator.write_full(&report)
    };

    match written {
        Ok(path) => {
            if !cli.quiet {
                ui::print_section("Done");
                ui::print_status(
                    Status::Success,
                    &format!("Report saved to: {}", path.display()),
                );
            }
            Ok(())
        }
        Err(e) => {
            ui::print_status(Status::Error, &format!("Failed to write report: {}", e));
            std::process::exit(1);
        }
    }
}

/// Instantiate the sources picked by `--source`
fn build_sources(selection: SourceSelection, settings: &Settings) -> Result<Vec<Box<dyn Source>>> {
    let mut sources: Vec<Box<dyn Source>> = Vec::new();

    if selection.includes(SourceSelection::Arxiv) {
        sources.push(Box::new(ArxivSource::new(
            settings.keywords.arxiv.categories.clone(),
            settings.keywords.search.max_results,
        )?));
    }

    let feed_groups = [
        (SourceSelection::Sage, "sage", "SAGE", &settings.sources.sage_journals),
        (SourceSelection::Nature, "nature", "Nature", &settings.sources.nature_journals),
        (SourceSelection::Other, "other", "Other", &settings.sources.other_journals),
    ];
    for (group, id, name, journals) in feed_groups {
        if selection.includes(group) {
            sources.push(Box::new(RssSource::new(id, name, journals.clone())?));
        }
    }

    if selection.includes(SourceSelection::Crossref) {
        sources.push(Box::new(CrossRefSource::new(
            settings.sources.crossref_journals.clone(),
        )?));
    }

    Ok(sources)
}

/// Fetch from each source in turn; a failing source contributes nothing
async fn fetch_all(sources: &[Box<dyn Source>], window: &FetchWindow, quiet: bool) -> Vec<Paper> {
    let mut papers = Vec::new();

    for source in sources {
        if !quiet {
            ui::print_section(&format!("Fetching from {}", source.name()));
        }
        match source.fetch(window).await {
            Ok(fetched) => {
                if !quiet {
                    ui::print_status(
                        Status::Success,
                        &format!("{}: {} papers", source.name(), fetched.len()),
                    );
                }
                papers.extend(fetched);
            }
            Err(e) => {
                tracing::warn!("Source {} failed: {}", source.id(), e);
                ui::print_status(Status::Error, &format!("{}: {}", source.name(), e));
            }
        }
    }

    if !quiet {
        ui::print_status(
            Status::Info,
            &format!("Total papers fetched: {}", papers.len()),
        );
    }
    papers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["research-digest"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(cli.days.is_none());
        assert_eq!(cli.config, PathBuf::from("config/keywords.yaml"));
        assert_eq!(cli.sources_config, PathBuf::from("config/sources.yaml"));
        assert_eq!(cli.llm_config, PathBuf::from("config/llm.yaml"));
        assert_eq!(cli.min_score, 1);
        assert!(!cli.summary);
        assert_eq!(cli.output_dir, PathBuf::from("outputs"));
        assert_eq!(cli.source, SourceSelection::All);
        assert!(cli.journal.is_none());
        assert!(!cli.use_llm);
        assert!(!cli.dedup);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["research-digest", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["research-digest", "-vv"]);
        assert_eq!(cli.verbose, 2);

        let cli = Cli::parse_from(["research-digest", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_cli_run_options() {
        let cli = Cli::parse_from([
            "research-digest",
            "--days",
            "14",
            "--source",
            "sage",
            "--journal",
            "asr",
            "--use-llm",
            "--min-score",
            "60",
            "--summary",
            "--dedup",
            "--output-dir",
            "/tmp/digests",
        ]);
        assert_eq!(cli.days, Some(14));
        assert_eq!(cli.source, SourceSelection::Sage);
        assert_eq!(cli.journal.as_deref(), Some("asr"));
        assert!(cli.use_llm);
        assert_eq!(cli.min_score, 60);
        assert!(cli.summary);
        assert!(cli.dedup);
        assert_eq!(cli.output_dir, PathBuf::from("/tmp/digests"));
    }

    #[test]
    fn test_cli_rejects_unknown_source() {
        assert!(Cli::try_parse_from(["research-digest", "--source", "scholar"]).is_err());
    }

    #[test]
    fn test_source_selection() {
        assert!(SourceSelection::All.includes(SourceSelection::Crossref));
        assert!(SourceSelection::Nature.includes(SourceSelection::Nature));
        assert!(!SourceSelection::Nature.includes(SourceSelection::Sage));
    }

    #[test]
    fn test_cache_subcommands() {
        let cli = Cli::parse_from(["research-digest", "cache", "status"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Cache { command: CacheCommands::Status })
        ));

        let cli = Cli::parse_from(["research-digest", "cache", "clean", "--days", "30"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Cache { command: CacheCommands::Clean { days: Some(30) } })
        ));

        let cli = Cli::parse_from(["research-digest", "cache", "clear", "--llm-config", "llm.yaml"]);
        assert_eq!(cli.llm_config, PathBuf::from("llm.yaml"));
        assert!(matches!(
            cli.command,
            Some(Commands::Cache { command: CacheCommands::Clear })
        ));
    }
}

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use bibmeld_core::{
    AppConfig, BibmeldError, CanonicalRecord, ExitCode, ListedPublication, MatchTarget,
};
use bibmeld_science::identifiers::{find_arxiv_in_text, find_doi_in_html};
use bibmeld_science::{
    CslJsonAdapter, Deduplicator, Enricher, MergeOutcome, MergePolicy, REFETCH_THRESHOLD, RecordStore,
    ScienceError, SourceAdapter, StoreOutcome, best_item, collect_enrichers, compare_identity,
    needs_refetch, pick_candidate,
};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bibmeld",
    about = "Resolve, deduplicate and merge bibliographic records",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting BIBMELD_JSON=1.
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge enricher records into a primary record by source trust.
    Merge {
        /// JSON file: {"primary": record, "enrichers": [{"source": tag, "record": record}]}
        input: PathBuf,
        /// Drop enrichers that are not the same publication as the primary.
        #[arg(long)]
        gate: bool,
    },

    /// Deduplicate a publication list, optionally merging in a second one.
    Dedup {
        /// JSON array of list items ({"title", "authors", "year", "venue"}).
        primary: PathBuf,
        #[arg(long)]
        secondary: Option<PathBuf>,
        /// Fill truncated titles, authors and venues from this fuller list.
        #[arg(long)]
        repair: Option<PathBuf>,
    },

    /// Decide whether two records describe the same publication.
    Match { a: PathBuf, b: PathBuf },

    /// Pick the search result describing a known publication.
    Pick {
        /// JSON array of raw search results.
        candidates: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        /// Best related result at the looser best-item threshold.
        #[arg(long)]
        loose: bool,
    },

    /// Find the DOI and arXiv id in a saved landing page or text file.
    Extract { file: PathBuf },

    /// Store records into per-author directories.
    Store {
        /// AUTHOR=FILE pairs; FILE holds a JSON array of records.
        #[arg(required = true)]
        jobs: Vec<StoreJob>,
        /// Records are CSL-JSON items instead of canonical records.
        #[arg(long)]
        csl: bool,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information.
    Version,
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file path.
    Path,
    /// Show the effective config.
    Show,
    /// Write the default config file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MergeInput {
    primary: CanonicalRecord,
    #[serde(default)]
    enrichers: Vec<Enricher>,
}

#[derive(Debug, Clone, PartialEq)]
struct StoreJob {
    author: String,
    file: PathBuf,
}

impl FromStr for StoreJob {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let bad = || format!("expected AUTHOR=FILE, got `{s}`");
        let (author, file) = s.split_once('=').ok_or_else(bad)?;
        let (author, file) = (author.trim(), file.trim());
        if author.is_empty() || file.is_empty() {
            return Err(bad());
        }
        Ok(Self {
            author: author.to_string(),
            file: PathBuf::from(file),
        })
    }
}

#[derive(Debug, Default, PartialEq, Serialize)]
struct FoundIdentifiers {
    doi: Option<String>,
    arxiv: Option<String>,
}

#[derive(Debug, Serialize)]
struct AuthorReport {
    author: String,
    dir: PathBuf,
    outcomes: Vec<StoreOutcome>,
}

// ─── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let start = Instant::now();
    let cli = Cli::parse();

    // ── Env var overrides ──────────────────────────────────────────────────
    let json_output = cli.json || std::env::var("BIBMELD_JSON").as_deref() == Ok("1");

    init_tracing();

    if let Err(err) = run(cli.command, json_output, start) {
        let code = exit_code(&err);
        if json_output {
            println!(
                "{}",
                json!({
                    "status": "error",
                    "error": error_kind(code),
                    "message": format!("{err:#}"),
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                })
            );
        } else {
            eprintln!("error: {err:#}");
        }
        std::process::exit(code as i32);
    }
}

fn run(command: Commands, json_output: bool, start: Instant) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Ok(dir) = std::env::var("BIBMELD_OUTPUT_DIR") {
        config.store.output_dir = dir;
    }
    tracing::debug!(path = %AppConfig::config_path().display(), "config loaded");

    match command {
        // ── Merge ──────────────────────────────────────────────────────────

        Commands::Merge { input, gate } => {
            let input: MergeInput = read_json(&input)?;
            let outcome = run_merge(input, &MergePolicy::from_config(&config), gate);

            respond(json_output, start, json!(outcome), || {
                println!("{}", serde_json::to_string_pretty(&outcome.record)?);
                for (source, used) in &outcome.contributions {
                    let state = if *used { "contributed" } else { "unused" };
                    println!("  {source:<14} {state}");
                }
                println!("  validated sources: {}", outcome.validated_sources);
                for event in &outcome.events {
                    println!("  ! {}", serde_json::to_string(event)?);
                }
                Ok(())
            })
        }

        // ── Dedup ──────────────────────────────────────────────────────────

        Commands::Dedup {
            primary,
            secondary,
            repair,
        } => {
            let mut primary: Vec<ListedPublication> = read_json(&primary)?;
            let dedup = Deduplicator::new(config.matching.clone());
            if let Some(path) = repair {
                let richer: Vec<ListedPublication> = read_json(&path)?;
                primary = dedup.repair_list(&primary, &richer);
            }
            let (items, input) = match secondary {
                Some(path) => {
                    let secondary: Vec<ListedPublication> = read_json(&path)?;
                    let input = primary.len() + secondary.len();
                    (dedup.merge_lists(&primary, &secondary), input)
                }
                None => (dedup.dedupe_within(&primary), primary.len()),
            };

            let refetch = items
                .iter()
                .filter(|item| needs_refetch(item, REFETCH_THRESHOLD))
                .count();

            let data = json!({
                "items": items,
                "total": items.len(),
                "input": input,
                "needs_refetch": refetch,
            });
            respond(json_output, start, data, || {
                for item in &items {
                    let year = item.year.map(|y| y.to_string()).unwrap_or_default();
                    println!("{title:<60}  {year}", title = item.title);
                }
                println!("{} of {input} kept", items.len());
                if refetch > 0 {
                    println!("{refetch} still truncated");
                }
                Ok(())
            })
        }

        // ── Match ──────────────────────────────────────────────────────────

        Commands::Match { a, b } => {
            let a: CanonicalRecord = read_json(&a)?;
            let b: CanonicalRecord = read_json(&b)?;
            let decision = compare_identity(&a, &b, &config.matching);

            respond(json_output, start, json!(decision), || {
                let verdict = if decision.same { "same publication" } else { "different publications" };
                println!("{verdict} (by {:?})", decision.basis);
                if let Some(similarity) = decision.title_similarity {
                    println!("  title similarity: {similarity:.3}");
                }
                Ok(())
            })
        }

        // ── Pick ───────────────────────────────────────────────────────────

        Commands::Pick {
            candidates,
            title,
            author,
            year,
            loose,
        } => {
            let candidates: Vec<Value> = read_json(&candidates)?;
            let target = MatchTarget {
                title: title.clone(),
                author_name: author,
                year_hint: year,
            };
            let picked = if loose {
                best_item(&target, &candidates, &config.matching)
            } else {
                pick_candidate(&target, &candidates, &config.matching)
            }
            .ok_or_else(|| BibmeldError::RecordNotFound(title))?;

            respond(json_output, start, json!(picked), || {
                println!("{:?} match, score {:.3}", picked.kind, picked.score);
                println!("{}", serde_json::to_string_pretty(picked.candidate)?);
                Ok(())
            })
        }

        // ── Extract ────────────────────────────────────────────────────────

        Commands::Extract { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let found = extract_identifiers(&text);

            respond(json_output, start, json!(found), || {
                println!("doi:   {}", found.doi.as_deref().unwrap_or("-"));
                println!("arxiv: {}", found.arxiv.as_deref().unwrap_or("-"));
                Ok(())
            })
        }

        // ── Store ──────────────────────────────────────────────────────────

        Commands::Store { jobs, csl } => {
            let reports = run_store(&config, &jobs, csl)?;

            respond(json_output, start, json!(reports), || {
                for report in &reports {
                    println!("{} ({})", report.author, report.dir.display());
                    for outcome in &report.outcomes {
                        let label = match outcome {
                            StoreOutcome::Created(_) => "created",
                            StoreOutcome::Updated(_) => "updated",
                            StoreOutcome::Skipped(_) => "skipped",
                        };
                        println!("  {label:<8} {}", outcome.path().display());
                    }
                }
                Ok(())
            })
        }

        // ── Config ─────────────────────────────────────────────────────────

        Commands::Config { action } => match action {
            ConfigAction::Path => {
                let path = AppConfig::config_path();
                respond(json_output, start, json!({ "path": path }), || {
                    println!("{}", path.display());
                    Ok(())
                })
            }
            ConfigAction::Show => respond(json_output, start, json!(config), || {
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }),
            ConfigAction::Init { force } => {
                let path = AppConfig::config_path();
                if path.exists() && !force {
                    bail!("config already exists at {} (use --force to overwrite)", path.display());
                }
                AppConfig::default().save_to(&path)?;
                respond(json_output, start, json!({ "path": path }), || {
                    println!("Wrote {}", path.display());
                    Ok(())
                })
            }
        },

        // ── Version ────────────────────────────────────────────────────────

        Commands::Version => {
            let version = env!("CARGO_PKG_VERSION");
            respond(json_output, start, json!({ "version": version }), || {
                println!("bibmeld v{version}");
                Ok(())
            })
        }
    }
}

// ─── Commands ────────────────────────────────────────────────────────────────

fn run_merge(input: MergeInput, policy: &MergePolicy, gate: bool) -> MergeOutcome {
    let enrichers = if gate {
        collect_enrichers(&input.primary, input.enrichers, &policy.matching)
    } else {
        input.enrichers
    };
    policy.merge(&input.primary, &enrichers)
}

fn extract_identifiers(text: &str) -> FoundIdentifiers {
    FoundIdentifiers {
        doi: find_doi_in_html(text),
        arxiv: find_arxiv_in_text(text),
    }
}

/// Store every job, one scoped thread per author directory.
///
/// All input files are read before any thread starts, so a malformed file
/// writes nothing. Jobs naming the same author share one thread.
fn run_store(config: &AppConfig, jobs: &[StoreJob], csl: bool) -> Result<Vec<AuthorReport>> {
    let mut batches: BTreeMap<PathBuf, (String, Vec<CanonicalRecord>)> = BTreeMap::new();
    for job in jobs {
        let records = read_records(&job.file, csl)?;
        batches
            .entry(config.author_dir(&job.author))
            .or_insert_with(|| (job.author.clone(), Vec::new()))
            .1
            .extend(records);
    }

    std::thread::scope(|scope| {
        let handles: Vec<_> = batches
            .into_iter()
            .map(|(dir, (author, records))| {
                scope.spawn(move || -> Result<AuthorReport> {
                    let store = RecordStore::for_author(config, &author);
                    let outcomes = records
                        .iter()
                        .map(|record| store.store(record))
                        .collect::<bibmeld_science::Result<Vec<_>>>()
                        .with_context(|| format!("storing records for {author}"))?;
                    tracing::debug!(%author, count = outcomes.len(), "author batch stored");
                    Ok(AuthorReport { author, dir, outcomes })
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| anyhow!("store worker panicked"))?
            })
            .collect()
    })
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BIBMELD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn respond(
    json_output: bool,
    start: Instant,
    data: Value,
    human: impl FnOnce() -> Result<()>,
) -> Result<()> {
    if json_output {
        print_json(&json!({
            "status": "ok",
            "data": data,
            "meta": { "duration_ms": start.elapsed().as_millis() }
        }))
    } else {
        human()
    }
}

fn print_json(val: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// A JSON array (or a single object) of canonical records or CSL-JSON items.
fn read_records(path: &Path, csl: bool) -> Result<Vec<CanonicalRecord>> {
    let items = match read_json::<Value>(path)? {
        Value::Array(items) => items,
        single => vec![single],
    };

    let adapter = CslJsonAdapter::default();
    items
        .iter()
        .map(|item| {
            if csl {
                Ok(adapter.to_record(item)?)
            } else {
                Ok(serde_json::from_value(item.clone())?)
            }
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("reading records from {}", path.display()))
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ScienceError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<BibmeldError>() {
            return e.exit_code();
        }
        if cause.is::<serde_json::Error>() {
            return ExitCode::InvalidArgs;
        }
        if let Some(e) = cause.downcast_ref::<std::io::Error>() {
            return match e.kind() {
                std::io::ErrorKind::NotFound => ExitCode::NotFound,
                _ => ExitCode::FileSystemError,
            };
        }
    }
    ExitCode::GeneralError
}

fn error_kind(code: ExitCode) -> &'static str {
    match code {
        ExitCode::NotFound => "not_found",
        ExitCode::InvalidArgs => "invalid_args",
        ExitCode::FileSystemError => "filesystem",
        ExitCode::Conflict => "conflict",
        ExitCode::Success | ExitCode::GeneralError => "error",
    }
}

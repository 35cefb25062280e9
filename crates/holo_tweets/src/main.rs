use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use holo_table::{FjallTable, MemTable, TableStore};
use holo_tweets::config::{
    DateFallback, NumericPolicy, DEFAULT_EVENT_DATE_FORMAT, DEFAULT_HASHTAG_FILTER,
    DEFAULT_IDENTITY_VERSIONS, DEFAULT_INFLUENCER_THRESHOLD, DEFAULT_SOURCE_FILTER,
    DEFAULT_TABLE_NAME,
};
use holo_tweets::schema::{ATTR_DESCRIPTION, GROUP_IDENTITY};
use holo_tweets::{
    AnalyticsConfig, IngestConfig, IngestPipeline, JobRunner, JobSelection, SchemaManager,
    TableConfig, TweetsConfig, VersionReader,
};

/// CLI entry point wrapper.
#[derive(Parser, Debug)]
#[command(name = "holo-tweets", about = "Versioned tweet store and scan analytics")]
struct Args {
    /// Directory of the fjall keyspace.
    #[arg(long, env = "HOLO_TWEETS_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,

    #[arg(long, env = "HOLO_TWEETS_TABLE", default_value = DEFAULT_TABLE_NAME, global = true)]
    table: String,

    #[arg(long, env = "HOLO_TWEETS_ENGINE", value_enum, default_value_t = EngineKind::Fjall, global = true)]
    engine: EngineKind,

    /// Versions kept per identity cell when the table is created.
    #[arg(
        long,
        env = "HOLO_TWEETS_IDENTITY_VERSIONS",
        default_value_t = DEFAULT_IDENTITY_VERSIONS,
        global = true
    )]
    identity_versions: u32,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    /// Persistent keyspace under `--data-dir`.
    Fjall,
    /// Process-local; nothing survives the run.
    Memory,
}

/// Top-level CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Ensure the table exists and print its layout.
    Schema,
    /// Load tweets from a CSV file.
    Ingest(IngestArgs),
    /// Read or append cell versions.
    Versions {
        #[command(subcommand)]
        cmd: VersionsCommand,
    },
    /// Run analytic jobs and write their reports.
    Analyze(AnalyzeArgs),
}

#[derive(Parser, Debug)]
struct IngestArgs {
    #[arg(long, env = "HOLO_TWEETS_INPUT")]
    input: PathBuf,

    /// Accepted event date layouts, tried in order.
    #[arg(long = "date-format", default_value = DEFAULT_EVENT_DATE_FORMAT)]
    date_formats: Vec<String>,

    #[arg(long, value_enum, default_value_t = DateFallback::NameOnly)]
    date_fallback: DateFallback,

    #[arg(long, value_enum, default_value_t = NumericPolicy::Zero)]
    numeric_policy: NumericPolicy,

    /// Write this value for empty fields instead of skipping them.
    #[arg(long)]
    empty_marker: Option<String>,
}

#[derive(Subcommand, Debug)]
enum VersionsCommand {
    /// Print the most recent versions of one cell.
    Get(VersionsGetArgs),
    /// Append descriptions as successive versions, then read them back.
    Record(VersionsRecordArgs),
}

#[derive(Parser, Debug)]
struct VersionsGetArgs {
    #[arg(long)]
    row_key: String,

    #[arg(long, default_value = GROUP_IDENTITY)]
    group: String,

    #[arg(long, default_value = ATTR_DESCRIPTION)]
    attribute: String,

    #[arg(long, default_value_t = 3)]
    max: usize,
}

#[derive(Parser, Debug)]
struct VersionsRecordArgs {
    #[arg(long)]
    row_key: String,

    #[arg(long = "description", required = true)]
    descriptions: Vec<String>,
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Job name, or `all`.
    #[arg(default_value = "all")]
    jobs: JobSelection,

    #[arg(long, env = "HOLO_TWEETS_OUTPUT_DIR", default_value = "reports")]
    output_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_INFLUENCER_THRESHOLD)]
    influencer_threshold: u64,

    #[arg(long, default_value = DEFAULT_HASHTAG_FILTER)]
    hashtag: String,

    #[arg(long, default_value = DEFAULT_SOURCE_FILTER)]
    source: String,

    /// Layout of the account creation column.
    #[arg(long, default_value = DEFAULT_EVENT_DATE_FORMAT)]
    created_format: String,
}

/// The opened engine.
enum Store {
    Fjall(FjallTable),
    Memory(MemTable),
}

impl Store {
    fn open(kind: EngineKind, data_dir: &Path) -> anyhow::Result<Self> {
        Ok(match kind {
            EngineKind::Fjall => Store::Fjall(
                FjallTable::open(data_dir)
                    .with_context(|| format!("open keyspace {}", data_dir.display()))?,
            ),
            EngineKind::Memory => Store::Memory(MemTable::new()),
        })
    }

    fn table(&self) -> &dyn TableStore {
        match self {
            Store::Fjall(store) => store,
            Store::Memory(store) => store,
        }
    }

    fn persist(&self) -> anyhow::Result<()> {
        if let Store::Fjall(store) = self {
            store.persist().context("persist keyspace")?;
        }
        Ok(())
    }
}

/// Parse CLI args, initialize logging, and run the requested subcommand.
fn main() -> anyhow::Result<()> {
    // Enable ANSI colors only when stdout is a terminal and NO_COLOR is unset.
    let ansi = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    tracing_subscriber::fmt()
        .with_ansi(ansi)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let store = Store::open(args.engine, &args.data_dir)?;
    let config = args.config();

    match args.cmd {
        Command::Schema => run_schema(&store, &config.table),
        Command::Ingest(ingest) => run_ingest(&store, config, &ingest.input),
        Command::Versions { cmd } => run_versions(&store, &config.table, cmd),
        Command::Analyze(analyze) => run_analyze(&store, &config, analyze.jobs),
    }
}

impl Args {
    /// Flags of the global options and the chosen subcommand; components the
    /// subcommand does not configure keep their defaults.
    fn config(&self) -> TweetsConfig {
        let mut config = TweetsConfig {
            table: TableConfig {
                table_name: self.table.clone(),
                identity_versions: self.identity_versions,
            },
            ..TweetsConfig::default()
        };
        match &self.cmd {
            Command::Ingest(args) => {
                config.ingest = IngestConfig {
                    date_formats: args.date_formats.clone(),
                    date_fallback: args.date_fallback,
                    numeric_policy: args.numeric_policy,
                    empty_marker: args.empty_marker.clone(),
                };
            }
            Command::Analyze(args) => {
                config.analytics = AnalyticsConfig {
                    influencer_threshold: args.influencer_threshold,
                    hashtag_filter: args.hashtag.clone(),
                    source_filter: args.source.clone(),
                    created_format: args.created_format.clone(),
                    output_dir: args.output_dir.clone(),
                };
            }
            Command::Schema | Command::Versions { .. } => {}
        }
        config
    }
}

fn run_schema(store: &Store, table: &TableConfig) -> anyhow::Result<()> {
    let outcome = SchemaManager::new(store.table())
        .ensure(&table.table_name, &table.groups())
        .with_context(|| format!("ensure table {}", table.table_name))?;
    store.persist()?;
    println!(
        "table {} ({})",
        outcome.descriptor.name,
        if outcome.created { "created" } else { "exists" }
    );
    for group in &outcome.descriptor.groups {
        println!("  {}: max_versions={}", group.name, group.max_versions);
    }
    Ok(())
}

fn run_ingest(store: &Store, config: TweetsConfig, input: &Path) -> anyhow::Result<()> {
    let result = IngestPipeline::new(store.table(), config.table, config.ingest).ingest_path(input);
    // Whatever was written before a read failure stays written.
    store.persist()?;
    let summary = result.with_context(|| format!("ingest {}", input.display()))?;
    println!("{summary}");
    Ok(())
}

fn run_versions(store: &Store, table: &TableConfig, cmd: VersionsCommand) -> anyhow::Result<()> {
    let reader = VersionReader::new(store.table(), &table.table_name);

    let versions = match cmd {
        VersionsCommand::Get(args) => {
            // Reads never create the table; an absent table has no versions.
            let exists = store
                .table()
                .describe_table(&table.table_name)
                .with_context(|| format!("describe table {}", table.table_name))?
                .is_some();
            if exists {
                reader
                    .get_versions(&args.row_key, &args.group, &args.attribute, args.max)
                    .with_context(|| format!("read versions of {}", args.row_key))?
            } else {
                Vec::new()
            }
        }
        VersionsCommand::Record(args) => {
            SchemaManager::new(store.table())
                .ensure(&table.table_name, &table.groups())
                .with_context(|| format!("ensure table {}", table.table_name))?;
            reader
                .append_versions(&args.row_key, GROUP_IDENTITY, ATTR_DESCRIPTION, &args.descriptions)
                .with_context(|| format!("append versions to {}", args.row_key))?;
            store.persist()?;
            reader
                .get_versions(&args.row_key, GROUP_IDENTITY, ATTR_DESCRIPTION, args.descriptions.len())
                .with_context(|| format!("read versions of {}", args.row_key))?
        }
    };

    if versions.is_empty() {
        println!("no versions");
    }
    for version in versions {
        println!("{}: {}", version.timestamp, version.value);
    }
    Ok(())
}

fn run_analyze(store: &Store, config: &TweetsConfig, jobs: JobSelection) -> anyhow::Result<()> {
    let runner = JobRunner::new(store.table(), &config.table.table_name, &config.analytics);
    // One reference date for every job of this run, in the local time zone.
    let today = chrono::Local::now().date_naive();

    let mut failed = Vec::new();
    for job in jobs.0 {
        match runner.run(job, today) {
            Ok(report) => println!("{job}: {} lines -> {}", report.lines, report.path.display()),
            Err(err) => {
                tracing::error!(job = %job, error = ?err, "job failed");
                failed.push(job.to_string());
            }
        }
    }
    if !failed.is_empty() {
        anyhow::bail!("jobs failed: {}", failed.join(", "));
    }
    Ok(())
}

mod loader;
mod reports;
mod store;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use dexhelper_core::{
    CaughtSort, CollectionEntry, DexEngine, DexQuery, GameClock, PeriodWatcher, RarityFilter,
    Region, SpotOptions, SpotQuery, SpotSort,
};
use loader::DirLoader;
use reports::{ActionReport, ClockReport};
use store::FileProfileStore;

type Engine = DexEngine<DirLoader, FileProfileStore>;

#[derive(Debug, Parser)]
#[command(name = "dexhelper", version)]
#[command(about = "Best catching spots, capture strategies and collection tracking")]
struct Args {
    /// Directory holding monsters.json, dex.json, catch_rates.json and config.json
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Profile file to read and write
    #[arg(long, global = true, default_value = "dexhelper-profiles.json")]
    profiles: PathBuf,

    /// Switch to this profile before running the command
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Output report format
    #[arg(long, global = true, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    /// Override the number of options kept per strategy ranking
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the simulated time, period and season
    Clock,
    /// Rank the locations worth visiting right now
    Spots(SpotArgs),
    /// Cheapest and fastest ways to catch a species at its live encounters
    Strategy {
        species: String,
        /// Only show the cost ranking
        #[arg(long)]
        cheapest: bool,
    },
    /// Show the staged evolution line of a species
    Line { species: String },
    /// Evolution advisories for a species' line
    Notes { species: String },
    /// Browse the dex with filters
    Dex(DexArgs),
    /// Collection progress for the active profile
    Summary,
    /// Mark a species caught
    Catch { species: String },
    /// Mark a species not caught
    Uncatch { species: String },
    /// Mark every uncaught member of a species' line caught
    CatchLine { species: String },
    /// Mark a species caught and note it against the rest of its line
    NoteLine { species: String },
    /// Clear every catch and note in the active profile
    Reset,
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Merge an exported status map into the active profile
    Import { file: PathBuf },
    /// Write the active profile's status map to a file
    Export { file: PathBuf },
    /// Merge a list of `{name, timestamp}` catch records
    Record { file: PathBuf },
    /// Re-render the clock and spots whenever the period changes
    Watch {
        /// Seconds between clock samples
        #[arg(long, default_value_t = 60)]
        interval: u64,
        /// Stop after this many samples
        #[arg(long)]
        ticks: Option<usize>,
        #[command(flatten)]
        spots: SpotArgs,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct SpotArgs {
    /// Primary ranking key: lines, catchable or dex
    #[arg(long, default_value = "lines")]
    sort: SpotSort,
    /// Rank locations with time-restricted species first
    #[arg(long)]
    prioritize_time: bool,
    /// Leave out Safari Zone style preserves
    #[arg(long)]
    exclude_preserve: bool,
    /// Keep locations whose name contains this text
    #[arg(long)]
    location: Option<String>,
    /// Keep locations where a listed species' name contains this text
    #[arg(long)]
    species: Option<String>,
    /// Only these regions (repeatable)
    #[arg(long = "region")]
    regions: Vec<Region>,
    /// Regional dex used to order species inside a location
    #[arg(long)]
    dex_region: Option<Region>,
    /// Leave rarity and method tallies out
    #[arg(long)]
    hide_tallies: bool,
    /// Show at most this many locations
    #[arg(long)]
    limit: Option<usize>,
}

impl SpotArgs {
    fn query(&self) -> Result<SpotQuery> {
        Ok(SpotQuery::new(SpotOptions {
            location: self.location.clone(),
            species: self.species.clone(),
            regions: self.regions.clone(),
            exclude_preserve: self.exclude_preserve,
            prioritize_time: self.prioritize_time,
            sort: self.sort,
            hide_tallies: self.hide_tallies,
            dex_region: self.dex_region,
        })?)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaughtOrder {
    /// Oldest catches first
    Asc,
    /// Newest catches first
    Desc,
}

#[derive(Debug, Clone, clap::Args)]
struct DexArgs {
    /// Name, national number or regional number
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    region: Option<Region>,
    /// A rarity tier, or legends, dex-required, pheno
    #[arg(long)]
    rarity: Option<RarityFilter>,
    /// Encounter method, e.g. Grass or "Super Rod"
    #[arg(long)]
    method: Option<String>,
    #[arg(long)]
    caught: Option<bool>,
    #[arg(long)]
    can_be_caught: Option<bool>,
    /// Only species caught on this UTC date (YYYY-MM-DD)
    #[arg(long)]
    caught_on: Option<NaiveDate>,
    #[arg(long, value_enum)]
    sort_caught: Option<CaughtOrder>,
}

impl From<&DexArgs> for DexQuery {
    fn from(args: &DexArgs) -> Self {
        Self {
            search: args.search.clone(),
            region: args.region,
            rarity: args.rarity,
            method: args.method.clone(),
            caught: args.caught,
            can_be_caught: args.can_be_caught,
            caught_on: args.caught_on,
            caught_sort: match args.sort_caught {
                None => CaughtSort::None,
                Some(CaughtOrder::Asc) => CaughtSort::Ascending,
                Some(CaughtOrder::Desc) => CaughtSort::Descending,
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum ProfileCommand {
    /// List profiles; the active one is starred
    List,
    /// Create a profile and make it active
    Create { name: String },
    Delete { name: String },
    Switch { name: String },
}

#[derive(Debug, Deserialize)]
struct CatchRecord {
    name: String,
    timestamp: DateTime<Utc>,
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(writer) => writer,
            Self::File(writer) => writer,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        self.writer().flush()
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    println!("{}", "🎮 Dexhelper".bright_cyan().bold());
    println!("{}", "============".cyan());
}

async fn run(args: Args) -> Result<()> {
    let store = FileProfileStore::open(&args.profiles)?;
    if let Some(name) = &args.profile {
        store.manage(|book| book.switch(name))?;
    }

    let mut out = OutputTarget::new(args.output.clone())?;
    if args.report == "console" && args.output.is_none() {
        announce_banner();
    }

    let loader = DirLoader::new(&args.data_dir).with_top_k(args.top_k);
    let engine = DexEngine::new(loader, store)
        .with_context(|| format!("failed to open data directory {}", args.data_dir.display()))?;
    log::debug!(
        "loaded {} species from {}",
        engine.data().species().len(),
        args.data_dir.display()
    );

    execute(&engine, &args, &mut out).await?;
    out.flush_inner()?;
    Ok(())
}

fn manage_profiles(
    store: &FileProfileStore,
    command: &ProfileCommand,
    report: &str,
    out: &mut impl Write,
) -> Result<()> {
    let (action, name) = match command {
        ProfileCommand::List => {
            let book = store.snapshot();
            let names: Vec<String> = book.names().map(str::to_string).collect();
            return reports::profiles(out, report, book.active(), &names);
        }
        ProfileCommand::Create { name } => {
            store.manage(|book| book.create(name))?;
            ("created profile", name)
        }
        ProfileCommand::Delete { name } => {
            store.manage(|book| book.delete(name))?;
            ("deleted profile", name)
        }
        ProfileCommand::Switch { name } => {
            store.manage(|book| book.switch(name))?;
            ("switched to profile", name)
        }
    };
    reports::action(
        out,
        report,
        &ActionReport {
            action,
            species: vec![name.clone()],
        },
    )
}

async fn execute(engine: &Engine, args: &Args, out: &mut OutputTarget) -> Result<()> {
    let report = args.report.as_str();
    let now = Utc::now();
    match &args.command {
        Command::Clock => reports::clock(out, report, &clock_report(engine, now)),
        Command::Spots(spot_args) => render_spots(engine, spot_args, report, now, out),
        Command::Strategy { species, cheapest } => {
            let strategies = engine.strategies_for(species, now)?;
            reports::strategies(out, report, &strategies, *cheapest)
        }
        Command::Line { species } => reports::line(out, report, &engine.line(species)?),
        Command::Notes { species } => reports::notes(out, report, &engine.notes_for(species)?),
        Command::Dex(dex_args) => reports::dex(out, report, &engine.dex(&dex_args.into())?),
        Command::Summary => reports::summary(out, report, &engine.load_status()?.summary(now)),
        Command::Catch { species } => {
            let id = engine.find_species(species)?.id;
            engine.update_status(|status, _| status.mark_caught(id, now))?;
            action_for(engine, out, report, "caught", &[id])
        }
        Command::Uncatch { species } => {
            let id = engine.find_species(species)?.id;
            engine.update_status(|status, _| status.mark_uncaught(id))?;
            action_for(engine, out, report, "released", &[id])
        }
        Command::CatchLine { species } => {
            let id = engine.find_species(species)?.id;
            let caught = engine.update_status(|status, resolver| {
                status.catch_line(id, resolver, now)
            })?;
            reports::action(
                out,
                report,
                &ActionReport {
                    action: "caught",
                    species: caught,
                },
            )
        }
        Command::NoteLine { species } => {
            let id = engine.find_species(species)?.id;
            let noted = engine.update_status(|status, resolver| {
                status.note_line(id, resolver, now)
            })?;
            reports::action(
                out,
                report,
                &ActionReport {
                    action: "noted",
                    species: noted,
                },
            )
        }
        Command::Reset => {
            engine.update_status(|status, _| {
                status.reset();
                Ok(())
            })?;
            reports::action(
                out,
                report,
                &ActionReport {
                    action: "reset",
                    species: Vec::new(),
                },
            )
        }
        Command::Profile(command) => manage_profiles(engine.store(), command, report, out),
        Command::Import { file } => {
            let entries: BTreeMap<String, CollectionEntry> = read_json(file)?;
            let outcome = engine.update_status(|status, _| Ok(status.import(entries)))?;
            reports::imported(out, report, outcome)
        }
        Command::Export { file } => {
            let status = engine.load_status()?;
            let json = serde_json::to_string_pretty(&status)?;
            fs::write(file, json).with_context(|| format!("failed to write {}", file.display()))?;
            reports::action(
                out,
                report,
                &ActionReport {
                    action: "exported",
                    species: vec![file.display().to_string()],
                },
            )
        }
        Command::Record { file } => {
            let records: Vec<CatchRecord> = read_json(file)?;
            let catches: Vec<(String, DateTime<Utc>)> = records
                .into_iter()
                .map(|record| (record.name, record.timestamp))
                .collect();
            let updated =
                engine.update_status(|status, _| Ok(status.apply_catches(engine.data(), &catches)))?;
            log::info!("{updated} of {} catch records applied", catches.len());
            reports::action(
                out,
                report,
                &ActionReport {
                    action: "recorded",
                    species: catches.into_iter().map(|(name, _)| name).collect(),
                },
            )
        }
        Command::Watch {
            interval,
            ticks,
            spots,
        } => watch(engine, spots, report, *interval, *ticks, out).await,
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn action_for(
    engine: &Engine,
    out: &mut impl Write,
    report: &str,
    action: &'static str,
    ids: &[u32],
) -> Result<()> {
    let species = ids
        .iter()
        .filter_map(|id| engine.data().species_by_id(*id))
        .map(|species| species.name.clone())
        .collect();
    reports::action(out, report, &ActionReport { action, species })
}

fn clock_report(engine: &Engine, now: DateTime<Utc>) -> ClockReport {
    let reading = engine.clock_reading(now);
    let next = GameClock::time_until_next_period(now);
    ClockReport {
        time: reading.to_string(),
        period: reading.period.to_string(),
        season: reading.season.to_string(),
        next_period: next.period.to_string(),
        next_in_seconds: next.wait.num_seconds(),
        countdown: next.to_string(),
    }
}

fn render_spots(
    engine: &Engine,
    spot_args: &SpotArgs,
    report: &str,
    now: DateTime<Utc>,
    out: &mut impl Write,
) -> Result<()> {
    let mut spots = engine.best_spots(now, &spot_args.query()?)?;
    if let Some(limit) = spot_args.limit {
        spots.truncate(limit);
    }
    reports::spots(out, report, &spots)
}

async fn watch(
    engine: &Engine,
    spot_args: &SpotArgs,
    report: &str,
    interval: u64,
    ticks: Option<usize>,
    out: &mut OutputTarget,
) -> Result<()> {
    let mut watcher = PeriodWatcher::new();
    let mut timer = tokio::time::interval(Duration::from_secs(interval.max(1)));
    let mut samples = 0;
    loop {
        timer.tick().await;
        let now = Utc::now();
        let changed = watcher.observe(engine.clock_reading(now).period);
        if samples == 0 || changed {
            reports::clock(out, report, &clock_report(engine, now))?;
            render_spots(engine, spot_args, report, now, out)?;
            out.flush_inner()?;
        }
        samples += 1;
        if ticks.is_some_and(|limit| samples >= limit) {
            return Ok(());
        }
    }
}

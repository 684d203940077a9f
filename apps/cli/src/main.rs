use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use console::style;
use env_logger::Builder;
use log::LevelFilter;
use plotline_core::{
    Analyst, Archetype, ArchetypeCatalogue, BatchOptions, BatchProgress, CollectionSession,
    DEFAULT_SYSTEM_INSTRUCTION, ExportRow, KeyPool, ListKind, PlotlineError, Provider, Settings,
    TranscriptExtractor, UploadPattern, YoutubeClient, YtDlp, channel_prompt, channel_scripts,
    clean_stale_subtitles, collect_batch, compare_prompt,
    daily_average_views, format_daily_views, format_listing, format_upload_pattern,
    get_session_path, get_subtitles_dir, list_all_uploads, records_to_markdown, resolve_channel,
    video_prompt,
};

use crate::ui::{banner, create_spinner, done, mask_key, rule};

mod ui;

const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(300);

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Gemini,
    Openai,
    Grok,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Gemini => Provider::Gemini,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CliList {
    Channel,
    Individual,
    Analysis,
}

impl From<CliList> for ListKind {
    fn from(cli: CliList) -> Self {
        match cli {
            CliList::Channel => ListKind::Channel,
            CliList::Individual => ListKind::Individual,
            CliList::Analysis => ListKind::Analysis,
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum ExportFormat {
    #[default]
    Json,
    Markdown,
}

#[derive(Parser)]
#[command(name = "plotline")]
#[command(
    about = "Collect YouTube transcripts, comments and metadata across rotating API keys, then analyze them with an LLM"
)]
struct Cli {
    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage stored YouTube Data API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Collect videos into the session
    Collect {
        #[command(subcommand)]
        source: CollectSource,
    },
    /// Show collected records
    List {
        #[arg(value_enum)]
        list: Option<CliList>,
    },
    /// Delete records by their position in `plotline list`
    Delete {
        #[arg(value_enum)]
        list: CliList,
        #[arg(required = true)]
        positions: Vec<usize>,
    },
    /// Move records to the analysis list
    Move {
        #[arg(value_enum)]
        list: CliList,
        #[arg(required = true)]
        positions: Vec<usize>,
    },
    /// Empty one list, or both collection lists when none is given
    Clear {
        #[arg(value_enum)]
        list: Option<CliList>,
    },
    /// Export records as JSON or Markdown
    Export {
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only this list (default: channel and individual lists)
        #[arg(long, value_enum)]
        list: Option<CliList>,
    },
    /// Daily average views of the analysis list, per channel
    Stats,
    /// Weekday and hour-of-day upload pattern of a channel (KST)
    UploadTimes {
        /// Channel URL, @handle or name
        channel: String,
    },
    /// Manage the narrative archetypes filled in for {archetypes_table}
    Archetypes {
        #[command(subcommand)]
        action: ArchetypesAction,
    },
    /// Send a record, a channel's scripts or two scripts to compare to an LLM
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .args(["record", "channel", "compare"])
    ))]
    Analyze {
        /// Prompt template with {title}, {script}, {description}, {comments},
        /// {channel_name}, {all_scripts}, {foreign_script}, {korean_script}
        /// or {archetypes_table} placeholders
        #[arg(long)]
        template: PathBuf,
        /// Position of the record in the chosen list
        #[arg(long)]
        record: Option<usize>,
        /// Analyze every usable script of this channel
        #[arg(long)]
        channel: Option<String>,
        /// Compare an original script file with its adaptation
        #[arg(long, num_args = 2, value_names = ["ORIGINAL", "ADAPTED"])]
        compare: Option<Vec<PathBuf>>,
        #[arg(long, value_enum, default_value = "channel")]
        list: CliList,
        /// AI provider for the analysis
        #[arg(short, long, default_value = "gemini")]
        provider: CliProvider,
        /// System instruction sent ahead of the prompt
        #[arg(long)]
        system: Option<String>,
    },
}

#[derive(Subcommand)]
enum KeysAction {
    List,
    Add { key: String },
    /// Remove the key at this position (1-based)
    Remove { position: usize },
    Clear,
}

#[derive(Subcommand)]
enum ArchetypesAction {
    List,
    Add {
        /// 기: the hook that opens the story
        #[arg(long)]
        setup: String,
        /// 승: how it develops
        #[arg(long)]
        development: String,
        /// 전: the turn that raises tension
        #[arg(long)]
        turn: String,
        /// 결: the ending or takeaway
        #[arg(long)]
        conclusion: String,
        #[arg(long, default_value = "")]
        traits: String,
    },
    /// Remove the archetype with this number
    Remove { number: usize },
    /// Replace the catalogue with the starter archetype
    Reset,
}

#[derive(Subcommand)]
enum CollectSource {
    /// Recent uploads of channels given by URL, @handle or name
    Channels {
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Videos per channel
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
        #[arg(long, default_value_t = 0)]
        min_views: u64,
        #[command(flatten)]
        common: CollectArgs,
    },
    /// Individual videos by URL
    Videos {
        #[arg(required = true)]
        urls: Vec<String>,
        #[command(flatten)]
        common: CollectArgs,
    },
}

#[derive(Args)]
struct CollectArgs {
    /// Top comments per video
    #[arg(short = 'c', long, default_value_t = 20)]
    comments: u32,
    /// Prefix transcripts with a running number
    #[arg(long)]
    number_scripts: bool,
    /// Prefix comments with "<video>.<comment>" numbers
    #[arg(long)]
    number_comments: bool,
    /// Subtitle language (default: PLOTLINE_SUB_LANG or "ko")
    #[arg(long)]
    lang: Option<String>,
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli.command).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        if let Some(err) = e.downcast_ref::<PlotlineError>() {
            eprintln!("{} {}", style("Hint:").yellow().bold(), err.hint());
        }
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<()> {
    let settings = Settings::from_env()?;
    let session_path = get_session_path(&settings.cache_dir);

    match command {
        Command::Keys { action } => keys(&settings, action).await,
        Command::Collect { source } => collect(&settings, &session_path, source).await,
        Command::List { list } => {
            let session = CollectionSession::load(&session_path).await?;
            let kinds: Vec<ListKind> = match list {
                Some(list) => vec![list.into()],
                None => vec![ListKind::Channel, ListKind::Individual, ListKind::Analysis],
            };
            for kind in kinds {
                let records = session.list(kind);
                println!(
                    "{} {}",
                    style(format!("{kind} list")).cyan().bold(),
                    style(format!("({} records)", records.len())).dim()
                );
                print!("{}", format_listing(records));
                println!();
            }
            Ok(())
        }
        Command::Delete { list, positions } => {
            let mut session = CollectionSession::load(&session_path).await?;
            let removed = session.delete(list.into(), &to_indices(&positions));
            session.save(&session_path).await?;
            println!(
                "{} Deleted {} record(s)",
                style("✓").green().bold(),
                removed.len()
            );
            Ok(())
        }
        Command::Move { list, positions } => {
            let mut session = CollectionSession::load(&session_path).await?;
            let moved = session.move_to_analysis(list.into(), &to_indices(&positions));
            session.save(&session_path).await?;
            println!(
                "{} Moved {moved} record(s) to analysis",
                style("✓").green().bold()
            );
            Ok(())
        }
        Command::Clear { list } => {
            let mut session = CollectionSession::load(&session_path).await?;
            let cleared = match list {
                Some(list) => session.clear_list(list.into()),
                None => session.clear_collected(),
            };
            session.save(&session_path).await?;
            println!("{} Cleared {cleared} record(s)", style("✓").green().bold());
            Ok(())
        }
        Command::Export {
            format,
            output,
            list,
        } => {
            let session = CollectionSession::load(&session_path).await?;
            let records: Vec<_> = match list {
                Some(list) => session.list(list.into()).iter().collect(),
                None => session.collected().collect(),
            };
            let rendered = match format {
                ExportFormat::Json => {
                    let rows: Vec<ExportRow> =
                        records.iter().map(|record| ExportRow::from(*record)).collect();
                    serde_json::to_string_pretty(&rows)?
                }
                ExportFormat::Markdown => records_to_markdown("plotline export", records.iter().copied()),
            };
            match output {
                Some(path) => {
                    tokio::fs::write(&path, rendered)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!(
                        "{} Exported {} record(s) to {}",
                        style("✓").green().bold(),
                        records.len(),
                        style(path.display()).cyan()
                    );
                }
                None => println!("{rendered}"),
            }
            Ok(())
        }
        Command::Stats => {
            let session = CollectionSession::load(&session_path).await?;
            let records = session.list(ListKind::Analysis);
            if records.is_empty() {
                bail!("The analysis list is empty. Move records there with `plotline move`");
            }
            let report = daily_average_views(records, Utc::now());
            print!("{}", format_daily_views(&report));
            Ok(())
        }
        Command::UploadTimes { channel } => upload_times(&settings, &channel).await,
        Command::Archetypes { action } => archetypes(&settings, action).await,
        Command::Analyze {
            template,
            record,
            channel,
            compare,
            list,
            provider,
            system,
        } => {
            let target = match (record, channel, compare) {
                (Some(position), _, _) => AnalysisTarget::Record(position),
                (None, Some(name), _) => AnalysisTarget::Channel(name),
                (None, None, Some(scripts)) => match <[PathBuf; 2]>::try_from(scripts) {
                    Ok([original, adapted]) => AnalysisTarget::Compare { original, adapted },
                    Err(_) => bail!("--compare takes two script files"),
                },
                (None, None, None) => bail!("Pass --record, --channel or --compare"),
            };
            analyze(
                &settings,
                &session_path,
                &template,
                target,
                list.into(),
                provider.into(),
                system.as_deref(),
            )
            .await
        }
    }
}

/// 1-based positions as shown by `plotline list` to 0-based indices.
fn to_indices(positions: &[usize]) -> Vec<usize> {
    positions
        .iter()
        .filter_map(|position| position.checked_sub(1))
        .collect()
}

async fn keys(settings: &Settings, action: KeysAction) -> Result<()> {
    let store = settings.key_store();
    let mut pool = store.load().await?;

    match action {
        KeysAction::List => {
            if pool.is_empty() {
                println!("No stored keys ({})", style(store.path().display()).dim());
            }
            for (i, key) in pool.keys().iter().enumerate() {
                println!("{:>3}. {}", i + 1, mask_key(key));
            }
            if !settings.env_keys.is_empty() {
                println!(
                    "{}",
                    style(format!(
                        "+ {} key(s) from PLOTLINE_YOUTUBE_KEYS",
                        settings.env_keys.len()
                    ))
                    .dim()
                );
            }
            return Ok(());
        }
        KeysAction::Add { key } => {
            if !pool.add_key(key.as_str()) {
                bail!("Key is empty or already stored");
            }
            println!("{} Added key #{}", style("✓").green().bold(), pool.len());
        }
        KeysAction::Remove { position } => {
            let removed = position
                .checked_sub(1)
                .and_then(|index| pool.remove_key(index))
                .with_context(|| format!("No key at position {position}"))?;
            println!(
                "{} Removed {}",
                style("✓").green().bold(),
                mask_key(&removed)
            );
        }
        KeysAction::Clear => {
            let count = pool.len();
            pool.clear();
            println!("{} Removed {count} key(s)", style("✓").green().bold());
        }
    }

    store.save(&pool).await?;
    Ok(())
}

async fn key_pool(settings: &Settings) -> Result<KeyPool> {
    let pool = settings.key_pool().await?;
    if pool.is_empty() {
        return Err(PlotlineError::EmptyPool.into());
    }
    Ok(pool)
}

async fn collect(settings: &Settings, session_path: &Path, source: CollectSource) -> Result<()> {
    let (kind, inputs, per_channel, min_views, common) = match source {
        CollectSource::Channels {
            inputs,
            count,
            min_views,
            common,
        } => (ListKind::Channel, inputs, count, min_views, common),
        CollectSource::Videos { urls, common } => (ListKind::Individual, urls, 1, 0, common),
    };

    let mut pool = key_pool(settings).await?;
    let client = YoutubeClient::new(settings.http_timeout)?;
    let scratch = get_subtitles_dir(&settings.cache_dir);
    clean_stale_subtitles(&scratch);
    let extractor = TranscriptExtractor::new(
        YtDlp::new(&settings.ytdlp, settings.subtitle_timeout),
        scratch,
    );

    let mut session = CollectionSession::load(session_path).await?;
    let mut exclude = session.known_ids();
    let options = BatchOptions {
        videos_per_channel: per_channel,
        min_views,
        comment_limit: common.comments,
        number_scripts: common.number_scripts,
        number_comments: common.number_comments,
        language: common
            .lang
            .unwrap_or_else(|| settings.subtitle_lang.clone()),
    };

    banner("YouTube Collector");
    println!(
        "{} {} key(s), {} input(s), subtitles in {}",
        style("✓").green().bold(),
        pool.len(),
        inputs.len(),
        style(&options.language).yellow()
    );
    rule();

    let start = Instant::now();
    let spinner = create_spinner("Collecting...");
    let records = collect_batch(
        &client,
        &mut pool,
        &extractor,
        inputs.as_slice(),
        &options,
        &mut exclude,
        |event| match event {
            BatchProgress::Input {
                index,
                total,
                input,
            } => spinner.set_message(format!("[{}/{total}] {input}", index + 1)),
            BatchProgress::Video { title, .. } => {
                spinner.set_message(format!("Fetching \"{title}\"..."))
            }
        },
    )
    .await?;

    let fetched = records.len();
    let added = session.extend(kind, records);
    session.save(session_path).await?;
    spinner.finish_with_message(done(
        format!("Collected {fetched} video(s), {added} new in the {kind} list"),
        start.elapsed(),
    ));

    if added == 0 {
        println!("{}", style("Nothing new to add").dim());
    } else {
        println!("\n{}", format_listing(session.list(kind)));
    }
    Ok(())
}

async fn upload_times(settings: &Settings, channel: &str) -> Result<()> {
    let mut pool = key_pool(settings).await?;
    let client = YoutubeClient::new(settings.http_timeout)?;

    let start = Instant::now();
    let spinner = create_spinner(&format!("Listing uploads of {channel}..."));
    let channel_id = resolve_channel(&client, &mut pool, channel).await?;
    let uploads = list_all_uploads(&client, &mut pool, &channel_id).await?;
    spinner.finish_with_message(done(
        format!(
            "Found {} uploads of {}",
            uploads.entries.len(),
            uploads.channel.title
        ),
        start.elapsed(),
    ));

    let pattern =
        UploadPattern::from_timestamps(uploads.entries.iter().filter_map(|e| e.published_at));
    if pattern.total == 0 {
        bail!("No upload timestamps to analyze");
    }
    rule();
    print!("{}", format_upload_pattern(&uploads.channel.title, &pattern));
    if let (Some(day), Some(hour)) = (pattern.busiest_weekday(), pattern.busiest_hour()) {
        println!(
            "\n{} {day}, {hour:02}h KST",
            style("Most uploads:").dim()
        );
    }
    Ok(())
}

async fn archetypes(settings: &Settings, action: ArchetypesAction) -> Result<()> {
    let store = settings.archetype_store();
    let mut catalogue = store.load().await?;

    match action {
        ArchetypesAction::List => {
            if catalogue.is_empty() {
                println!("No archetypes ({})", style(store.path().display()).dim());
            } else {
                print!("{}", catalogue.to_markdown_table());
            }
            return Ok(());
        }
        ArchetypesAction::Add {
            setup,
            development,
            turn,
            conclusion,
            traits,
        } => {
            let number =
                catalogue.add(Archetype::new(setup, development, turn, conclusion, traits));
            println!("{} Added archetype #{number}", style("✓").green().bold());
        }
        ArchetypesAction::Remove { number } => {
            let removed = catalogue
                .remove(number)
                .with_context(|| format!("No archetype numbered {number}"))?;
            println!(
                "{} Removed \"{}\"",
                style("✓").green().bold(),
                removed.setup
            );
        }
        ArchetypesAction::Reset => {
            catalogue = ArchetypeCatalogue::default();
            println!("{} Restored the starter archetype", style("✓").green().bold());
        }
    }

    store.save(&catalogue).await?;
    Ok(())
}

enum AnalysisTarget {
    Record(usize),
    Channel(String),
    Compare { original: PathBuf, adapted: PathBuf },
}

async fn read_text(path: &Path, what: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {what} {}", path.display()))
}

async fn analyze(
    settings: &Settings,
    session_path: &Path,
    template_path: &Path,
    target: AnalysisTarget,
    list: ListKind,
    provider: Provider,
    system: Option<&str>,
) -> Result<()> {
    let template = read_text(template_path, "template").await?;
    let archetypes = settings.archetype_store().load().await?;

    let (label, prompt) = match target {
        AnalysisTarget::Record(position) => {
            let session = CollectionSession::load(session_path).await?;
            let record = position
                .checked_sub(1)
                .and_then(|index| session.list(list).get(index))
                .with_context(|| format!("No record at position {position} in the {list} list"))?;
            (record.title.clone(), video_prompt(&template, record, &archetypes))
        }
        AnalysisTarget::Channel(name) => {
            let session = CollectionSession::load(session_path).await?;
            let scripts = channel_scripts(session.list(list), &name);
            if scripts.is_empty() {
                bail!("No usable scripts for '{name}' in the {list} list");
            }
            let prompt = channel_prompt(&template, &name, &scripts, &archetypes);
            (name, prompt)
        }
        AnalysisTarget::Compare { original, adapted } => {
            let original_script = read_text(&original, "script").await?;
            let adapted_script = read_text(&adapted, "script").await?;
            if original_script.trim().is_empty() || adapted_script.trim().is_empty() {
                bail!("Both scripts must have content to compare");
            }
            let prompt = compare_prompt(&template, &original_script, &adapted_script, &archetypes);
            ("script comparison".to_string(), prompt)
        }
    };

    let analyst = Analyst::new(provider, ANALYSIS_TIMEOUT)?;
    let start = Instant::now();
    let spinner = create_spinner(&format!(
        "Analyzing '{label}' with {}...",
        provider.name()
    ));
    let reply = analyst
        .analyze(Some(system.unwrap_or(DEFAULT_SYSTEM_INSTRUCTION)), &prompt)
        .await?;
    spinner.finish_with_message(done(
        format!("Analysis of '{label}' ({})", analyst.provider().name()),
        start.elapsed(),
    ));

    rule();
    println!("{reply}");
    Ok(())
}

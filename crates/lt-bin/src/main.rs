//! linetrack entrypoint.
use anyhow::{Context, Result};
use clap::Parser;
use core_events::{EVENTS_DELIVERED, EVENTS_PUBLISHED, SUBSCRIBERS_PRUNED};
use linetrack::{Session, Transaction, parse_transcript};
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "linetrack",
    version,
    about = "Track per-line changes of a document against its saved baseline"
)]
struct Args {
    /// Original (saved) document.
    pub original: PathBuf,
    /// JSON transcript of edit transactions to replay against the original.
    #[arg(long = "edits")]
    pub edits: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `linetrack.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Include the structural self-test in the report.
    #[arg(long = "self-test")]
    pub self_test: bool,
    /// Print original and current text for an external diff tool.
    #[arg(long = "emit-text")]
    pub emit_text: bool,
}

#[derive(Default)]
struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("linetrack.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "linetrack.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .with_ansi(false)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn load_transcript(path: Option<&Path>) -> Result<Vec<Transaction>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading transcript {}", path.display()))?;
    parse_transcript(&json)
}

fn run(args: &Args) -> Result<()> {
    let config = core_config::load_from(args.config.clone())?;
    let content = std::fs::read_to_string(&args.original)
        .with_context(|| format!("reading {}", args.original.display()))?;
    tracing::debug!(target: "io", file = %args.original.display(), size_bytes = content.len(), "file_read_ok");
    let transcript = load_transcript(args.edits.as_deref())?;

    let key = args.original.display().to_string();
    let mut session = Session::open(&key, &content, &config)?;
    for (i, edits) in transcript.iter().enumerate() {
        if let Err(e) = session.apply(edits) {
            error!(target: "runtime", transaction = i + 1, error = %e, "transaction_failed");
            return Err(e);
        }
    }

    let report = session.report(args.self_test || config.self_test())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }
    if args.emit_text {
        let (original, current) = session.diff_texts()?;
        println!("--- original");
        println!("{original}");
        println!("+++ current");
        println!("{current}");
    }

    let registry_events = session.drain_registry_events().len();
    session.close()?;
    info!(
        target: "runtime",
        transactions = transcript.len(),
        registry_events,
        events_published = EVENTS_PUBLISHED.load(Ordering::Relaxed),
        events_delivered = EVENTS_DELIVERED.load(Ordering::Relaxed),
        subscribers_pruned = SUBSCRIBERS_PRUNED.load(Ordering::Relaxed),
        "shutdown"
    );
    Ok(())
}

fn main() -> Result<()> {
    let mut startup = AppStartup::default();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    run(&args)
}

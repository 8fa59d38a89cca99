//! `cardflip` binary.
//!
//! Drives a scripted editing session against the in-memory store:
//! - types into the regular card and lets autosave settle
//! - switches to the solution card, edits it, and switches back
//! - closes the session and prints what reached storage

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cardflip_model::{CardMode, ProblemId};
use cardflip_session::{CardSession, SessionConfig, TracingObserver};
use cardflip_store::{MemoryCardStore, StoreWrite};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "cardflip")]
#[command(about = "Dual-mode card editor controller")]
struct Args {
	/// Session configuration file (TOML)
	#[arg(short, long, value_name = "PATH", global = true)]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run a scripted editing session and print the resulting writes
	Demo {
		/// Language of the seeded regular card
		#[arg(long, default_value = "python")]
		language: String,

		/// Simulated storage latency per call
		#[arg(long, value_name = "MS", default_value_t = 0)]
		latency_ms: u64,

		/// Make every storage write fail
		#[arg(long)]
		fail_writes: bool,
	},
	/// Print the effective configuration
	Config,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config = match &args.config {
		Some(path) => SessionConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => SessionConfig::default(),
	};

	match args.command {
		Command::Config => {
			print!("{}", toml::to_string_pretty(&config).context("serializing configuration")?);
			Ok(())
		}
		Command::Demo {
			language,
			latency_ms,
			fail_writes,
		} => run_demo(config, &language, Duration::from_millis(latency_ms), fail_writes).await,
	}
}

async fn run_demo(config: SessionConfig, language: &str, latency: Duration, fail_writes: bool) -> anyhow::Result<()> {
	let store = Arc::new(MemoryCardStore::new().with_solution_language(language));
	store.set_latency(latency);
	let problem = ProblemId::from("two-sum");
	let regular = store.insert_regular(&problem, "def two_sum(nums, target):\n", language);
	if fail_writes {
		store.fail_writes(Some("writes disabled by --fail-writes"));
	}

	let autosave_wait = config.regular_autosave_delay().max(config.solution_autosave_delay()) + Duration::from_millis(50);
	let session = CardSession::open(problem, regular.clone(), store.clone(), config, Arc::new(TracingObserver));
	info!(card_id = %regular.id, "demo.start");

	session.update_code("def two_sum(nums, target):\n    seen = {}\n", language);
	session.update_notes("hash map of complements");
	tokio::time::sleep(autosave_wait).await;

	match session.toggle().await {
		Ok(mode) => println!("switched to {mode} mode"),
		Err(err) => println!("toggle failed: {err}"),
	}
	if session.current_mode() == CardMode::Answer {
		session.update_code("def two_sum(nums, target):\n    seen = {}\n    for i, n in enumerate(nums):\n        ...\n", language);
		session.exit_solution().await.context("returning to the regular card")?;
		println!("switched to {} mode", session.current_mode());
	}

	let report = session.close().await;
	if let Some(error) = report.first_error() {
		println!("final flush failed: {error}");
	}

	for write in store.writes() {
		match write {
			StoreWrite::Code { card_id, code, language } => {
				println!("code  -> {card_id} [{language}] {} line(s)", code.lines().count());
			}
			StoreWrite::Notes { card_id, notes } => println!("notes -> {card_id} {notes:?}"),
		}
	}
	for channel in cardflip_model::SaveChannel::ALL {
		if let Some(error) = session.last_save_error(channel) {
			println!("{} channel error: {error}", channel.as_str());
		}
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("CARDFLIP_LOG").unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("cardflip=debug,info")
		} else {
			EnvFilter::new("warn")
		}
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use traffic_monitor::config::{AmqpConfig, ENV_AMQP_URL, ENV_JOURNAL_DIR};
use traffic_monitor::monitoring::traffic_monitoring_system::run_cli;
use traffic_monitor::monitoring::Journal;

/// Admin CLI over the traffic monitor's CSV journals.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the journals.
    #[arg(long, env = ENV_JOURNAL_DIR, default_value = ".")]
    journal_dir: PathBuf,

    /// Also listen for alerts on this AMQP broker and journal them.
    #[arg(long, env = ENV_AMQP_URL)]
    amqp_url: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let journal = Journal::open(&args.journal_dir)?;
    let mut amqp = AmqpConfig::default();
    if let Some(url) = args.amqp_url {
        amqp.url = url;
        amqp.enabled = true;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_cli(journal, amqp));
    // The alert listener blocks on the broker and would keep the runtime alive.
    runtime.shutdown_background();
    Ok(())
}

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use traffic_monitor::config::ENV_CONFIG;
use traffic_monitor::http::{self, Api};
use traffic_monitor::{AppConfig, AppState};

/// Traffic monitoring API server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file.
    #[arg(long, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Address to bind, overrides the configuration.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides the configuration.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for the CSV journals.
    #[arg(long)]
    journal_dir: Option<PathBuf>,

    /// Start the vehicle simulation right away.
    #[arg(long)]
    simulate: bool,
}

impl Args {
    fn apply(self, config: &mut AppConfig) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = self.journal_dir {
            config.journal.directory = Some(dir);
        }
        if self.simulate {
            config.autostart_simulation = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    let state = AppState::build(config)?;
    if state.config.autostart_simulation {
        state.traffic.start_simulation();
    }

    let api = Arc::new(Api::new(Arc::clone(&state))?);
    http::run(api).await?;

    state.shutdown().await;
    log::info!("Server stopped");
    Ok(())
}

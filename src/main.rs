use clap::Parser;
use color_eyre::Result;
use flashdeck::cache::SqliteStorage;
use flashdeck::commands::{self, Command};
use flashdeck::config::Config;
use flashdeck::sync::ConnectivityWatcher;
use flashdeck::{SupabaseClient, SyncOrchestrator};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "flashdeck")]
#[command(about = "Study flashcard sets, online or off")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/flashdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Skip the network and use the offline copy
  #[arg(long)]
  offline: bool,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _log_guard = flashdeck::logging::init()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let client = SupabaseClient::new(&config.remote.url, Config::get_access_key()?)?;

  let storage = match (config.cache.enabled, &config.cache.path) {
    (false, _) => SqliteStorage::open_in_memory()?,
    (true, Some(path)) => SqliteStorage::open_at(path)?,
    (true, None) => SqliteStorage::open()?,
  };

  let watcher = ConnectivityWatcher::new(!args.offline);
  let connectivity = watcher.handle();
  let _heartbeat = match config.sync.heartbeat_interval() {
    Some(interval) if !args.offline => {
      let heartbeat_client = client.clone();
      Some(watcher.spawn_heartbeat(interval, move || {
        let client = heartbeat_client.clone();
        async move { client.ping().await }
      }))
    }
    _ => None,
  };

  let sync = SyncOrchestrator::new(
    client,
    Arc::new(storage),
    connectivity,
    config.sync.options(),
  );

  tracing::debug!(command = ?args.command, offline = args.offline, "running command");
  commands::run(args.command, &sync, &mut std::io::stdout()).await?;

  Ok(())
}

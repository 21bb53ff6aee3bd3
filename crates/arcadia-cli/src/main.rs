use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arcadia_playlist::{
    has_playlist_extension, CatalogLister, CoreRegistry, Crc32, DirCatalogLister,
    JsonCoreRegistry, JsonPlaylistStore, PlaylistStore,
};
use arcadia_tasks::{
    submit_crc_scan, Collaborators, ScanOutcome, ScanRequest, TaskQueue, TITLE_FOUND,
};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod launcher;

use config::ArcadiaConfig;
use launcher::{ConsoleSession, ProcessLauncher};

#[derive(Parser)]
#[command(author, version, about = "Locate netplay content in the Arcadia playlist catalog")]
struct Cli {
    /// Configuration file (JSON). Defaults to the user config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the playlist directory.
    #[arg(long, global = true)]
    playlist_dir: Option<PathBuf>,
    /// Override the core registry file.
    #[arg(long, global = true)]
    cores: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find content by checksum and load it for a netplay session.
    Locate(LocateArgs),
    /// List the playlists in the catalog.
    Playlists,
    /// List the registered cores.
    Cores,
    /// Write the effective configuration to the config file.
    InitConfig {
        /// Replace an existing config file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
#[command(group(ArgGroup::new("checksum").required(true).args(["crc", "content"])))]
struct LocateArgs {
    /// Content checksum, e.g. `ABCD1234`.
    #[arg(long)]
    crc: Option<Crc32>,
    /// Compute the checksum from a local file instead.
    #[arg(long)]
    content: Option<PathBuf>,
    /// Netplay host to join.
    #[arg(long)]
    host: String,
    /// Name of the core the host is running.
    #[arg(long)]
    core: String,
    /// Frontend executable used to load the content.
    #[arg(long)]
    frontend: Option<PathBuf>,
    /// Print the launch command instead of running it.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config_path = cli.config.clone().or_else(config::default_config_path);
    let mut config = ArcadiaConfig::load(cli.config.as_deref());
    if let Some(dir) = cli.playlist_dir {
        config.playlist_dir = dir;
    }
    if let Some(cores) = cli.cores {
        config.core_registry = Some(cores);
    }

    match cli.command {
        Commands::Locate(args) => execute_locate(&config, args),
        Commands::Playlists => execute_playlists(&config),
        Commands::Cores => execute_cores(&config),
        Commands::InitConfig { force } => execute_init_config(&config, config_path, force),
    }
}

fn execute_init_config(
    config: &ArcadiaConfig,
    path: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let Some(path) = path else {
        bail!("no configuration directory available; pass --config");
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to replace it)", path.display());
    }
    config.save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn load_registry(config: &ArcadiaConfig) -> Result<JsonCoreRegistry> {
    let registry = match &config.core_registry {
        Some(path) => JsonCoreRegistry::load_from_path(path),
        None => JsonCoreRegistry::load_default(),
    };
    registry.context("failed to load core registry")
}

fn execute_locate(config: &ArcadiaConfig, args: LocateArgs) -> Result<()> {
    let checksum = match (args.crc, &args.content) {
        (Some(crc), _) => crc,
        (None, Some(path)) => Crc32::of_file(path)
            .with_context(|| format!("failed to checksum {}", path.display()))?,
        (None, None) => bail!("either --crc or --content is required"),
    };

    let frontend = args.frontend.unwrap_or_else(|| config.frontend.clone());
    let collaborators = Collaborators {
        catalog: Arc::new(DirCatalogLister),
        playlists: Arc::new(JsonPlaylistStore),
        cores: Arc::new(load_registry(config)?),
        loader: Arc::new(ProcessLauncher::new(frontend, args.dry_run)),
        session: Arc::new(ConsoleSession),
    };

    let queue = TaskQueue::with_workers(config.workers).context("failed to start task queue")?;
    let request = ScanRequest::new(checksum, args.host, args.core);
    println!("Searching for {} ({})", checksum, checksum.key());
    let handle = submit_crc_scan(&queue, config.scan_settings(), request, &collaborators)
        .context("failed to schedule checksum scan")?;

    let snapshot = handle.wait();
    match handle.outcome() {
        Some(ScanOutcome::Found { content_path }) => {
            println!("{TITLE_FOUND}");
            println!("  Content: {}", content_path.display());
            match handle.dispatch() {
                Some(Ok(report)) => {
                    println!("  Core:    {}", report.core_path.display());
                    Ok(())
                }
                Some(Err(err)) => bail!("{} ({err})", snapshot.title),
                None => bail!("content dispatch did not run"),
            }
        }
        Some(_) => bail!("{}", snapshot.title),
        None => bail!("scan did not report an outcome: {}", snapshot.title),
    }
}

fn execute_playlists(config: &ArcadiaConfig) -> Result<()> {
    let catalog = DirCatalogLister
        .list(&config.playlist_dir)
        .context("Playlist directory not found.")?;
    for path in catalog.paths() {
        if !has_playlist_extension(path, &config.playlist_extension) {
            continue;
        }
        match JsonPlaylistStore.open(path, config.playlist_capacity) {
            Ok(playlist) => println!("{} ({} entries)", path.display(), playlist.len()),
            Err(err) => println!("{} (unreadable: {err})", path.display()),
        }
    }
    Ok(())
}

fn execute_cores(config: &ArcadiaConfig) -> Result<()> {
    let registry = load_registry(config)?;
    for core in registry.cores() {
        println!("{}\t{}", core.name, core.path.display());
    }
    Ok(())
}

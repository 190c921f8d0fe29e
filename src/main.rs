use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thumb_mill::store::BacklogStore;
use thumb_mill::{config, report, scanner, selector, store};

/// Tagged builds report the package version; everything else names the
/// commit it was built from so bug reports are attributable.
fn version_string() -> &'static str {
    if env!("BUILD_TAGGED") == "true" {
        return env!("CARGO_PKG_VERSION");
    }
    match env!("BUILD_COMMIT") {
        "" => concat!(env!("CARGO_PKG_VERSION"), "-dev"),
        // One small leak, at most once per process
        commit => Box::leak(format!("{}-dev+{commit}", env!("CARGO_PKG_VERSION")).into_boxed_str()),
    }
}

#[derive(Parser)]
#[command(name = "thumb-mill")]
#[command(about = "Background thumbnail generator for photo libraries")]
#[command(long_about = "\
Background thumbnail generator for photo libraries

Points at a picture library, keeps a catalog of which images still need
thumbnails, and drains that backlog in batches on a bounded worker pool.
Each source is decoded once per pass and every missing size is written
from that single decode.

Layouts:

  standard    thumbnails mirror the library tree under thumbnail_root,
              named <base>_<suffix>.JPG (l, m, s, ...)
  device      thumbnails live next to the sources in @eaDir folders
              using the Synology naming convention

Staleness is decided against the filesystem: a thumbnail regenerates
when it is missing, older than its source, or the wrong size. Deleting
a thumbnail file is all it takes to get a fresh one.

Run 'thumb-mill gen-config' to generate a documented thumb-mill.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Configuration file (defaults apply when the file is absent)
    #[arg(long, default_value = "thumb-mill.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scan loop continuously
    Run,
    /// Drain the current backlog once, then exit
    Once,
    /// Reconcile the catalog with the library and report, without generating
    Sync,
    /// Null completion markers for a folder so its thumbnails regenerate
    Rescan {
        /// Library folder whose images should re-enter the backlog
        folder: PathBuf,
    },
    /// Print a stock thumb-mill.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if matches!(cli.command, Command::GenConfig) {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let service_config = load_config(&cli.config)?;
    let catalog_dir = catalog_dir(&service_config);
    std::fs::create_dir_all(&catalog_dir)?;

    match cli.command {
        Command::Run => {
            let store = sync_catalog(&service_config, &catalog_dir)?;
            let store = Arc::new(store.persist_to(&catalog_dir));
            let (scanner, printer) = build_scanner(&service_config, store)?;
            // The loop only exits on the disabled path; process signals
            // tear the whole process down.
            let shutdown = AtomicBool::new(false);
            scanner.run(&shutdown);
            drop(scanner);
            printer.join().unwrap();
        }
        Command::Once => {
            let store = sync_catalog(&service_config, &catalog_dir)?;
            let store = Arc::new(store);
            let (scanner, printer) = build_scanner(&service_config, store.clone())?;
            scanner.drain()?;
            store.save(&catalog_dir)?;
            drop(scanner);
            printer.join().unwrap();
        }
        Command::Sync => {
            let store = store::MemoryStore::load(&catalog_dir);
            let stats = store.sync_with_library(&service_config.pictures_root)?;
            store.save(&catalog_dir)?;
            println!("Catalog: {stats}");
        }
        Command::Rescan { folder } => {
            let store = store::MemoryStore::load(&catalog_dir);
            let flagged = store.mark_folder_for_rescan(&folder)?;
            store.save(&catalog_dir)?;
            println!("Flagged {flagged} images in {}", folder.display());
        }
        Command::GenConfig => unreachable!(),
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<config::ServiceConfig, config::ConfigError> {
    let service_config = if path.exists() {
        config::ServiceConfig::load(path)?
    } else {
        config::ServiceConfig::default()
    };
    service_config.validate()?;
    Ok(service_config)
}

/// Where the catalog snapshot lives. The device layout has no separate
/// thumbnail tree, so the snapshot sits at the library root instead.
fn catalog_dir(service_config: &config::ServiceConfig) -> PathBuf {
    if service_config.device_layout {
        service_config.pictures_root.clone()
    } else {
        service_config.thumbnail_root.clone()
    }
}

fn sync_catalog(
    service_config: &config::ServiceConfig,
    catalog_dir: &Path,
) -> Result<store::MemoryStore, store::StoreError> {
    let store = store::MemoryStore::load(catalog_dir);
    let stats = store.sync_with_library(&service_config.pictures_root)?;
    println!("Catalog: {stats}");
    Ok(store)
}

/// Wire a scanner to a stdout printer thread. The sender lives inside
/// the scanner; dropping the scanner closes the channel and ends the
/// printer.
fn build_scanner(
    service_config: &config::ServiceConfig,
    store: Arc<dyn BacklogStore>,
) -> Result<(scanner::Scanner, std::thread::JoinHandle<()>), rayon::ThreadPoolBuildError> {
    let registry = Arc::new(selector::BackendRegistry::stock());
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            report::print_event(&event);
        }
    });
    let scanner = scanner::Scanner::new(service_config.clone(), store, registry)?.with_events(tx);
    Ok((scanner, printer))
}

use anyhow::Result;
use serde_json::json;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use photocat::catalog::Catalog;
use photocat::config::Config;
use photocat::events::EventBus;
use photocat::indexer::{IndexOptions, IndexStatus, Indexer};
use photocat::media::MediaFile;

enum Command {
    Index { rescan: bool },
    Import { move_files: bool },
    ImportCancel,
}

struct Args {
    command: Command,
    config_path: Option<PathBuf>,
    path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();

    let mut command = None;
    let mut config_path = None;
    let mut path = None;
    let mut rescan = false;
    let mut move_files = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photocat {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--rescan" | "-r" => rescan = true,
            "--move" | "-m" => move_files = true,
            "index" if command.is_none() => command = Some("index"),
            "import" if command.is_none() => command = Some("import"),
            "cancel" if command == Some("import") => command = Some("import-cancel"),
            other if !other.starts_with('-') && command.is_some() && path.is_none() => {
                path = Some(PathBuf::from(other));
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let command = match command {
        Some("index") => Command::Index { rescan },
        Some("import") => Command::Import { move_files },
        Some("import-cancel") => Command::ImportCancel,
        _ => {
            print_help();
            std::process::exit(1);
        }
    };

    Args {
        command,
        config_path,
        path,
    }
}

fn print_help() {
    println!(
        r#"photocat - personal photo catalog

USAGE:
    photocat index [PATH] [--rescan]
    photocat import [PATH] [--move]
    photocat import cancel

COMMANDS:
    index            Index originals (PATH defaults to the configured tree)
    import           Copy files from the import directory, then index them
    import cancel    Stop a running import after the current file

OPTIONS:
    --rescan, -r     Re-run all analyses, also for unchanged files
    --move, -m       Move files out of the import directory instead of copying
    --config, -c     Path to config file
    --version, -V    Show version
    --help, -h       Show this help message

ENVIRONMENT:
    PHOTOCAT_LOG     Log level (trace, debug, info, warn, error)"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    let _ = photocat::logging::init(Some(Config::config_dir().join("logs")));

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let catalog = Arc::new(Catalog::open(&config.db_path)?);
    catalog.initialize()?;

    let bus = Arc::new(EventBus::new());
    let indexer = Arc::new(Indexer::new(catalog, bus.clone(), &config));

    match args.command {
        Command::Index { rescan } => {
            let path = args.path.unwrap_or_else(|| config.originals_path.clone());
            let opt = if rescan {
                IndexOptions::all()
            } else {
                IndexOptions::changed_only()
            };
            run_index(&indexer, &bus, &config, &path, opt)
        }
        Command::Import { move_files } => {
            let path = args.path.unwrap_or_else(|| config.import_path.clone());
            run_import(&indexer, &bus, &config, &path, move_files)
        }
        Command::ImportCancel => {
            std::fs::write(cancel_marker(), b"")?;
            println!("import canceled");
            Ok(())
        }
    }
}

fn cancel_marker() -> PathBuf {
    Config::config_dir().join("import.cancel")
}

fn canceled() -> bool {
    cancel_marker().exists()
}

fn discover_media(directory: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if extensions.iter().any(|e| e.to_lowercase() == ext) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

fn run_index(
    indexer: &Arc<Indexer>,
    bus: &EventBus,
    config: &Config,
    path: &Path,
    opt: IndexOptions,
) -> Result<()> {
    let start = Instant::now();
    let files = discover_media(path, &config.scanner.image_extensions);

    info!("index: found {} media files in {}", files.len(), path.display());

    let (added, updated, skipped, failed) = index_files(indexer, config, files, opt);

    let seconds = start.elapsed().as_secs();
    bus.publish(
        "index.completed",
        json!({"path": path.to_string_lossy(), "seconds": seconds}),
    );
    bus.publish("config.updated", config.client_values());

    println!(
        "indexed in {seconds} s: {added} added, {updated} updated, {skipped} skipped, {failed} failed"
    );
    Ok(())
}

fn run_import(
    indexer: &Arc<Indexer>,
    bus: &EventBus,
    config: &Config,
    path: &Path,
    move_files: bool,
) -> Result<()> {
    let start = Instant::now();
    let _ = std::fs::remove_file(cancel_marker());

    let sources = discover_media(path, &config.scanner.image_extensions);
    info!("import: found {} media files in {}", sources.len(), path.display());

    let mut imported = Vec::new();

    for source in sources {
        if canceled() {
            warn!("import: canceled");
            break;
        }

        let relative = source.strip_prefix(path).unwrap_or(&source).to_path_buf();
        let dest = config.originals_path.join(&relative);

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let copied = if move_files {
            // Rename first, fall back to copy+remove across filesystems.
            std::fs::rename(&source, &dest).or_else(|_| {
                std::fs::copy(&source, &dest).and_then(|_| std::fs::remove_file(&source))
            })
        } else {
            std::fs::copy(&source, &dest).map(|_| ())
        };

        match copied {
            Ok(()) => imported.push((dest, relative.to_string_lossy().to_string())),
            Err(err) => error!("import: could not copy {}: {err}", source.display()),
        }
    }

    let mut counts = (0usize, 0usize, 0usize, 0usize);
    let opt = IndexOptions::default();

    for (dest, original_name) in &imported {
        if canceled() {
            break;
        }
        match index_one(indexer, dest, &opt, original_name) {
            IndexStatus::Added => counts.0 += 1,
            IndexStatus::Updated => counts.1 += 1,
            IndexStatus::Skipped => counts.2 += 1,
            IndexStatus::Failed => counts.3 += 1,
        }
    }

    if move_files {
        remove_empty_dirs(path);
    }

    let _ = std::fs::remove_file(cancel_marker());

    let seconds = start.elapsed().as_secs();
    bus.publish(
        "import.completed",
        json!({"path": path.to_string_lossy(), "seconds": seconds}),
    );
    bus.publish(
        "index.completed",
        json!({"path": path.to_string_lossy(), "seconds": seconds}),
    );
    bus.publish("config.updated", config.client_values());

    let (added, updated, skipped, failed) = counts;
    println!(
        "import completed in {seconds} s: {added} added, {updated} updated, {skipped} skipped, {failed} failed"
    );
    Ok(())
}

/// Index a batch on a bounded worker pool.
fn index_files(
    indexer: &Arc<Indexer>,
    config: &Config,
    files: Vec<PathBuf>,
    opt: IndexOptions,
) -> (usize, usize, usize, usize) {
    let queue = Mutex::new(VecDeque::from(files));
    let added = AtomicUsize::new(0);
    let updated = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let workers = config.workers.max(1);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let path = match queue.lock().unwrap().pop_front() {
                    Some(path) => path,
                    None => break,
                };

                match index_one(indexer, &path, &opt, "") {
                    IndexStatus::Added => added.fetch_add(1, Ordering::Relaxed),
                    IndexStatus::Updated => updated.fetch_add(1, Ordering::Relaxed),
                    IndexStatus::Skipped => skipped.fetch_add(1, Ordering::Relaxed),
                    IndexStatus::Failed => failed.fetch_add(1, Ordering::Relaxed),
                };
            });
        }
    });

    (
        added.load(Ordering::Relaxed),
        updated.load(Ordering::Relaxed),
        skipped.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
    )
}

fn index_one(
    indexer: &Indexer,
    path: &Path,
    opt: &IndexOptions,
    original_name: &str,
) -> IndexStatus {
    let m = match MediaFile::new(path) {
        Ok(m) => m,
        Err(err) => {
            error!("index: {err}");
            return IndexStatus::Failed;
        }
    };

    let result = indexer.media_file(&m, opt, original_name);

    match result.status {
        IndexStatus::Failed => {
            error!("index: {} failed", path.display());
        }
        status => {
            info!("index: {} {}", path.display(), status);
        }
    }

    result.status
}

/// Remove directories left empty after a move import, deepest first.
fn remove_empty_dirs(root: &Path) {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir() && e.path() != root)
        .map(|e| e.path().to_path_buf())
        .collect();

    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

    for dir in dirs {
        let _ = std::fs::remove_dir(dir);
    }
}

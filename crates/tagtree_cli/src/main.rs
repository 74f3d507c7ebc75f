//! Library inspection entry point.
//!
//! # Responsibility
//! - Print the projected rows of a library file, indented by depth.
//! - Read options from the settings database and remember the last library.
//! - Print the core version when no file is given.
//!
//! Usage: `tagtree_cli [--all] [--log-dir <absolute dir>] [--settings <db file>] [library file]`

use std::path::PathBuf;
use std::process::ExitCode;
use tagtree_core::db::open_db;
use tagtree_core::{row_data, rows, Library, Settings, SettingsRepository, SqliteSettingsRepository};

struct Args {
    include_hidden: bool,
    log_dir: Option<String>,
    settings: Option<PathBuf>,
    library: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        include_hidden: false,
        log_dir: None,
        settings: None,
        library: None,
    };
    let mut raw = std::env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--all" => args.include_hidden = true,
            "--log-dir" => {
                args.log_dir = Some(raw.next().ok_or("--log-dir needs a directory")?);
            }
            "--settings" => {
                let path = raw.next().ok_or("--settings needs a database file")?;
                args.settings = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => return Err(format!("unknown option `{other}`")),
            other => args.library = Some(PathBuf::from(other)),
        }
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), String> {
    let store = args
        .settings
        .as_ref()
        .map(|path| open_db(path).map_err(|err| format!("settings: {err}")))
        .transpose()?;
    let repo = store
        .as_ref()
        .map(SqliteSettingsRepository::try_new)
        .transpose()
        .map_err(|err| format!("settings: {err}"))?;
    let mut settings = match &repo {
        Some(repo) => repo.load().map_err(|err| format!("settings: {err}"))?,
        None => Settings::default(),
    };

    if let Some(log_dir) = &args.log_dir {
        tagtree_core::init_logging(&settings.log_level, log_dir)?;
    }
    let Some(path) = args.library.or_else(|| settings.last_library_path.clone()) else {
        println!("tagtree_core version={}", tagtree_core::core_version());
        return Ok(());
    };

    let mut library = Library::new(settings.library_options());
    let report = library
        .load(&path)
        .map_err(|err| format!("{}: {err}", err.title()))?;
    log::info!(
        "event=cli_load module=cli status=ok format_version={} problems={}",
        report.format_version,
        report.problems.len()
    );
    if let Some(repo) = &repo {
        settings.last_library_path = Some(path);
        repo.save(&settings).map_err(|err| format!("settings: {err}"))?;
    }

    let tree = library.tree();
    for row in rows(tree, args.include_hidden).map_err(|err| err.to_string())? {
        let data = row_data(tree, &row).map_err(|err| err.to_string())?;
        let marker = if data.is_shadow { "~ " } else { "" };
        println!(
            "{}{marker}{} [{}]",
            "  ".repeat(row.depth),
            data.name,
            data.node_type.label()
        );
    }
    for problem in &report.problems {
        eprintln!("warning: {problem}");
    }
    Ok(())
}

fn main() -> ExitCode {
    match parse_args().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

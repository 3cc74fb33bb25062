// Terminal viewer for LudoBench question/answer annotations.
// - reads manifest.json plus one JSON document per record from a local mirror or over HTTP
// - folder and record selectors on the left, question card, answer check and reference on the right
// - game state images are resolved from the local image mirror
// - `manifest`, `sanitize` and `check` subcommands prepare and verify a dataset

mod answer;
mod config;
mod controller;
mod error;
mod gallery;
mod keymap;
mod manifest;
mod nav;
mod record;
mod render;
mod source;
mod tooling;
mod ui;

use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;

use crate::{
    config::{FileConfig, Overrides, Settings, SiteLocation},
    controller::Controller,
    source::{DirSource, Fetcher, HttpSource},
    ui::{handle_key, theme_of, ui, App, ThemeKind},
};

#[derive(Debug, Parser)]
#[command(
    name = "ludobench-viewer",
    about = "Browse LudoBench annotation records in the terminal",
    version
)]
struct Cli {
    /// Site root holding manifest.json (default: ./docs or ., searched upwards, or $LUDOBENCH_ROOT)
    #[arg(long, global = true, conflicts_with = "url")]
    root: Option<PathBuf>,

    /// Read the site over HTTP instead of from disk
    #[arg(long, global = true)]
    url: Option<String>,

    /// Manifest locator relative to the root
    #[arg(long, global = true)]
    manifest: Option<String>,

    /// Directory of mirrored game state images, relative to the root
    #[arg(long = "image-base", global = true)]
    image_base: Option<String>,

    /// Colour theme: dark | light
    #[arg(long, value_enum, global = true)]
    theme: Option<ThemeKind>,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long = "log-file", global = true)]
    log_file: Option<PathBuf>,

    /// Path to viewer.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive viewer (default)
    View,
    /// Build manifest.json from the annotation data tree
    Manifest {
        /// Data directory relative to the root
        #[arg(long, default_value = tooling::DEFAULT_DATA_DIR)]
        data: String,
        /// Output path (default: <root>/<manifest>)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Point records at locally mirrored assets and blank the rationale
    Sanitize {
        /// Data directory relative to the root
        #[arg(long, default_value = tooling::DEFAULT_DATA_DIR)]
        data: String,
    },
    /// Load the manifest and every record without a UI
    Check,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            root: self.root.clone(),
            url: self.url.clone(),
            manifest: self.manifest.clone(),
            image_base: self.image_base.clone(),
            theme: self.theme,
            log_file: self.log_file.clone(),
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_file_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

fn build_fetcher(settings: &Settings) -> Result<Arc<dyn Fetcher>> {
    Ok(match &settings.site {
        SiteLocation::Dir(root) => Arc::new(DirSource::new(root.clone())),
        SiteLocation::Url(url) => Arc::new(HttpSource::new(url, settings.timeout)?),
    })
}

fn local_root(settings: &Settings) -> Result<&Path> {
    match &settings.site {
        SiteLocation::Dir(root) => Ok(root),
        SiteLocation::Url(url) => bail!("a local --root is required, got URL {}", url),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let file = FileConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(cli.overrides(), file);

    match cli.command.unwrap_or(Command::View) {
        Command::View => run_viewer(settings),
        Command::Manifest { data, out } => {
            init_stderr_logging();
            let root = local_root(&settings)?;
            let entries = tooling::build_manifest(root, &data)?;
            let out = out.unwrap_or_else(|| root.join(&settings.manifest));
            tooling::write_manifest(&out, &entries)?;
            println!("wrote {} entries to {}", entries.len(), out.display());
            Ok(())
        }
        Command::Sanitize { data } => {
            init_stderr_logging();
            let root = local_root(&settings)?;
            let n = tooling::sanitize_tree(root, &data)?;
            println!("sanitized {} files", n);
            Ok(())
        }
        Command::Check => {
            init_stderr_logging();
            let fetcher = build_fetcher(&settings)?;
            let report = tooling::check_site(fetcher.as_ref(), &settings.manifest)?;
            for f in &report.failures {
                println!("{}", f);
            }
            println!(
                "{} records, {} failed",
                report.records,
                report.failures.len()
            );
            if !report.failures.is_empty() {
                bail!("{} of {} records failed to load", report.failures.len(), report.records);
            }
            Ok(())
        }
    }
}

fn run_viewer(settings: Settings) -> Result<()> {
    if let Some(path) = &settings.log_file {
        init_file_logging(path)?;
    }
    tracing::info!(site = ?settings.site, manifest = %settings.manifest, "starting viewer");
    let fetcher = build_fetcher(&settings)?;
    let mut controller = Controller::new(fetcher, settings.manifest.clone(), settings.image_base.clone());
    controller.start();
    let mut app = App::new(
        controller,
        theme_of(settings.theme),
        settings.keymap,
        settings.left_width,
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        if app.controller.pump() {
            app.sync();
        }
        terminal.draw(|f| ui(f, app))?;
        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(k) = event::read()? {
                if handle_key(app, k)? {
                    break;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn defaults_to_viewer() {
        let cli = Cli::try_parse_from(["ludobench-viewer", "--theme", "light"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.theme, Some(ThemeKind::Light));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ludobench-viewer",
            "manifest",
            "--root",
            "docs",
            "--out",
            "m.json",
        ])
        .unwrap();
        assert_eq!(cli.root, Some(PathBuf::from("docs")));
        match cli.command {
            Some(Command::Manifest { data, out }) => {
                assert_eq!(data, "annotation_data");
                assert_eq!(out, Some(PathBuf::from("m.json")));
            }
            other => panic!("expected manifest command, got {:?}", other),
        }
    }

    #[test]
    fn root_and_url_are_exclusive() {
        let err = Cli::try_parse_from([
            "ludobench-viewer",
            "--root",
            "docs",
            "--url",
            "http://localhost:8000",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn url_site_is_not_a_local_root() {
        let settings = Settings::resolve(
            Overrides {
                url: Some("http://localhost:8000".into()),
                ..Overrides::default()
            },
            FileConfig::default(),
        );
        assert!(local_root(&settings).is_err());
        assert!(build_fetcher(&settings).is_ok());
    }
}

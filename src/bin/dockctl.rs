use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docking::common::config::{Config, Settings, config_file};
use docking::common::log;
use docking::layout_engine::{DockLayout, DockLayoutConfig};
use docking::sys::geometry::Size;
use docking::sys::headless::{HeadlessRole, HeadlessSurface};
use docking::sys::storage::FileStore;
use docking::sys::surface::ElementRole;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "dockctl")]
#[command(about = "Inspect docking layout files")]
struct Cli {
    /// Settings file to use instead of ~/.docking.toml
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a layout and list any problems with it
    Validate { file: PathBuf },
    /// Print the layout tree after a headless layout pass
    Tree {
        file: PathBuf,
        #[arg(long, default_value_t = 1000.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
        /// Start from the copy saved in the layout cache, if the layout has one
        #[arg(long)]
        cached: bool,
    },
    /// Print the placement of every element after a headless layout pass
    Place {
        file: PathBuf,
        #[arg(long, default_value_t = 1000.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
        /// Start from the copy saved in the layout cache, if the layout has one
        #[arg(long)]
        cached: bool,
    },
}

fn main() {
    log::init_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(2);
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file);
    let mut config = if path.exists() {
        Config::read(&path).with_context(|| format!("reading {}", path.display()))?
    } else {
        Config::default()
    };
    for issue in config.validate() {
        warn!("{issue}");
    }
    let fixes = config.auto_fix_values();
    if fixes > 0 {
        warn!(fixes, "replaced invalid settings with defaults");
    }
    Ok(config)
}

fn read_layout(file: &Path) -> anyhow::Result<DockLayoutConfig> {
    let json = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    Ok(DockLayoutConfig::from_json(&json)?)
}

fn build_layout(
    file: &Path,
    size: Size,
    cached: bool,
    settings: &Settings,
) -> anyhow::Result<DockLayout<HeadlessSurface>> {
    let surface = HeadlessSurface::new(size);
    let config = read_layout(file)?;
    if !cached {
        return Ok(DockLayout::new(surface, config, settings)?);
    }
    let store = FileStore::in_data_dir();
    debug!(dir = %store.dir().display(), "reading cached layouts");
    Ok(DockLayout::with_store(surface, config, settings, Box::new(store))?)
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Validate { file } => {
            let layout = read_layout(&file)?;
            let issues = layout.validate();
            if issues.is_empty() {
                println!("{}: ok ({} panels)", file.display(), layout.panel_ids().len());
                return Ok(true);
            }
            for issue in &issues {
                println!("{}: {issue}", file.display());
            }
            Ok(false)
        }
        Commands::Tree { file, width, height, cached } => {
            let layout =
                build_layout(&file, Size::new(width, height), cached, &config.settings)?;
            print!("{}", layout.draw_tree());
            Ok(true)
        }
        Commands::Place { file, width, height, cached } => {
            let layout =
                build_layout(&file, Size::new(width, height), cached, &config.settings)?;
            for (_, element) in layout.surface().elements() {
                let what = match &element.role {
                    HeadlessRole::Panel(request) => format!("panel {:?}", request.id),
                    HeadlessRole::Other(ElementRole::Splitter(orientation)) => {
                        format!("splitter {orientation:?}")
                    }
                    HeadlessRole::Other(ElementRole::TabHeader { tabs, active }) => format!(
                        "tabs [{}] active={}",
                        tabs.iter().map(|t| t.id.as_str()).collect::<Vec<_>>().join(", "),
                        active.as_deref().unwrap_or("-")
                    ),
                    HeadlessRole::Other(ElementRole::HoverBox) => "hover".to_string(),
                };
                let hidden = if element.visible { "" } else { " (hidden)" };
                println!("{what}{hidden}: {}", element.placement.to_css());
            }
            Ok(true)
        }
    }
}

mod config;
mod session;

use anyhow::{Context, Result};
use config::{parse_args, CliConfig, Command, OutputFormat};
use lifeflow_core::{Event, LayoutConfig};
use lifeflow_engine::{settings, FlowEngine, FlowSettings, LayoutPresenter, SvgPresenter};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries layout output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_settings(config: &CliConfig) -> Result<FlowSettings> {
    match &config.settings {
        Some(path) => settings::load_from_path(path),
        None => Ok(settings::load_or_default()),
    }
}

fn read_events(path: &Path) -> Result<Vec<Event>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse events {}", path.display()))
}

fn prepared_engine(config: &CliConfig, layout: LayoutConfig) -> Result<FlowEngine> {
    let events = read_events(config.events_path()?)?;
    let mut engine = FlowEngine::new(load_settings(config)?);
    engine.set_config(layout);
    engine.set_events(events);
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = parse_args()?;

    match config.command {
        Command::Layout => {
            let engine = prepared_engine(&config, config.layout.clone())?;
            let out = match config.format {
                OutputFormat::Json => serde_json::to_string_pretty(engine.layout())
                    .context("failed to encode layout")?,
                OutputFormat::Svg => SvgPresenter::default().present(engine.layout()),
            };
            println!("{out}");
        }
        Command::Hit => {
            let engine = prepared_engine(&config, config.layout.clone())?;
            let at = config.at.context("hit expects --at X,Y")?;
            let hit = engine.hit_test(at);
            println!(
                "{}",
                serde_json::to_string(&hit).context("failed to encode hit result")?
            );
        }
        Command::Session => {
            let mut engine = FlowEngine::new(load_settings(&config)?);
            engine.set_config(config.layout.clone());
            if let Some(path) = &config.events {
                engine.set_events(read_events(path)?);
            }
            session::run(&mut engine).await?;
        }
        Command::InitSettings => {
            let defaults = FlowSettings::default();
            match &config.settings {
                Some(path) => settings::save_to_path(&defaults, path)?,
                None => settings::save(&defaults)?,
            }
            tracing::info!("default settings written");
        }
    }

    Ok(())
}

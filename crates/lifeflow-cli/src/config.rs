use anyhow::{Context, Result};
use lifeflow_core::{Granularity, LayoutConfig, Point, Size};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Layout,
    Hit,
    Session,
    InitSettings,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self> {
        match input {
            "layout" => Ok(Self::Layout),
            "hit" => Ok(Self::Hit),
            "session" => Ok(Self::Session),
            "init-settings" => Ok(Self::InitSettings),
            _ => anyhow::bail!("invalid command: {input} (expected layout|hit|session|init-settings)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
}

impl OutputFormat {
    pub fn parse(input: &str) -> Result<Self> {
        match input {
            "json" => Ok(Self::Json),
            "svg" => Ok(Self::Svg),
            _ => anyhow::bail!("invalid format: {input} (expected json|svg)"),
        }
    }
}

pub fn parse_granularity(input: &str) -> Result<Granularity> {
    Ok(match input {
        "auto" => Granularity::Auto,
        "day" => Granularity::Day,
        "week" => Granularity::Week,
        "month" => Granularity::Month,
        "quarter" => Granularity::Quarter,
        "year" => Granularity::Year,
        _ => anyhow::bail!("invalid granularity: {input} (expected auto|day|week|month|quarter|year)"),
    })
}

fn parse_pair(input: &str, sep: char, what: &str) -> Result<(f32, f32)> {
    let Some((a, b)) = input.split_once(sep) else {
        anyhow::bail!("{what} expects A{sep}B, got {input}");
    };
    let a: f32 = a.trim().parse().with_context(|| format!("bad {what}: {input}"))?;
    let b: f32 = b.trim().parse().with_context(|| format!("bad {what}: {input}"))?;
    Ok((a, b))
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub command: Command,
    pub events: Option<PathBuf>,
    pub settings: Option<PathBuf>,
    pub format: OutputFormat,
    pub at: Option<Point>,
    pub layout: LayoutConfig,
}

impl CliConfig {
    pub fn events_path(&self) -> Result<&PathBuf> {
        self.events
            .as_ref()
            .context("--events is required for this command")
    }
}

pub fn parse_args() -> Result<CliConfig> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<CliConfig>
where
    I: IntoIterator<Item = OsString>,
{
    let mut command = Command::Layout;
    let mut events = None;
    let mut settings = None;
    let mut format = OutputFormat::Json;
    let mut at = None;
    let mut layout = LayoutConfig::default();
    let mut args = args.into_iter().peekable();

    if let Some(first) = args.peek() {
        let first = first.to_string_lossy();
        if !first.starts_with("--") {
            command = Command::parse(&first)?;
            args.next();
        }
    }

    while let Some(arg) = args.next() {
        let mut value = |what: &str| -> Result<String> {
            let Some(v) = args.next() else {
                anyhow::bail!("{} expects {what}", arg.to_string_lossy());
            };
            Ok(v.to_string_lossy().into_owned())
        };
        if arg == "--events" {
            events = Some(PathBuf::from(value("a path")?));
        } else if arg == "--settings" {
            settings = Some(PathBuf::from(value("a path")?));
        } else if arg == "--zoom" {
            let raw = value("a number")?;
            layout.zoom_multiplier = raw
                .parse()
                .with_context(|| format!("bad zoom: {raw}"))?;
        } else if arg == "--viewport" {
            let (w, h) = parse_pair(&value("WxH")?, 'x', "--viewport")?;
            layout.viewport = Size::new(w, h);
        } else if arg == "--filter" {
            layout.type_filters.insert(value("an event type")?);
        } else if arg == "--granularity" {
            layout.granularity = Some(parse_granularity(&value("a granularity")?)?);
        } else if arg == "--format" {
            format = OutputFormat::parse(&value("json|svg")?)?;
        } else if arg == "--at" {
            let (x, y) = parse_pair(&value("X,Y")?, ',', "--at")?;
            at = Some(Point::new(x, y));
        } else if arg == "--hide-nodes" {
            layout.show_nodes = false;
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    if command == Command::Hit && at.is_none() {
        anyhow::bail!("hit expects --at X,Y");
    }

    Ok(CliConfig {
        command,
        events,
        settings,
        format,
        at,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn defaults_to_json_layout() {
        let config = parse_args_from(args(&["--events", "e.json"])).expect("config parsed");
        assert_eq!(config.command, Command::Layout);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.events, Some(PathBuf::from("e.json")));
        assert_eq!(config.layout, LayoutConfig::default());
    }

    #[test]
    fn parses_layout_flags() {
        let config = parse_args_from(args(&[
            "layout",
            "--zoom",
            "2.5",
            "--viewport",
            "390x844",
            "--filter",
            "travel",
            "--filter",
            "work",
            "--granularity",
            "week",
            "--format",
            "svg",
            "--hide-nodes",
        ]))
        .expect("config parsed");
        assert_eq!(config.layout.zoom_multiplier, 2.5);
        assert_eq!(config.layout.viewport, Size::new(390.0, 844.0));
        assert_eq!(config.layout.type_filters.len(), 2);
        assert_eq!(config.layout.granularity, Some(Granularity::Week));
        assert_eq!(config.format, OutputFormat::Svg);
        assert!(!config.layout.show_nodes);
        assert!(config.events_path().is_err());
    }

    #[test]
    fn hit_requires_point() {
        assert!(parse_args_from(args(&["hit", "--events", "e.json"])).is_err());
        let config = parse_args_from(args(&["hit", "--at", "10,20.5"])).expect("config parsed");
        assert_eq!(config.at, Some(Point::new(10.0, 20.5)));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args_from(args(&["draw"])).is_err());
        assert!(parse_args_from(args(&["--viewport", "wide"])).is_err());
        assert!(parse_args_from(args(&["--zoom"])).is_err());
        assert!(parse_args_from(args(&["--format", "png"])).is_err());
        assert!(parse_args_from(args(&["--verbose"])).is_err());
    }
}

//! Minimal CLI parsing for run overrides.
//!
//! Flags accept one or two leading dashes and either `--flag value` or
//! `--flag=value`. Boolean flags may be given bare (`--imdb`) or with an
//! explicit value (`--omdb=false`).

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::services::sources::SourceId;

/// Source order used when `--order` is not given
pub const DEFAULT_ORDER: [SourceId; 3] = [SourceId::Omdb, SourceId::FilmAffinity, SourceId::Imdb];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub omdb: bool,
    pub filmaffinity: bool,
    pub imdb: bool,
    /// Let every source replace values already on the record
    pub overwrite: bool,
    /// First listing page
    pub first_page: u32,
    /// Stop before this page; 0 runs until the listing is empty
    pub last_page: u32,
    /// Output file stem; `.json` is appended
    pub output: String,
    pub order: Vec<SourceId>,
    pub workers: Option<usize>,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            omdb: true,
            filmaffinity: false,
            imdb: false,
            overwrite: false,
            first_page: 1,
            last_page: 0,
            output: "movies".to_string(),
            order: DEFAULT_ORDER.to_vec(),
            workers: None,
        }
    }
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = CliOptions::default();
        let mut args = args.into_iter().peekable();

        while let Some(arg) = args.next() {
            let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
                warn!(argument = %arg, "Ignoring positional argument");
                continue;
            };
            let (name, inline) = match flag.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (flag, None),
            };

            match name {
                "omdb" | "filmaffinity" | "imdb" | "overwrite" => {
                    // A bare boolean flag only consumes the next argument when it is a boolean
                    let value = match inline {
                        Some(value) => parse_bool(name, &value)?,
                        None => match args.next_if(|next| is_bool(next)) {
                            Some(next) => parse_bool(name, &next)?,
                            None => true,
                        },
                    };
                    match name {
                        "omdb" => options.omdb = value,
                        "filmaffinity" => options.filmaffinity = value,
                        "imdb" => options.imdb = value,
                        _ => options.overwrite = value,
                    }
                }
                "ip" => options.first_page = parse_number(name, value_for(name, inline, &mut args)?)?,
                "fp" => options.last_page = parse_number(name, value_for(name, inline, &mut args)?)?,
                "workers" => options.workers = Some(parse_number(name, value_for(name, inline, &mut args)?)?),
                "o" | "output" => options.output = value_for(name, inline, &mut args)?,
                "order" => options.order = parse_order(&value_for(name, inline, &mut args)?)?,
                _ => warn!(flag = %arg, "Ignoring unknown flag"),
            }
        }

        Ok(options)
    }

    /// Enabled sources, in run order
    pub fn enabled_sources(&self) -> Vec<SourceId> {
        self.order
            .iter()
            .copied()
            .filter(|id| match id {
                SourceId::Omdb => self.omdb,
                SourceId::FilmAffinity => self.filmaffinity,
                SourceId::Imdb => self.imdb,
            })
            .collect()
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.json", self.output))
    }
}

fn value_for<I>(name: &str, inline: Option<String>, args: &mut I) -> Result<String>
where
    I: Iterator<Item = String>,
{
    inline
        .or_else(|| args.next())
        .ok_or_else(|| anyhow!("Missing value for -{}", name))
}

fn is_bool(value: &str) -> bool {
    matches!(value, "true" | "false" | "1" | "0")
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(anyhow!("Invalid boolean for -{}: {}", name, value)),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: String) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value for -{}: {}", name, value))
}

/// Comma separated source ids; later duplicates are dropped
fn parse_order(value: &str) -> Result<Vec<SourceId>> {
    let mut order = Vec::new();
    for token in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let id: SourceId = token.parse()?;
        if !order.contains(&id) {
            order.push(id);
        }
    }
    Ok(order)
}

//! charcard - inspect character card files from the command line.
//!
//! Prints one JSON line per input file:
//!
//! ```text
//! {"file":"aria.png","card":{"spec":"v3","name":"Aria",...}}
//! {"file":"notes.txt","card":null}
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=charcard_extract=debug` to see why a
//! file yielded nothing. Exits with status 1 when no file yielded a card.
//!
//! # Configuration
//!
//! Limits come from `--config <file>` (TOML, JSON or YAML) or from the
//! `CHARCARD_*` environment variables, optionally loaded from `.env`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use charcard_extract::{ExtractConfig, ExtractionPipeline, NormalizedCharacterInfo};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn cli() -> Command {
    Command::new("charcard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Recover character cards from PNG, CharX, JPEG and JSON files")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Load extraction limits from a TOML, JSON or YAML file"),
        )
        .arg(
            Arg::new("no-avatar")
                .long("no-avatar")
                .action(ArgAction::SetTrue)
                .help("Skip avatar data URLs"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .action(ArgAction::SetTrue)
                .help("Pretty-print each result"),
        )
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf))
                .help("Card files to inspect"),
        )
}

/// Resolve the extraction config from the command line and environment.
fn load_config(matches: &ArgMatches) -> Result<ExtractConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ExtractConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ExtractConfig::from_env(),
    };
    if matches.get_flag("no-avatar") {
        config.include_avatar = false;
    }
    Ok(config)
}

/// One output line for a file.
fn report(path: &Path, card: Option<&NormalizedCharacterInfo>, pretty: bool) -> Result<String> {
    let line = serde_json::json!({
        "file": path.display().to_string(),
        "card": card,
    });
    let text = if pretty {
        serde_json::to_string_pretty(&line)?
    } else {
        serde_json::to_string(&line)?
    };
    Ok(text)
}

async fn run(matches: ArgMatches) -> Result<bool> {
    let config = load_config(&matches)?;
    let pretty = matches.get_flag("pretty");
    let pipeline = ExtractionPipeline::with_config(config);

    let mut recovered = 0usize;
    let files: Vec<&PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|v| v.collect())
        .unwrap_or_default();

    for path in &files {
        let card = pipeline.extract_path(path).await;
        if card.is_some() {
            recovered += 1;
        }
        println!("{}", report(path, card.as_ref(), pretty)?);
    }

    info!("Recovered {} of {} card(s)", recovered, files.len());
    Ok(recovered > 0)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    // stdout carries the results
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let matches = cli().get_matches();
    if run(matches).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

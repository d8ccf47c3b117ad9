mod error;
mod saved;
mod token;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use cumulus_catalog::{Catalog, DRIVE, OAuthClient, SkipReason, Source, SourceRegistry, register_drive};
use cumulus_codec::CodecRegistry;
use cumulus_config::Config;
use exn::ResultExt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cumulus", version, about = "Browse and stream the music stored in a cloud drive")]
struct Cli {
    /// Configuration file, merged above the user configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// JSON file holding the OAuth token
    #[arg(long, global = true, env = "CUMULUS_TOKEN_FILE")]
    token_file: Option<PathBuf>,
    /// Bare OAuth access token
    #[arg(long, global = true, env = "CUMULUS_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Saved catalog; read instead of probing the account, rewritten when it changes
    #[arg(long, global = true, env = "CUMULUS_CATALOG_FILE")]
    catalog_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every playable track
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        /// Also report files and tracks that were left out
        #[arg(long)]
        skipped: bool,
        /// Rebuild the catalog even if a saved one was loaded
        #[arg(long)]
        refresh: bool,
    },
    /// Show the metadata of one track
    Info { id: String },
    /// Download the file holding a track
    Fetch {
        id: String,
        /// Output file; defaults to standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Split a track ID into file identifier and track index
    ParseId { id: String },
    /// Show the registered source types and their OAuth client registrations
    Sources,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Command::ParseId { id } = &cli.command {
        let (file, index) = cumulus_catalog::parse_id(id).or_raise(|| ErrorKind::Source)?;
        return write_out(format_args!("{file}\t{index}\n"));
    }

    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let client = config.oauth.as_ref().map(|oauth| {
        OAuthClient::drive(&oauth.client_id, &oauth.client_secret, &oauth.redirect_url)
    });
    let mut registry = SourceRegistry::new();
    register_drive(&mut registry, client, config.drive.options(), CodecRegistry::with_defaults())
        .or_raise(|| ErrorKind::Source)?;

    if let Command::Sources = &cli.command {
        return sources(&registry);
    }

    let token = token::load(cli.token_file.as_deref(), cli.token.as_deref()).await?;
    let source = registry.create(DRIVE, &[], token).or_raise(|| ErrorKind::Source)?;
    let saved = match &cli.catalog_file {
        Some(path) => saved::load(source.as_ref(), path).await?,
        None => None,
    };

    match cli.command {
        Command::List { json, skipped, refresh } => {
            let catalog = if refresh { source.refresh().await } else { source.list().await };
            let catalog = catalog.or_raise(|| ErrorKind::Source)?;
            list(&catalog, json, skipped)?;
        },
        Command::Info { id } => {
            source.list().await.or_raise(|| ErrorKind::Source)?;
            let info = source.info(&id).await.or_raise(|| ErrorKind::Source)?;
            let json = serde_json::to_string_pretty(&info).or_raise(|| ErrorKind::Output)?;
            write_out(format_args!("{json}\n"))?;
        },
        Command::Fetch { id, output } => fetch(source.as_ref(), &id, output).await?,
        Command::ParseId { .. } | Command::Sources => {},
    }

    if let (Some(path), Some(catalog)) = (&cli.catalog_file, source.catalog().await)
        && saved.as_ref().is_none_or(|saved| saved != &*catalog)
    {
        saved::save(path, &catalog).await?;
    }
    Ok(())
}

fn sources(registry: &SourceRegistry) -> Result<()> {
    for name in registry.names() {
        match registry.oauth(name) {
            Some(client) => {
                let json = serde_json::to_string(client).or_raise(|| ErrorKind::Output)?;
                write_out(format_args!("{name}\t{json}\n"))?;
            },
            None => write_out(format_args!("{name}\t(no OAuth client configured)\n"))?,
        }
    }
    Ok(())
}

fn list(catalog: &Catalog, json: bool, skipped: bool) -> Result<()> {
    if json {
        let json = serde_json::to_string_pretty(catalog.tracks()).or_raise(|| ErrorKind::Output)?;
        write_out(format_args!("{json}\n"))?;
    } else {
        let mut stdout = io::stdout().lock();
        for (id, info) in catalog.tracks() {
            writeln!(
                stdout,
                "{id}\t{}\t{}\t{}",
                info.title.as_deref().unwrap_or_default(),
                info.artist.as_deref().unwrap_or_default(),
                info.album.as_deref().unwrap_or_default(),
            )
            .or_raise(|| ErrorKind::Output)?;
        }
    }
    if skipped {
        for skip in catalog.skipped().iter().filter(|s| s.reason != SkipReason::Unrecognized) {
            match &skip.track {
                Some(track) => eprintln!("skipped track {track} ({}): {}", skip.title, skip.reason),
                None => eprintln!("skipped {} ({}): {}", skip.file, skip.title, skip.reason),
            }
        }
    }
    tracing::info!(tracks = catalog.len(), files = catalog.files().len(), "Listed catalog");
    Ok(())
}

async fn fetch(source: &dyn Source, id: &str, output: Option<PathBuf>) -> Result<()> {
    let song = source.get_song(id).await.or_raise(|| ErrorKind::Source)?;
    let stream = song.open().await.or_raise(|| ErrorKind::Source)?;
    let length = stream.file.length;
    let mut reader = stream.file.reader;
    let written = tokio::task::spawn_blocking(move || -> io::Result<u64> {
        match output {
            Some(path) => io::copy(&mut reader, &mut std::fs::File::create(path)?),
            None => io::copy(&mut reader, &mut io::stdout().lock()),
        }
    })
    .await
    .or_raise(|| ErrorKind::Output)?
    .or_raise(|| ErrorKind::Output)?;
    if written != length {
        tracing::warn!(written, length, "Download size differs from the declared size");
    }
    Ok(())
}

fn write_out(args: std::fmt::Arguments<'_>) -> Result<()> {
    io::stdout().lock().write_fmt(args).or_raise(|| ErrorKind::Output)
}

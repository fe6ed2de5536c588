//! Douyu stream resolver CLI
//!
//! Prints the playable streams of a Douyu room or video, best quality first.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use douyu_resolver::{logging, weight, DouyuResolver, ResolverConfig};
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "douyu-resolve", version, about = "Resolve Douyu URLs into playable streams")]
struct Args {
    /// Room or video URL, e.g. https://www.douyu.com/288016?cdn=tct
    url: String,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "DOUYU_CONFIG")]
    config: Option<String>,

    /// Cookie for logged-in on-demand access, e.g. "acf_auth=..."
    #[arg(long)]
    http_cookie: Option<String>,

    /// Directory holding the Node.js signer scripts
    #[arg(long)]
    signer_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the resolution as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let mut config = ResolverConfig::load(args.config.as_deref())?;
    if let Some(cookie) = args.http_cookie {
        config.http_cookie = Some(cookie);
    }
    if let Some(dir) = args.signer_dir {
        config.signer.script_dir = dir;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        anyhow::bail!("Configuration validation failed with {} error(s)", errors.len());
    }

    logging::init_logging(&config.logging)?;

    let resolver = DouyuResolver::new(&config)?;
    let mut resolution = match resolver.resolve(&args.url).await {
        Ok(resolution) => resolution,
        Err(e) => {
            error!("{e}");
            if let Some(hint) = e.remediation() {
                eprintln!("{hint}");
            }
            return Ok(ExitCode::FAILURE);
        }
    };
    weight::sort_best_first(&mut resolution.streams);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(reason) = &resolution.unavailable {
        println!("{}: {reason}", resolution.channel);
        return Ok(ExitCode::SUCCESS);
    }
    if resolution.streams.is_empty() {
        println!("{}: no playable streams found", resolution.channel);
        return Ok(ExitCode::FAILURE);
    }

    let best = weight::best(&resolution.streams).map(|s| s.quality.clone());
    for stream in &resolution.streams {
        let marker = if best.as_deref() == Some(stream.quality.as_str()) { " (best)" } else { "" };
        println!("{}{marker}\t{:?}\t{}", stream.quality, stream.transport, stream.endpoint);
    }
    Ok(ExitCode::SUCCESS)
}

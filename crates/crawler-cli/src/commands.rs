//! Command execution.

use anyhow::{Context, Result};
use crawler_core::{
    BoostableBoss, BoostableBosses, BoostableBossesArgs, BoostableBossesParser, CrawlerConfig,
    Error, PacedRateLimiter, ParseOptions, Parser,
};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands, FetchArgs, OutputFormat};

/// Resolve the configuration once: file, then environment, then flags.
pub fn resolve_config(cli: &Cli) -> Result<CrawlerConfig> {
    let mut config = match &cli.config {
        Some(path) => CrawlerConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CrawlerConfig::load()?,
    };

    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(retries) = cli.command.args().retries {
        config.retries = retries;
    }
    config.validate()?;
    Ok(config)
}

/// Each run starts with an empty cache, so every lookup goes to the origin.
fn parse_options(config: &CrawlerConfig, args: &FetchArgs) -> ParseOptions {
    let mut opts = ParseOptions::default()
        .with_retries(config.retries)
        .disallow_cached_responses();
    if !args.no_rate_limit {
        if let Some(interval) = config.rate_limit_interval() {
            opts = opts.with_rate_limiter(Arc::new(PacedRateLimiter::new(interval)));
        }
    }
    opts
}

pub async fn execute(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let parser = BoostableBossesParser::new(&config)?;
    let args = cli.command.args();
    let opts = parse_options(&config, args);

    tracing::debug!("Fetching {}", parser.url());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = tokio::select! {
        result = parser.parse(&cancel, BoostableBossesArgs, opts) => result,
        () = cancel.cancelled() => Err(Error::Canceled),
    };
    interrupt.abort();
    let bosses = result?;

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::Bosses(_) => write_bosses(&mut stdout, &bosses, args)?,
        Commands::Boosted(_) => write_boosted(&mut stdout, &bosses.boosted, args)?,
    }
    stdout.flush()?;
    Ok(())
}

fn write_bosses(out: &mut impl Write, bosses: &BoostableBosses, args: &FetchArgs) -> Result<()> {
    match args.format {
        OutputFormat::Json => write_json(out, bosses, args.pretty),
        OutputFormat::Text => {
            for boss in &bosses.bosses {
                let marker = if boss.is_boosted { '*' } else { ' ' };
                writeln!(out, "{marker} {}\t{}", boss.name, boss.image_url)?;
            }
            Ok(())
        },
    }
}

fn write_boosted(out: &mut impl Write, boss: &BoostableBoss, args: &FetchArgs) -> Result<()> {
    match args.format {
        OutputFormat::Json => write_json(out, boss, args.pretty),
        OutputFormat::Text => {
            writeln!(out, "{}\t{}", boss.name, boss.image_url)?;
            Ok(())
        },
    }
}

fn write_json<T: serde::Serialize>(out: &mut impl Write, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

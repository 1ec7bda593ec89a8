//! price-sync - replay a price feed against a provider-scoped price hub.

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgMatches, Command};
use price_sync::feed::LineFeed;
use price_sync::{FeedReplay, HubConfig, PriceSyncProvider};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, BufReader};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let config = resolve_config(&matches)?;

    match matches.get_one::<String>("feed") {
        Some(path) => {
            let path = PathBuf::from(path);
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("cannot open feed {}", path.display()))?;
            replay(config, BufReader::new(file)).await
        }
        None => replay(config, BufReader::new(tokio::io::stdin())).await,
    }
}

fn cli() -> Command {
    let command = Command::new("price-sync")
        .version(price_sync::VERSION)
        .about("Replay a price feed against a price broadcast hub")
        .long_about(
            "price-sync reads a script of set/get/watch/unwatch/flush/dump commands and \
             replays it against one provider session, printing reads, ignored writes and \
             the notifications delivered to watched resources.",
        )
        .arg(
            Arg::new("feed")
                .help("Path to the feed script (reads stdin when omitted)")
                .index(1),
        )
        .arg(
            Arg::new("epsilon")
                .long("epsilon")
                .help("Minimum price difference that counts as a change")
                .value_parser(value_parser!(f64)),
        );

    #[cfg(feature = "config")]
    let command = command.arg(
        Arg::new("config")
            .long("config")
            .help("Path to a TOML configuration file")
            .value_parser(value_parser!(PathBuf)),
    );

    command
}

fn resolve_config(matches: &ArgMatches) -> Result<HubConfig> {
    #[cfg(feature = "config")]
    let config = match matches
        .get_one::<PathBuf>("config")
        .cloned()
        .or_else(HubConfig::default_path)
    {
        Some(path) => HubConfig::load(&path)?,
        None => HubConfig::default(),
    };
    #[cfg(not(feature = "config"))]
    let config = HubConfig::default();

    match matches.get_one::<f64>("epsilon") {
        Some(epsilon) => Ok(config.with_epsilon(*epsilon)?),
        None => Ok(config),
    }
}

async fn replay<R>(config: HubConfig, reader: R) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
{
    let provider = PriceSyncProvider::mount(config)?;
    let mut feed = LineFeed::new(reader);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let summary = FeedReplay::new()
        .run(&provider, &mut feed, &mut out)
        .await
        .context("feed replay failed")?;
    provider.unmount().await?;

    log::info!(
        "{} command(s), {} change(s), {} ignored, {} notification(s)",
        summary.commands,
        summary.changes,
        summary.ignored,
        summary.notifications
    );
    Ok(())
}

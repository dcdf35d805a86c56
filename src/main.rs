use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gluon_census_exporter::{
    config::{self, Config},
    fetch::HttpFetcher,
    pipeline::Census,
    probe, server, sink,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "GLUON_CENSUS_CONFIG", default_value = "config/Default.toml")]
    config: String,

    /// Legacy communities.json to add to the configured communities
    #[arg(long, env = "GLUON_CENSUS_COMMUNITIES")]
    communities: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the census once and write the exposition file (default)
    Run {
        /// Output file (overrides config)
        outfile: Option<String>,
    },

    /// Serve the census over HTTP and refresh it periodically
    Serve {
        /// Port to listen on for metrics
        #[arg(short, long, env = "EXPORTER_PORT")]
        port: Option<u16>,

        /// Address to bind to
        #[arg(short, long, env = "EXPORTER_ADDR")]
        addr: Option<String>,
    },

    /// Check whether endpoints serve nodes.json or only meshviewer.json
    Probe {
        /// Write the suggested endpoints as communities.json to this path
        #[arg(long)]
        write: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Gluon Census Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;
    if let Some(path) = &args.communities {
        config
            .add_communities_file(path)
            .with_context(|| format!("Failed to load communities file {}", path))?;
    }
    config.validate()?;

    info!(
        "Configuration loaded: {} communities",
        config.communities.len()
    );

    match args.command.unwrap_or(Command::Run { outfile: None }) {
        Command::Run { outfile } => run_once(&config, outfile).await,
        Command::Serve { port, addr } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(addr) = addr {
                config.server.addr = addr;
            }

            if let Err(e) = server::start(config).await {
                error!("Server error: {}", e);
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Probe { write } => probe_endpoints(&config, write).await,
    }
}

async fn run_once(config: &Config, outfile: Option<String>) -> Result<()> {
    let outfile = outfile.unwrap_or_else(|| config.census.output.clone());

    let report = Census::from_config(config)?
        .run(&config.communities)
        .await;
    report.log_summary();

    // Leave the previous file in place
    let rendered = match report.render() {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("Failed to render census: {}", e);
            std::process::exit(1);
        }
    };

    sink::write_atomic(&outfile, &rendered)
        .with_context(|| format!("Failed to write {}", outfile))?;
    info!("Wrote census to {}", outfile);

    Ok(())
}

async fn probe_endpoints(config: &Config, write: Option<String>) -> Result<()> {
    let fetcher = HttpFetcher::new(&config.http)?;
    let results = probe::probe(&fetcher, &config.communities).await;

    for result in &results {
        println!(
            "{}\t{}\t{}",
            result.community_id,
            result.status.as_str(),
            result.suggested
        );
    }

    if let Some(path) = write {
        let updated = probe::rewrite_legacy(&config.communities, &results);
        if updated.is_empty() {
            warn!("No communities were loaded from a communities.json, not writing {}", path);
            return Ok(());
        }
        sink::write_atomic(&path, &config::legacy_communities_json(&updated)?)
            .with_context(|| format!("Failed to write {}", path))?;
        info!("Wrote {} communities to {}", updated.len(), path);
    }

    Ok(())
}

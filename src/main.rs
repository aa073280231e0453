// QSAN to Zabbix - storage appliance monitoring adapter
//
// Scrapes a QSAN appliance's web management console and renders the result
// for Zabbix: trap lines for zabbix_sender on the stats methods, low-level
// discovery JSON on the discovery methods. One invocation runs one method;
// cron provides the schedule and zabbix_sender ships the output.
//
// # Usage
// qsan-zabbix --method <method> --host <appliance> [--username u] [--password p]
//             [--zhost name] [--generation auto|sanos3|sanos4] [--timeout secs]
//
// Example:
// qsan-zabbix --method stats:all --host 192.168.1.50 --zhost san-01 \
//     | zabbix_sender -z zabbix.lan -i -

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qsan_zabbix::config::{Config, GenerationMode, Method};
use qsan_zabbix::output;
use qsan_zabbix::scrape::Appliance;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "QSAN storage to Zabbix monitoring adapter")]
struct Cli {
    /// Operation to run: discovery:volumes, discovery:disks, discovery:ports,
    /// stats:volumes, stats:disks, stats:storage or stats:all
    #[arg(long)]
    method: String,

    /// Appliance host name, IP address, or full http(s) URL
    #[arg(long)]
    host: String,

    /// Management-console account
    #[arg(long, default_value = "user")]
    username: String,

    /// Management-console password
    #[arg(long, default_value = "1234")]
    password: String,

    /// Host name the Zabbix server knows the appliance by
    #[arg(long, default_value = "zabbix host undefined")]
    zhost: String,

    /// Firmware generation: auto, sanos3 or sanos4
    #[arg(long, default_value = "auto")]
    generation: GenerationMode,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

/// Application entry point
///
/// This function:
/// 1. Initializes logging (stderr only; stdout belongs to the output)
/// 2. Parses the command line and resolves the method
/// 3. Logs in to the appliance and runs discovery
/// 4. Renders the requested method into a buffer
/// 5. Copies the buffer to stdout once the whole run succeeded
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    info!("qsan-zabbix {} starting", env!("CARGO_PKG_VERSION"));

    // The method has to resolve before anything touches the network, so an
    // unknown method produces no session and no output.
    let method: Method = cli.method.parse()?;

    let config = Config {
        host: cli.host,
        username: cli.username,
        password: cli.password,
        zhost: cli.zhost,
        generation: cli.generation,
        timeout: Duration::from_secs(cli.timeout),
    };

    info!("Running {} against {}", method.label(), config.host);

    let mut appliance = Appliance::connect(&config)
        .await
        .with_context(|| format!("Connecting to appliance {}", config.host))?;

    // Rendering goes through a buffer: a method that fails halfway must not
    // leave a partial batch on stdout for the trap sender to pick up.
    let mut rendered = Vec::new();
    output::render_method(&mut appliance, method, &config.zhost, &mut rendered)
        .await
        .with_context(|| format!("Running {}", method.label()))?;

    io::stdout().write_all(&rendered)?;

    Ok(())
}

/// Initializes the logging subsystem
///
/// Logs are written to stderr because stdout carries the rendered output
/// that gets piped into zabbix_sender. Level defaults to INFO and can be
/// overridden with RUST_LOG.
///
/// # Examples
/// ```bash
/// RUST_LOG=debug qsan-zabbix ...  # Enable debug logging
/// RUST_LOG=warn qsan-zabbix ...   # Only warnings and errors
/// ```
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

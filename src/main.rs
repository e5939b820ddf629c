use anyhow::Result;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use carrierline::cli::{parse_args, print_help};
use carrierline::config::Config;
use carrierline::scenario::{self, ResolveScenario, SmsScenario};

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args();

    if args.help {
        print_help();
        return Ok(());
    }

    // Initialize logging
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "carrierline=info".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("carrierline v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  IMS retry ceiling: {}", config.max_ims_retries);
    info!("  SMS queue depth: {}", config.sms_queue_depth);

    if args.validate {
        info!("Validating configuration...");
        match config.validate() {
            Ok(()) => {
                info!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate()?;

    if let Some(path) = args.resolve {
        let scenario: ResolveScenario = scenario::load(Path::new(&path))?;
        let data = scenario.resolve(config.display_settings());
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if let Some(path) = args.simulate {
        let scenario: SmsScenario = scenario::load(Path::new(&path))?;
        let report = scenario
            .simulate(config.max_ims_retries, config.sms_queue_depth)
            .await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_help();
    Ok(())
}

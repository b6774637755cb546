use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use sqlchain_cli::{
    commands::{sample_chain, verify_hex, Kind},
    Config,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn, Level};

fn init_logging(level: Level, json: bool) {
    if json {
        tracing_subscriber::fmt().with_max_level(level).json().init();
    } else {
        tracing_subscriber::fmt().with_max_level(level).init();
    }
}

fn now_millis() -> Result<u64> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the UNIX epoch")?;
    u64::try_from(elapsed.as_millis()).context("Timestamp does not fit in u64")
}

fn main() {
    if let Err(err) = main_result() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn main_result() -> Result<()> {
    // Parse arguments
    let matches = Command::new("sqlchain-cli")
        .about("Produce and verify signed sqlchain messages.")
        .arg(Arg::new("config").long("config").required(true))
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Validate config and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Emit structured JSON logs")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("sample")
                .about("Sign a request, response and ack and print them as hex")
                .arg(
                    Arg::new("rows")
                        .long("rows")
                        .default_value("3")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("verify")
                .about("Decode a hex message and verify its chain")
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .required(true)
                        .value_parser(Kind::NAMES),
                )
                .arg(Arg::new("hex").long("hex").required(true)),
        )
        .get_matches();

    // Load config
    let config_file = matches
        .get_one::<String>("config")
        .context("Missing --config")?;
    let contents = std::fs::read_to_string(config_file)
        .with_context(|| format!("Could not read config file {config_file}"))?;
    let config: Config =
        serde_yaml::from_str(&contents).context("Could not parse config file")?;

    if matches.get_flag("dry-run") {
        println!("{:#?}", config.redacted_debug());
        let config = config.validate().context("Config is invalid")?;
        println!("  public_key: {:?}", config.public_key);
        println!("config ok");
        return Ok(());
    }

    let config = config.validate().context("Config is invalid")?;
    init_logging(config.log_level, matches.get_flag("json-logs"));
    info!(config = ?config, "loaded config file");
    if config.policy.bypass_signature {
        warn!("signature checks are bypassed");
    }

    match matches.subcommand() {
        Some(("sample", sub)) => {
            let rows = sub.get_one::<usize>("rows").copied().unwrap_or(3);
            let chain = sample_chain(&config, rows, now_millis()?).context("Signing failed")?;
            for (kind, hex) in chain.to_hex() {
                println!("{kind}: {hex}");
            }
        }
        Some(("verify", sub)) => {
            let kind: Kind = sub
                .get_one::<String>("kind")
                .context("Missing --kind")?
                .parse()?;
            let hex = sub.get_one::<String>("hex").context("Missing --hex")?;
            let summary = verify_hex(kind, hex, &config)?;
            println!("{summary}");
        }
        _ => anyhow::bail!("Expected a subcommand: sample or verify"),
    }
    Ok(())
}

use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("waf-rate-rule-provider")
        .about("CloudFormation custom resource provider for WAF rate-based rules")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("request")
                .long("request")
                .num_args(1)
                .value_name("PATH")
                .help("Read the custom resource request from a file instead of stdin"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
}

pub fn init_logging(level: Option<&str>) {
    // Explicit level wins, then RUST_LOG, then the provider's LOG_LEVEL, then info
    if let Some(lvl) = level {
        std::env::set_var("RUST_LOG", lvl);
    } else if std::env::var("RUST_LOG").is_err() {
        let fallback = std::env::var("LOG_LEVEL")
            .map(|l| l.to_lowercase())
            .unwrap_or_else(|_| "info".to_string());
        std::env::set_var("RUST_LOG", fallback);
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

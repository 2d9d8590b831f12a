mod cli;

use waf_rate_rule_provider::server;

#[tokio::main(flavor = "current_thread")] // one request per process, handled sequentially
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let request_path = matches.get_one::<String>("request").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("waf-rate-rule-provider {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    server::run(request_path.as_deref()).await
}

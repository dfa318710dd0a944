use clap::Parser;
use riskfuse::cli::{Cli, run};
use riskfuse::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);
    run(cli)
}

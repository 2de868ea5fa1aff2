// Entrypoint for the CLI application.
// - Keeps `main` small: snapshot the environment, parse arguments and hand
//   both to the relay together with the real stdin/stdout/stderr.
// - Every failure exits with status 1; clap's help and version exit 0.

use clap::Parser;
use gemini_relay::{
    cli::Cli,
    config::RelayConfig,
    relay::{self, StdinInput},
};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Quiet by default so stderr only carries the one-line diagnostic.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = RelayConfig::from_env();
    let code = relay::run(
        &cli,
        &config,
        StdinInput::from_process(),
        relay::connect_gemini,
        &mut std::io::stdout(),
        &mut std::io::stderr(),
    );
    ExitCode::from(code)
}

use clap::Parser;

use modelctl::adapter::inbound::cli::{self, command::Cli, diagnostic, output};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let json = cli.json;

    let code = match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if json {
                output::error_json(diagnostic::json_payload(&e));
            } else {
                eprintln!("{:?}", diagnostic::report(e));
            }
            1
        }
    };
    std::process::exit(code);
}

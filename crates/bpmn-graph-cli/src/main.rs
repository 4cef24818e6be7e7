//! bpmn-graph CLI - Query and edit BPMN element graphs

mod cli;

use clap::Parser;

fn main() {
    let cli_args = cli::Cli::parse();

    let mut app = match cli::BpmnGraphApp::from_cli(&cli_args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

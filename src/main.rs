use std::sync::Arc;

use tagmeter::config::{load_config, print_schema};
use tagmeter::startup;
use tagmeter::utils::logger::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::args().any(|arg| arg == "--schema") {
        print_schema();
        return Ok(());
    }

    let config = load_config();
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    startup::run(Arc::new(config)).await
}

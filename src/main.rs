use clap::Parser;
use craft_value_scanner::app::{self, App};
use craft_value_scanner::cli::{output, Cli, Commands, ConfigCommand};
use craft_value_scanner::config::Settings;
use craft_value_scanner::util::persistence;
use craft_value_scanner::util::version::{version_label, APP_NAME};
use tracing::{debug, error};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => match Settings::default_path() {
            Ok(path) => path,
            Err(e) => {
                output::error(&format!("Failed to locate config: {e}"));
                std::process::exit(1);
            }
        },
    };

    if let Commands::Config(ConfigCommand::Init(args)) = &cli.command {
        if let Err(e) = app::init_config(&config_path, args) {
            output::error(&format!("Failed to write config: {e}"));
            std::process::exit(1);
        }
        return;
    }

    let settings = match Settings::load(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load config {}: {e}", config_path.display());
            eprintln!("Run `craft-value-scanner config init --realm <slug>` to create one");
            std::process::exit(1);
        }
    };

    settings.logging.init();
    debug!(app = APP_NAME, version = %version_label(), "starting");

    let data_dir = cli.data_dir.unwrap_or_else(persistence::data_dir);
    let app = App::new(settings, config_path, data_dir);
    if let Err(e) = app.run(cli.command).await {
        error!(error = %e, "Fatal error");
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::path::Path;
use std::sync::Arc;

use daybook::{Config, Database, JournalService, Profile, cli::Cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A .env file may carry the remote url and key
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    // An explicit --config file is used as written, database path included
    let config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    }
    .with_env_overrides();

    logging::init_logging(&config.log_level);

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| eyre!("Database path contains invalid UTF-8"))?,
    )?;

    let journal = JournalService::from_config(&config, Arc::new(db), !cli.local_only)?;
    if journal.has_remote() {
        log::info!("Syncing with remote table store");
    }

    daybook::cli::run(cli.command, &journal).await?;

    Ok(())
}

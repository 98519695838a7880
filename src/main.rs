mod cli;

use readcomics::accounts::{AccountService, LogMailer, SignupForm};
use readcomics::catalog::CatalogService;
use readcomics::config::{self, Config};
use readcomics::images::{resolve_size, LocalStorage, StorageBackend, ThumbnailField};
use readcomics::instrument::Instrumentation;
use readcomics_db::pool::{init_pool, DbPool};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "readcomics=trace,readcomics_db=debug".to_string()
        } else {
            "readcomics=info,readcomics_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Check => check(config_path),
        Commands::Thumbnail { file, key } => thumbnail(config_path, &file, key),
        Commands::CreateUser {
            username,
            email,
            password,
        } => create_user(config_path, username, email, password),
        Commands::SetPhoto { username, file } => set_photo(config_path, &username, &file),
        Commands::DeletePhoto { username } => delete_photo(config_path, &username),
        Commands::Search { query, limit } => search(config_path, &query, limit),
        Commands::Reindex => reindex(config_path),
        Commands::Version => {
            println!("readcomics {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_pool(config: &Config) -> Result<DbPool> {
    let db_path = config.database.to_string_lossy();
    tracing::debug!("Opening database at {}", db_path);
    Ok(init_pool(&db_path)?)
}

fn storage(config: &Config) -> Arc<dyn StorageBackend> {
    Arc::new(LocalStorage::new(
        config.storage.media_root.clone(),
        config.storage.media_url.clone(),
    ))
}

fn account_service(config: &Config) -> Result<AccountService> {
    let service = AccountService::from_config(
        config,
        open_pool(config)?,
        storage(config),
        Arc::new(LogMailer),
    )
    .context("Invalid avatar field declaration")?;
    Ok(service)
}

fn check(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let messages = config::run_checks(&config);

    if messages.is_empty() {
        println!("System check identified no issues.");
        return Ok(());
    }

    println!("System check identified some issues:\n");
    for message in &messages {
        println!("  {}", message);
    }
    anyhow::bail!("System check identified {} issue(s)", messages.len())
}

fn thumbnail(config_path: Option<&Path>, file: &Path, key: Option<String>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let size = resolve_size(
        config.avatar.thumb_width.as_ref(),
        config.avatar.thumb_height.as_ref(),
    )
    .context("Invalid avatar field declaration")?;

    let data = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let key = match key {
        Some(key) => key,
        None => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Cannot derive a storage key from {:?}", file))?;
            format!("{}/{}", config.avatar.upload_prefix.trim_matches('/'), name)
        }
    };

    let field = ThumbnailField::new(storage(&config), size);
    let stored = field.write(&key, &data)?;

    println!("Original: {}", stored.url);
    println!(
        "Thumbnail: {} ({}x{})",
        stored.thumb_url, stored.thumb_width, stored.thumb_height
    );
    Ok(())
}

fn create_user(
    config_path: Option<&Path>,
    username: String,
    email: String,
    password: String,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let accounts = account_service(&config)?;

    let user = accounts.register(&SignupForm {
        username,
        email,
        password,
    })?;

    println!("Created user: {}", user.username);
    println!("Profile: {}", AccountService::redirect_target(&user));
    Ok(())
}

fn set_photo(config_path: Option<&Path>, username: &str, file: &Path) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let accounts = account_service(&config)?;

    let user = accounts.get_user(username)?;
    let data = std::fs::read(file).with_context(|| format!("Failed to read {:?}", file))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let url = accounts.change_photo(&user, filename, &data)?;
    let user = accounts.get_user(username)?;
    println!("Photo: {}", url);
    println!("Thumbnail: {}", accounts.image_thumb_url(&user));
    Ok(())
}

fn delete_photo(config_path: Option<&Path>, username: &str) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let accounts = account_service(&config)?;

    let user = accounts.get_user(username)?;
    let url = accounts.delete_photo(&user)?;
    println!("Photo removed, now showing {}", url);
    Ok(())
}

fn search(config_path: Option<&Path>, query: &str, limit: usize) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = CatalogService::new(open_pool(&config)?, Instrumentation::from_config(&config.logging));

    let hits = catalog.search(query, limit)?;
    if hits.is_empty() {
        println!("No results for {:?}", query);
        return Ok(());
    }

    for hit in &hits {
        let title = hit.title.lines().next().unwrap_or_default();
        println!("[{}] {} ({:.3})", hit.object_type, title, hit.rank);
        if !hit.description.is_empty() {
            println!("    {}", hit.description);
        }
    }
    Ok(())
}

fn reindex(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let catalog = CatalogService::new(open_pool(&config)?, Instrumentation::from_config(&config.logging));

    let count = catalog.reindex()?;
    println!("Indexed {} records", count);
    Ok(())
}

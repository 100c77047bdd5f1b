#![deny(warnings)]

use persistence::{default_sqlite_url, ensure_save_dir, SettingsAccessor, SqliteStore, SETTINGS_KEY};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| default_sqlite_url().to_string());
    ensure_save_dir(&url)?;
    let store = SqliteStore::connect(&url).await?;
    let settings = SettingsAccessor::new(store);
    // Seed default settings on a fresh database
    let config = settings.load().await;
    settings.save(&config).await?;
    println!("DB migrated at {url} ({SETTINGS_KEY} = {})", serde_json::to_string(&config)?);
    Ok(())
}

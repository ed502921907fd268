use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings.");
        println!("Set catalog.api_key or export TMDB_API_KEY before searching.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}

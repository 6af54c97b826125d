//! `shortsns config show|set`.

use std::path::Path;

use anyhow::Result;

use crate::config::ClientConfig;

pub fn show(client_config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(client_config_path)?;
    println!("config:    {}", client_config_path.display());
    println!("server:    {}", config.api_config().base_url);
    println!("page-size: {}", config.page_size);
    Ok(())
}

pub fn set(server: Option<&str>, page_size: Option<u32>, client_config_path: &Path) -> Result<()> {
    if server.is_none() && page_size.is_none() {
        anyhow::bail!("Nothing to set. Pass --server and/or --page-size.");
    }
    let mut config = ClientConfig::load(client_config_path)?;
    if let Some(server) = server {
        config.server = server.trim().to_string();
    }
    if let Some(page_size) = page_size {
        if page_size == 0 {
            anyhow::bail!("Page size must be at least 1.");
        }
        config.page_size = page_size;
    }
    config.save(client_config_path)?;
    println!("Saved {}.", client_config_path.display());
    Ok(())
}

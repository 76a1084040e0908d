//! `inlet onboard` — Write a default configuration file.

use inlet_config::InletConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let dir = InletConfig::config_dir();
    let path = dir.join("config.toml");

    if path.exists() {
        println!("  Config already exists: {}", path.display());
        return Ok(());
    }

    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, InletConfig::default_toml())?;

    println!("  Wrote default config: {}", path.display());
    println!();
    println!("  Set your endpoint and keys there, or via environment:");
    println!("    INLET_ENDPOINT, INLET_TASK_ENDPOINT");
    println!("    INLET_API_KEY, INLET_SEARCH_API_KEY");
    Ok(())
}

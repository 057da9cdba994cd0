use crate::config::generate::generate_starter_config;
use crate::config::user_config_path;
use std::fs;
use std::path::{Path, PathBuf};

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = user_config_path()
        .unwrap_or_else(|| PathBuf::from("/etc/clusterlog/config.yml"));
    write_config(&config_content, &config_path)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

fn write_config(config_content: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        return Err(format!(
            "config file already exists at {} (remove it first or use --stdout)",
            path.display()
        )
        .into());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("cannot create directory {}: {}", parent.display(), e))?;
    }

    fs::write(path, config_content)?;
    Ok(())
}

pub fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path.ok_or("no config file found, use --config to specify a path")?;

    println!("Validating config file: {}", path.display());
    let config = crate::config::load_config(&path)?;
    println!(
        "Config is valid: listen {}, batch capacity {}, min level {}",
        config.listen, config.batch.capacity, config.output.min_level
    );
    Ok(())
}

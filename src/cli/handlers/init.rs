use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io::atomic_write;

const CONFIG_TEMPLATE: &str = include_str!("../../templates/todoview.toml");

/// Fill in the access token from the environment when one is set
fn render_config(access_token: Option<&str>) -> String {
    match access_token {
        Some(token) if !token.trim().is_empty() => CONFIG_TEMPLATE.replacen(
            "access_token = \"\"",
            &format!("access_token = {:?}", token.trim()),
            1,
        ),
        _ => CONFIG_TEMPLATE.to_string(),
    }
}

pub fn cmd_init(args: InitArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if config_path.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )
        .into());
    }
    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let token = std::env::var("TDV_ACCESS_TOKEN").ok();
    atomic_write(config_path, render_config(token.as_deref()).as_bytes())?;

    println!("Wrote {}", config_path.display());
    if token.is_none() {
        eprintln!("Set [sync].access_token before running `tdv render`.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::TodoConfig;

    #[test]
    fn template_parses_with_defaults() {
        let config: TodoConfig = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.sync.sync_token, "*");
        assert_eq!(config.display.maximum_entries, 10);
        assert_eq!(config.display.sort_type, "todoist");
        assert!(config.entry.projects.is_empty());
    }

    #[test]
    fn token_is_filled_in() {
        let text = render_config(Some("abc"));
        let config: TodoConfig = toml::from_str(&text).unwrap();
        assert_eq!(config.sync.access_token, "abc");
        assert_eq!(render_config(Some("  ")), CONFIG_TEMPLATE);
    }
}

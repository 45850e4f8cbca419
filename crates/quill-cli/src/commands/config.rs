use anyhow::{Context, Result, bail};
use quill_core::config::QuillConfig;
use quill_infrastructure::ConfigService;

pub fn show(service: &ConfigService) -> Result<()> {
    let config = service
        .get_config()
        .with_context(|| format!("Failed to load {}", service.path().display()))?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}

pub fn path(service: &ConfigService) {
    println!("{}", service.path().display());
}

pub fn init(service: &ConfigService, force: bool) -> Result<()> {
    if service.path().exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            service.path().display()
        );
    }

    service
        .save(&QuillConfig::default())
        .with_context(|| format!("Failed to write {}", service.path().display()))?;
    println!("Wrote {}", service.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::with_path(dir.path().join("config.toml"));

        init(&service, false).unwrap();
        assert!(service.path().exists());
        assert!(init(&service, false).is_err());
        assert!(init(&service, true).is_ok());
        assert_eq!(service.get_config().unwrap(), QuillConfig::default());
    }
}

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Dataset root is set and at least one filter is listed
/// - Filter and directory names are single path components
/// - Tool timeout and refinement iterations are not 0
/// - The accepted suffix is a FITS file name suffix
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let dataset = &config.dataset;
    if dataset.root.is_none() {
        return Err(ConfigError::ValidationError(
            "dataset.root must be set".to_string(),
        ));
    }
    if dataset.filters.is_empty() {
        return Err(ConfigError::ValidationError(
            "dataset.filters must list at least one filter".to_string(),
        ));
    }
    for filter in &dataset.filters {
        check_component("dataset.filters", filter)?;
    }
    check_component("dataset.isr_dir", &dataset.isr_dir)?;
    check_component("dataset.reference_image", &dataset.reference_image)?;
    check_component("dataset.wcs_dir", &dataset.wcs_dir)?;
    check_component("dataset.accurate_dir", &dataset.accurate_dir)?;

    if config.tools.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tools.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.refine.iterations == 0 {
        return Err(ConfigError::ValidationError(
            "refine.iterations cannot be 0".to_string(),
        ));
    }
    if !config.refine.accepted_suffix.ends_with(".fits") {
        return Err(ConfigError::ValidationError(format!(
            "refine.accepted_suffix must end with .fits, got '{}'",
            config.refine.accepted_suffix
        )));
    }

    Ok(())
}

fn check_component(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\']) {
        return Err(ConfigError::ValidationError(format!(
            "{} entry '{}' must be a plain directory or file name",
            field, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.dataset.root = Some(PathBuf::from("/data/night1"));
        config.dataset.filters = vec!["B".to_string(), "V".to_string()];
        config
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_missing_root_fails() {
        let mut config = valid_config();
        config.dataset.root = None;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_no_filters_fails() {
        let mut config = valid_config();
        config.dataset.filters.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_filter_with_separator_fails() {
        let mut config = valid_config();
        config.dataset.filters.push("../R".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_values_fail() {
        let mut config = valid_config();
        config.tools.timeout_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = valid_config();
        config.refine.iterations = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_suffix() {
        let mut config = valid_config();
        config.refine.accepted_suffix = "w.fit".to_string();
        assert!(validate_config(&config).is_err());
    }
}

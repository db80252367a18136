//! Environment variable parsing utilities for configuration.

use crate::errors::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::paths;

/// Read `name`, returning `None` when it is unset.
pub fn read(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Parse environment variable value or return error if empty/whitespace.
pub fn parse_env_string(name: &str, value: &str) -> Result<String, Error> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{name} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Parse environment variable as a storage path, expanding `~`.
pub fn parse_env_path(name: &str, value: &str) -> Result<PathBuf, Error> {
    let value = parse_env_string(name, value)?;
    paths::resolve_storage_path(Path::new(&value))
}

/// Parse environment variable as a number. Range checks happen in validation.
pub fn parse_env_number<T>(name: &str, value: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = parse_env_string(name, value)?;
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {name} value: {e}")))
}

/// Parse environment variable as a boolean (`true/false`, `1/0`, `yes/no`, `on/off`).
pub fn parse_env_bool(name: &str, value: &str) -> Result<bool, Error> {
    match parse_env_string(name, value)?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!(
            "Invalid {name} value: {other:?} is not a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_string_empty() {
        let result = parse_env_string("TEST_VAR", "");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_string_whitespace() {
        let result = parse_env_string("TEST_VAR", "   ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_string_valid() {
        let result = parse_env_string("TEST_VAR", "valid");
        assert_eq!(result.unwrap(), "valid");
    }

    #[test]
    fn test_parse_env_float_invalid() {
        let result = parse_env_number::<f64>("TEST_FLOAT", "invalid");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_float_valid() {
        let result = parse_env_number::<f64>("TEST_FLOAT", " 0.5 ");
        assert_eq!(result.unwrap(), 0.5);
    }

    #[test]
    fn test_parse_env_usize_negative() {
        let result = parse_env_number::<usize>("TEST_SIZE", "-3");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_parse_env_path_rejects_traversal() {
        assert!(matches!(
            parse_env_path("MUISTI_STORAGE_PATH", "/data/../etc"),
            Err(Error::Config(_))
        ));
        assert_eq!(
            parse_env_path("MUISTI_STORAGE_PATH", "/data/muisti").unwrap(),
            PathBuf::from("/data/muisti")
        );
    }

    #[test]
    fn test_parse_env_bool_variants() {
        assert!(parse_env_bool("B", "TRUE").unwrap());
        assert!(parse_env_bool("B", "1").unwrap());
        assert!(!parse_env_bool("B", "off").unwrap());
        assert!(matches!(parse_env_bool("B", "maybe"), Err(Error::Config(_))));
    }
}

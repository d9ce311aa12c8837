//! Request DTOs for the key-value API
//!
//! Defines the query parameters accepted on `/api/data`.

use serde::Deserialize;

use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::{CacheError, Result};

/// Query parameters for `/api/data`
///
/// # Fields
/// - `key`: The key to operate on (all methods)
/// - `val`: The value to store (POST and PUT only)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataParams {
    /// The key
    #[serde(default)]
    pub key: Option<String>,
    /// The value to store
    #[serde(default)]
    pub val: Option<String>,
}

impl DataParams {
    /// Extracts a validated key for reads and deletes.
    pub fn into_key(self) -> Result<String> {
        require_key(self.key)
    }

    /// Extracts a validated key and value for upserts.
    pub fn into_upsert(self) -> Result<(String, String)> {
        let DataParams { key, val } = self;
        let value =
            val.ok_or_else(|| CacheError::InvalidRequest("Missing 'val' parameter".to_string()))?;
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "Value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }
        let key = require_key(key)?;
        Ok((key, value))
    }
}

fn require_key(key: Option<String>) -> Result<String> {
    let key =
        key.ok_or_else(|| CacheError::InvalidRequest("Missing 'key' parameter".to_string()))?;
    validate_key(&key)?;
    Ok(key)
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(key: Option<&str>, val: Option<&str>) -> DataParams {
        DataParams {
            key: key.map(str::to_string),
            val: val.map(str::to_string),
        }
    }

    #[test]
    fn test_data_params_deserialize() {
        let json = r#"{"key": "test", "val": "hello"}"#;
        let req: DataParams = serde_json::from_str(json).unwrap();
        assert_eq!(req.key.as_deref(), Some("test"));
        assert_eq!(req.val.as_deref(), Some("hello"));
    }

    #[test]
    fn test_data_params_missing_fields() {
        let req: DataParams = serde_json::from_str("{}").unwrap();
        assert!(req.key.is_none());
        assert!(req.val.is_none());
    }

    #[test]
    fn test_into_key_valid() {
        assert_eq!(params(Some("k"), None).into_key().unwrap(), "k");
    }

    #[test]
    fn test_into_key_rejects_missing_and_empty() {
        assert!(matches!(
            params(None, None).into_key(),
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(matches!(
            params(Some(""), None).into_key(),
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_into_key_rejects_long_key() {
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);
        assert!(params(Some(&long_key), None).into_key().is_err());
    }

    #[test]
    fn test_into_upsert() {
        let (key, value) = params(Some("k"), Some("v")).into_upsert().unwrap();
        assert_eq!(key, "k");
        assert_eq!(value, "v");

        // Empty values are allowed
        assert!(params(Some("k"), Some("")).into_upsert().is_ok());
    }

    #[test]
    fn test_into_upsert_requires_value() {
        assert!(matches!(
            params(Some("k"), None).into_upsert(),
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_into_upsert_keeps_value_at_size_limit() {
        let value = "x".repeat(MAX_VALUE_SIZE);
        let (_, stored) = params(Some("k"), Some(&value)).into_upsert().unwrap();
        assert_eq!(stored.len(), MAX_VALUE_SIZE);
    }

    #[test]
    fn test_into_upsert_requires_key() {
        assert!(matches!(
            params(None, Some("v")).into_upsert(),
            Err(CacheError::InvalidRequest(msg)) if msg.contains("'key'")
        ));
    }

    #[test]
    fn test_into_upsert_rejects_large_value() {
        let large_value = "x".repeat(MAX_VALUE_SIZE + 1);
        assert!(params(Some("k"), Some(&large_value)).into_upsert().is_err());
    }
}

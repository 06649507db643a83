//! Named extension metadata, and additional metadata fields.
//!
//! The chunk grid, the chunk key encoding and each codec of [`ArrayMetadata`](crate::array::ArrayMetadata) are described by a [`Metadata`]:
//! a name, and an optional JSON object configuring it.
//! Written to JSON, metadata without a configuration is just its name.
//!
//! ```json
//! "crc32c"
//! ```
//! ```json
//! {"name": "gzip", "configuration": {"level": 5}}
//! ```
//!
//! [`AdditionalFields`] collects unrecognised top level fields of array metadata so they can be validated.

use derive_more::From;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Configuration metadata.
pub type MetadataConfiguration = serde_json::Map<String, serde_json::Value>;

/// Metadata with a name and optional configuration.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug)]
#[serde(from = "MetadataRepr", into = "MetadataRepr")]
pub struct Metadata {
    name: String,
    configuration: Option<MetadataConfiguration>,
}

/// The two JSON forms of [`Metadata`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MetadataRepr {
    Name(String),
    Object(MetadataObject),
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct MetadataObject {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    configuration: Option<MetadataConfiguration>,
}

impl From<MetadataRepr> for Metadata {
    fn from(repr: MetadataRepr) -> Self {
        match repr {
            MetadataRepr::Name(name) => Self {
                name,
                configuration: None,
            },
            MetadataRepr::Object(MetadataObject {
                name,
                configuration,
            }) => Self {
                name,
                configuration,
            },
        }
    }
}

impl From<Metadata> for MetadataRepr {
    fn from(metadata: Metadata) -> Self {
        match metadata.configuration {
            None => Self::Name(metadata.name),
            configuration => Self::Object(MetadataObject {
                name: metadata.name,
                configuration,
            }),
        }
    }
}

impl core::fmt::Display for Metadata {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)?;
        if let Some(configuration) = &self.configuration {
            write!(f, " {}", serde_json::Value::Object(configuration.clone()))?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for Metadata {
    type Error = serde_json::Error;

    fn try_from(json: &str) -> Result<Self, Self::Error> {
        serde_json::from_str(json)
    }
}

impl Metadata {
    /// Create metadata named `name` without a configuration.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            configuration: None,
        }
    }

    /// Create metadata named `name` with `configuration`.
    #[must_use]
    pub fn new_with_configuration(name: &str, configuration: MetadataConfiguration) -> Self {
        Self {
            name: name.to_string(),
            configuration: Some(configuration),
        }
    }

    /// Create metadata named `name` with `configuration` serialised as its configuration.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if `configuration` does not serialise to a JSON object.
    pub fn new_with_serializable_configuration<TConfiguration: Serialize>(
        name: &str,
        configuration: &TConfiguration,
    ) -> Result<Self, serde_json::Error> {
        let serde_json::Value::Object(configuration) = serde_json::to_value(configuration)? else {
            return Err(serde::ser::Error::custom("configuration is not a JSON object"));
        };
        Ok(Self::new_with_configuration(name, configuration))
    }

    /// Deserialise the configuration as a `TConfiguration`. A missing configuration is an empty object.
    ///
    /// # Errors
    /// Returns [`serde_json::Error`] if the configuration does not match `TConfiguration`.
    pub fn to_configuration<TConfiguration: DeserializeOwned>(
        &self,
    ) -> Result<TConfiguration, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(
            self.configuration.clone().unwrap_or_default(),
        ))
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn configuration(&self) -> Option<&MetadataConfiguration> {
        self.configuration.as_ref()
    }

    /// Returns true if there is no configuration or it is empty.
    #[must_use]
    pub fn configuration_is_none_or_empty(&self) -> bool {
        self.configuration
            .as_ref()
            .map_or(true, serde_json::Map::is_empty)
    }
}

/// An additional metadata field that must be understood.
#[derive(Debug, Error)]
#[error("unsupported additional field {name} with value {value}")]
pub struct UnsupportedAdditionalFieldError {
    name: String,
    value: serde_json::Value,
}

impl UnsupportedAdditionalFieldError {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field value.
    #[must_use]
    pub const fn value(&self) -> &serde_json::Value {
        &self.value
    }
}

/// Unrecognised top level fields of array or group metadata.
#[derive(Serialize, Deserialize, Clone, Eq, PartialEq, Debug, Default, From)]
pub struct AdditionalFields(serde_json::Map<String, serde_json::Value>);

fn may_ignore(value: &serde_json::Value) -> bool {
    value
        .get("must_understand")
        .and_then(serde_json::Value::as_bool)
        == Some(false)
}

impl AdditionalFields {
    /// Check that every field may be ignored, logging a warning for each.
    ///
    /// A field may be ignored if it is an object with `"must_understand": false`.
    ///
    /// # Errors
    /// Returns an [`UnsupportedAdditionalFieldError`] for the first field that must be understood.
    pub fn validate(&self) -> Result<(), UnsupportedAdditionalFieldError> {
        if let Some((name, value)) = self.0.iter().find(|(_, value)| !may_ignore(value)) {
            return Err(UnsupportedAdditionalFieldError {
                name: name.clone(),
                value: value.clone(),
            });
        }
        for (name, value) in &self.0 {
            log::warn!("ignoring unrecognised metadata field {name}: {value}");
        }
        Ok(())
    }

    /// Returns the fields.
    #[must_use]
    pub const fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_forms() {
        let metadata = Metadata::try_from(r#""crc32c""#).unwrap();
        assert_eq!(metadata, Metadata::new("crc32c"));
        assert!(metadata.configuration_is_none_or_empty());
        assert_eq!(serde_json::to_string(&metadata).unwrap(), r#""crc32c""#);

        // An object without a configuration is written back as a name
        let metadata = Metadata::try_from(r#"{"name":"crc32c"}"#).unwrap();
        assert_eq!(serde_json::to_string(&metadata).unwrap(), r#""crc32c""#);

        let json = r#"{"name":"gzip","configuration":{"level":5}}"#;
        let metadata = Metadata::try_from(json).unwrap();
        assert_eq!(metadata.configuration().unwrap()["level"], 5);
        assert_eq!(serde_json::to_string(&metadata).unwrap(), json);
        assert_eq!(metadata.to_string(), r#"gzip {"level":5}"#);

        for invalid in [r#"{"name":"gzip","unknown":5}"#, "5", r#"{"configuration":{}}"#] {
            assert!(Metadata::try_from(invalid).is_err(), "{invalid}");
        }
    }

    #[test]
    fn metadata_configuration() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        #[serde(deny_unknown_fields)]
        struct Configuration {
            level: u32,
        }
        let metadata =
            Metadata::new_with_serializable_configuration("gzip", &Configuration { level: 1 })
                .unwrap();
        assert_eq!(
            metadata.to_configuration::<Configuration>().unwrap(),
            Configuration { level: 1 }
        );
        assert!(Metadata::new("gzip")
            .to_configuration::<Configuration>()
            .is_err());
        assert!(Metadata::new_with_serializable_configuration("gzip", &1).is_err());
    }

    #[test]
    fn additional_fields() {
        testing_logger::setup();
        let fields: AdditionalFields =
            serde_json::from_str(r#"{"ext": {"must_understand": false, "x": 1}}"#).unwrap();
        assert!(fields.validate().is_ok());
        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].body.contains("ext"));
        });

        for json in [r#"{"ext": {"must_understand": true}}"#, r#"{"ext": 1}"#] {
            let fields: AdditionalFields = serde_json::from_str(json).unwrap();
            let err = fields.validate().unwrap_err();
            assert_eq!(err.name(), "ext");
        }
    }
}

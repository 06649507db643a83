//! Registries of named constructors.
//!
//! Chunk grids, chunk key encodings and codecs appear in array metadata as a [`Metadata`] entry: a name plus an optional configuration.
//! Each implementation registers a [`Plugin`] under its name with [`inventory::submit!`].
//! Opening an array looks the name up in the registry of the matching kind and hands the entry to the plugin's constructor.

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::metadata::Metadata;

/// Signature of the constructor of a plugin.
type CreateFn<TPlugin> = fn(metadata: &Metadata) -> Result<TPlugin, PluginCreateError>;

/// A named constructor producing a `TPlugin` from its metadata entry.
pub struct Plugin<TPlugin> {
    identifier: &'static str,
    create_fn: CreateFn<TPlugin>,
}

/// A metadata entry whose configuration the named plugin rejected.
#[derive(Debug, Error)]
#[error("{plugin_type} {identifier} rejected configuration {metadata}")]
pub struct PluginMetadataInvalidError {
    identifier: &'static str,
    plugin_type: &'static str,
    metadata: Box<Metadata>,
}

impl PluginMetadataInvalidError {
    /// Report that the `plugin_type` plugin `identifier` rejected `metadata`.
    #[must_use]
    pub fn new(identifier: &'static str, plugin_type: &'static str, metadata: Metadata) -> Self {
        Self {
            identifier,
            plugin_type,
            metadata: Box::new(metadata),
        }
    }
}

/// A failure to construct a plugin from metadata.
#[derive(Error, Debug)]
pub enum PluginCreateError {
    /// Nothing is registered under the name.
    #[error("{plugin_type} {name} is not supported")]
    Unsupported {
        /// The name in the metadata.
        name: String,
        /// The registry searched, e.g. `codec`.
        plugin_type: &'static str,
    },
    /// The plugin rejected the configuration.
    #[error(transparent)]
    MetadataInvalid(#[from] PluginMetadataInvalidError),
    /// The configuration parsed but describes something the plugin cannot build.
    #[error("{_0}")]
    Other(String),
}

impl<TPlugin> Plugin<TPlugin> {
    /// Register `create_fn` under `identifier`.
    pub const fn new(identifier: &'static str, create_fn: CreateFn<TPlugin>) -> Self {
        Self {
            identifier,
            create_fn,
        }
    }

    /// Run the constructor on `metadata`.
    ///
    /// # Errors
    /// Returns the error of the constructor.
    pub fn create(&self, metadata: &Metadata) -> Result<TPlugin, PluginCreateError> {
        (self.create_fn)(metadata)
    }

    /// The name the plugin is registered under.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        self.identifier
    }
}

/// Parse the configuration of `metadata` for the `plugin_type` plugin `identifier`.
///
/// # Errors
/// Returns [`PluginMetadataInvalidError`] if the configuration does not parse as `TConfiguration`.
pub fn plugin_configuration<TConfiguration: DeserializeOwned>(
    identifier: &'static str,
    plugin_type: &'static str,
    metadata: &Metadata,
) -> Result<TConfiguration, PluginMetadataInvalidError> {
    metadata.to_configuration().map_err(|err| {
        log::debug!("{plugin_type} {identifier}: {err}");
        PluginMetadataInvalidError::new(identifier, plugin_type, metadata.clone())
    })
}

/// Construct a `TPlugin` with the plugin registered under the name of `metadata`.
///
/// # Errors
/// Returns [`PluginCreateError::Unsupported`] if no plugin has the name, otherwise the error of its constructor.
pub fn try_create_from_registry<TPlugin: 'static>(
    metadata: &Metadata,
    plugin_type: &'static str,
) -> Result<TPlugin, PluginCreateError>
where
    Plugin<TPlugin>: inventory::Collect,
{
    let plugin = inventory::iter::<Plugin<TPlugin>>
        .into_iter()
        .find(|plugin| plugin.identifier() == metadata.name())
        .ok_or_else(|| PluginCreateError::Unsupported {
            name: metadata.name().to_string(),
            plugin_type,
        })?;
    plugin.create(metadata)
}

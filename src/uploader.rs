//! Pluggable uploader capability and the destination registry.
//!
//! Every backend implements [`Uploader`]; a [`UploaderRegistry`] maps a
//! [`Destination`] to a factory closure over [`UploadersConfig`], replacing
//! reflection-driven service discovery with an explicit table.

// self
use crate::{
	_prelude::*,
	azure::SharedKeyCredential,
	dropbox::DropboxConfig,
	outcome::{ErrorSink, UploadOutcome},
};
#[cfg(feature = "reqwest")]
use crate::{
	azure::AzureBlobUploader,
	dropbox::{DropboxUploader, tidy_upload_path},
};

/// Supported upload destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
	/// Azure Blob storage container.
	AzureBlob,
	/// Dropbox account.
	Dropbox,
}
impl Destination {
	/// Returns a stable label suitable for configuration or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Destination::AzureBlob => "azure_blob",
			Destination::Dropbox => "dropbox",
		}
	}
}
impl Display for Destination {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Boxed `Send` future returned by [`Uploader::upload`].
pub type UploadFuture<'a> = Pin<Box<dyn Future<Output = Result<UploadOutcome>> + 'a + Send>>;

/// Common capability every backend implements.
///
/// Expected failures come back as `Ok` outcomes with `is_success` unset and
/// entries in [`Uploader::errors`]; `Err` is reserved for unexpected
/// collaborator faults. One instance runs one logical operation at a time;
/// concurrent uploads belong on separate instances.
pub trait Uploader
where
	Self: Send + Sync,
{
	/// Backend this uploader targets.
	fn destination(&self) -> Destination;

	/// Errors accumulated by the current operation.
	fn errors(&self) -> &ErrorSink;

	/// Uploads `content` under `file_name` and resolves to the outcome.
	fn upload<'a>(&'a self, content: &'a [u8], file_name: &'a str) -> UploadFuture<'a>;
}

/// Credential and behavior configuration for every known destination.
#[derive(Clone, Debug, Default)]
pub struct UploadersConfig {
	/// Azure Blob shared-key credential.
	pub azure: SharedKeyCredential,
	/// Dropbox OAuth credential and upload behavior.
	pub dropbox: DropboxConfig,
}

/// Predicate deciding whether a configuration can drive a destination.
pub type ConfigCheck = Box<dyn Fn(&UploadersConfig) -> bool + Send + Sync>;
/// Factory closure building a fresh uploader from configuration.
pub type UploaderFactory = Box<dyn Fn(&UploadersConfig) -> Box<dyn Uploader> + Send + Sync>;

/// Configuration check plus factory for one destination.
pub struct UploaderService {
	check: ConfigCheck,
	build: UploaderFactory,
}
impl UploaderService {
	/// Creates a service from a configuration predicate and a factory.
	pub fn new(
		check: impl 'static + Fn(&UploadersConfig) -> bool + Send + Sync,
		build: impl 'static + Fn(&UploadersConfig) -> Box<dyn Uploader> + Send + Sync,
	) -> Self {
		Self { check: Box::new(check), build: Box::new(build) }
	}

	/// Returns `true` when the configuration can drive this destination.
	pub fn is_configured(&self, config: &UploadersConfig) -> bool {
		(self.check)(config)
	}

	/// Builds a fresh uploader for one logical operation.
	pub fn create(&self, config: &UploadersConfig) -> Box<dyn Uploader> {
		(self.build)(config)
	}
}
impl Debug for UploaderService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("UploaderService(..)")
	}
}

/// Table mapping destinations to their services.
#[derive(Debug, Default)]
pub struct UploaderRegistry {
	services: HashMap<Destination, UploaderService>,
}
impl UploaderRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers (or replaces) the service for a destination.
	pub fn register(&mut self, destination: Destination, service: UploaderService) {
		self.services.insert(destination, service);
	}

	/// Looks up the service for a destination.
	pub fn service(&self, destination: Destination) -> Option<&UploaderService> {
		self.services.get(&destination)
	}

	/// Returns `true` when the destination is registered and configured.
	pub fn is_configured(&self, destination: Destination, config: &UploadersConfig) -> bool {
		self.service(destination).is_some_and(|service| service.is_configured(config))
	}

	/// Builds an uploader for the destination, when one is registered.
	pub fn create(
		&self,
		destination: Destination,
		config: &UploadersConfig,
	) -> Option<Box<dyn Uploader>> {
		self.service(destination).map(|service| service.create(config))
	}
}
#[cfg(feature = "reqwest")]
impl UploaderRegistry {
	/// Creates a registry with both built-in backends over the default
	/// reqwest transport.
	pub fn with_defaults() -> Self {
		let mut registry = Self::new();

		registry.register(
			Destination::AzureBlob,
			UploaderService::new(
				|config| {
					!config.azure.account_name.is_empty()
						&& !config.azure.access_key.is_empty()
						&& !config.azure.container.is_empty()
				},
				|config| Box::new(AzureBlobUploader::new(config.azure.clone())),
			),
		);
		registry.register(
			Destination::Dropbox,
			UploaderService::new(
				|config| config.dropbox.auth.is_valid(),
				|config| {
					let mut dropbox = config.dropbox.clone();

					dropbox.upload_path = tidy_upload_path(&dropbox.upload_path);

					Box::new(DropboxUploader::new(dropbox))
				},
			),
		);

		registry
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn destination_labels_are_stable() {
		assert_eq!(Destination::AzureBlob.as_str(), "azure_blob");
		assert_eq!(Destination::Dropbox.to_string(), "dropbox");
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn default_registry_knows_both_backends() {
		let registry = UploaderRegistry::with_defaults();
		let config = UploadersConfig::default();

		for destination in [Destination::AzureBlob, Destination::Dropbox] {
			assert!(registry.service(destination).is_some());
			assert!(!registry.is_configured(destination, &config));

			let uploader = registry
				.create(destination, &config)
				.expect("Registered destination should produce an uploader.");

			assert_eq!(uploader.destination(), destination);
		}
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn azure_configuration_check_requires_all_fields() {
		let registry = UploaderRegistry::with_defaults();
		let mut config = UploadersConfig {
			azure: SharedKeyCredential::new("acme", "a2V5", "captures"),
			..UploadersConfig::default()
		};

		assert!(registry.is_configured(Destination::AzureBlob, &config));

		config.azure.container.clear();

		assert!(!registry.is_configured(Destination::AzureBlob, &config));
	}
}

//! Azure Blob shared-key uploader: container creation, public ACL, block-blob PUT.
//!
//! Each upload runs up to three sequential signed stages. Container creation
//! treats HTTP 409 ("already exists") as success so repeated uploads against
//! the same container stay idempotent; a failed ACL stage is recorded but does
//! not block the blob PUT; any other container failure aborts before the blob
//! is sent. Every stage stamps its own `x-ms-date` at request-build time; a
//! clock more than 15 minutes off the service rejects the signature, which
//! surfaces as a recorded request failure and is never retried here.

pub mod signing;

// crates.io
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError},
	http::{HttpTransport, Method, RequestSpec},
	obs::{self, OpKind, OpOutcome, OpSpan},
	outcome::{ErrorSink, UploadOutcome},
	uploader::{Destination, UploadFuture, Uploader},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Fixed service API version stamped on every request.
const API_VERSION: &str = "2016-05-31";
/// RFC 1123 layout used for the `x-ms-date` header.
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
	"[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

#[cfg(feature = "reqwest")]
/// Azure uploader specialized for the crate's default reqwest transport.
pub type ReqwestAzureBlobUploader = AzureBlobUploader<ReqwestTransport>;

/// Shared-key credential for one storage account and container.
#[derive(Clone, Default)]
pub struct SharedKeyCredential {
	/// Storage account name.
	pub account_name: String,
	/// Base64-encoded account access key.
	pub access_key: String,
	/// Target container name.
	pub container: String,
	/// Service endpoint override; defaults to
	/// `https://{account}.blob.core.windows.net`.
	pub endpoint: Option<Url>,
}
impl SharedKeyCredential {
	/// Creates a credential for the production blob endpoint.
	pub fn new(
		account_name: impl Into<String>,
		access_key: impl Into<String>,
		container: impl Into<String>,
	) -> Self {
		Self {
			account_name: account_name.into(),
			access_key: access_key.into(),
			container: container.into(),
			endpoint: None,
		}
	}

	/// Overrides the service endpoint (integration tests, sovereign clouds).
	pub fn with_endpoint(mut self, endpoint: Url) -> Self {
		self.endpoint = Some(endpoint);

		self
	}
}
impl Debug for SharedKeyCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SharedKeyCredential")
			.field("account_name", &self.account_name)
			.field("access_key", &"<redacted>")
			.field("container", &self.container)
			.field("endpoint", &self.endpoint)
			.finish()
	}
}

/// Uploader that PUTs block blobs into a public container.
pub struct AzureBlobUploader<T>
where
	T: HttpTransport,
{
	credential: SharedKeyCredential,
	transport: Arc<T>,
	errors: ErrorSink,
	op_guard: AsyncMutex<()>,
}
impl<T> AzureBlobUploader<T>
where
	T: HttpTransport,
{
	/// Creates an uploader over a caller-provided transport.
	pub fn with_transport(credential: SharedKeyCredential, transport: impl Into<Arc<T>>) -> Self {
		Self {
			credential,
			transport: transport.into(),
			errors: ErrorSink::default(),
			op_guard: AsyncMutex::new(()),
		}
	}

	/// Validates the credential before any I/O, collecting one entry per
	/// problem instead of stopping at the first. Returns the decoded key only
	/// when every check passed.
	fn validate(&self) -> Option<Vec<u8>> {
		if self.credential.account_name.is_empty() {
			self.errors.push(ConfigError::MissingField { field: "Account Name" });
		}
		if self.credential.access_key.is_empty() {
			self.errors.push(ConfigError::MissingField { field: "Access key" });
		}
		if self.credential.container.is_empty() {
			self.errors.push(ConfigError::MissingField { field: "Container" });
		}

		let key = if self.credential.access_key.is_empty() {
			None
		} else {
			match signing::decode_access_key(&self.credential.access_key) {
				Ok(key) => Some(key),
				Err(source) => {
					self.errors.push(ConfigError::InvalidAccessKey { source });

					None
				},
			}
		};

		if self.errors.is_error() {
			return None;
		}

		key
	}

	fn endpoint(&self) -> Result<Url> {
		match &self.credential.endpoint {
			Some(endpoint) => Ok(endpoint.clone()),
			None => Url::parse(&format!(
				"https://{}.blob.core.windows.net",
				self.credential.account_name,
			))
			.map_err(|source| ConfigError::InvalidEndpoint { source }.into()),
		}
	}

	fn resource_url(&self, blob: Option<&str>, query: Option<&str>) -> Result<Url> {
		let endpoint = self.endpoint()?;
		let mut raw =
			format!("{}/{}", endpoint.as_str().trim_end_matches('/'), self.credential.container);

		if let Some(blob) = blob {
			raw.push('/');
			raw.push_str(blob);
		}
		if let Some(query) = query {
			raw.push('?');
			raw.push_str(query);
		}

		Url::parse(&raw).map_err(|source| ConfigError::InvalidEndpoint { source }.into())
	}

	fn request_date() -> Result<String> {
		OffsetDateTime::now_utc()
			.format(&HTTP_DATE)
			.map_err(|source| AuthError::DateFormat { source }.into())
	}

	/// Builds a signed PUT for one stage; `content_length` is `Some` only for
	/// the blob stage, matching the signature layout of the zero-body calls.
	fn signed_put(
		&self,
		key: &[u8],
		date: &str,
		extra_header: Option<(&'static str, &'static str)>,
		content_length: Option<u64>,
		blob: Option<&str>,
		query: &[(&str, &str)],
	) -> Result<RequestSpec> {
		let query_string = query
			.iter()
			.map(|(param, value)| format!("{param}={value}"))
			.collect::<Vec<_>>()
			.join("&");
		let url = self.resource_url(blob, (!query.is_empty()).then_some(query_string.as_str()))?;
		let mut header_pairs = vec![("x-ms-date", date), ("x-ms-version", API_VERSION)];

		if let Some((name, value)) = extra_header {
			header_pairs.push((name, value));
		}

		let canonical_headers = signing::canonicalized_headers(&header_pairs);
		let canonical_resource = signing::canonicalized_resource(
			&self.credential.account_name,
			&self.credential.container,
			blob,
			query,
		);
		let string_to_sign =
			signing::string_to_sign("PUT", content_length, &canonical_headers, &canonical_resource);
		let signature = signing::sign(&string_to_sign, key);
		let mut request = RequestSpec::new(Method::Put, url).header(
			"Authorization",
			signing::authorization(&self.credential.account_name, &signature),
		);

		for (name, value) in header_pairs {
			request = request.header(name, value);
		}
		if content_length.is_none() {
			// The two zero-body requests still advertise an explicit zero.
			request = request.header("Content-Length", "0");
		}

		Ok(request)
	}

	/// Stage one: PUT `?restype=container`. 2xx and 409 both proceed; any
	/// other result aborts the upload.
	async fn ensure_container(&self, key: &[u8]) -> Result<bool> {
		let date = Self::request_date()?;
		let request = self.signed_put(key, &date, None, None, None, &[("restype", "container")])?;

		match self.transport.dispatch(request).await {
			Ok(response) if response.is_success() || response.is_conflict() => Ok(true),
			Ok(response) => {
				self.errors
					.push(format!("Container creation failed with HTTP status {}.", response.status));
				self.errors.push("Upload to Azure storage failed.");

				Ok(false)
			},
			Err(err) => {
				self.errors.push(err);
				self.errors.push("Upload to Azure storage failed.");

				Ok(false)
			},
		}
	}

	/// Stage two: PUT `?restype=container&comp=acl` opening the container for
	/// anonymous reads. Failures are recorded but the blob PUT still runs.
	async fn set_container_acl(&self, key: &[u8]) -> Result<()> {
		let date = Self::request_date()?;
		let request = self.signed_put(
			key,
			&date,
			Some(("x-ms-blob-public-access", "container")),
			None,
			None,
			&[("restype", "container"), ("comp", "acl")],
		)?;

		match self.transport.dispatch(request).await {
			Ok(response) if response.is_success() => {},
			Ok(_) | Err(_) =>
				self.errors.push("There was an issue with setting ACL on the container."),
		}

		Ok(())
	}

	/// Stage three: PUT the blob itself with the body length in the signature.
	async fn put_blob(&self, key: &[u8], content: &[u8], file_name: &str) -> Result<UploadOutcome> {
		let date = Self::request_date()?;
		let request = self
			.signed_put(
				key,
				&date,
				Some(("x-ms-blob-type", "BlockBlob")),
				Some(content.len() as u64),
				Some(file_name),
				&[],
			)?
			.content_type("application/octet-stream")
			.body(content.to_vec());
		let url = request.url.clone();

		match self.transport.dispatch(request).await {
			Ok(response) if response.is_success() =>
				Ok(UploadOutcome::success(url).with_raw_response(response.text())),
			Ok(response) => {
				self.errors.push("Upload failed.");

				Ok(UploadOutcome::failure().with_raw_response(response.text()))
			},
			Err(err) => {
				self.errors.push(err);
				self.errors.push("Upload failed.");

				Ok(UploadOutcome::failure())
			},
		}
	}

	async fn upload_inner(&self, content: &[u8], file_name: &str) -> Result<UploadOutcome> {
		let Some(key) = self.validate() else {
			return Ok(UploadOutcome::failure());
		};

		if !self.ensure_container(&key).await? {
			return Ok(UploadOutcome::failure());
		}

		self.set_container_acl(&key).await?;
		self.put_blob(&key, content, file_name).await
	}
}
#[cfg(feature = "reqwest")]
impl AzureBlobUploader<ReqwestTransport> {
	/// Creates an uploader backed by the crate's default reqwest transport.
	pub fn new(credential: SharedKeyCredential) -> Self {
		Self::with_transport(credential, ReqwestTransport::default())
	}
}
impl<T> Uploader for AzureBlobUploader<T>
where
	T: HttpTransport,
{
	fn destination(&self) -> Destination {
		Destination::AzureBlob
	}

	fn errors(&self) -> &ErrorSink {
		&self.errors
	}

	fn upload<'a>(&'a self, content: &'a [u8], file_name: &'a str) -> UploadFuture<'a> {
		Box::pin(async move {
			let _operation = self.op_guard.lock().await;
			let span = OpSpan::new(OpKind::Upload, "azure_blob");

			obs::record_op_outcome(OpKind::Upload, OpOutcome::Attempt);

			let result = span.instrument(self.upload_inner(content, file_name)).await;

			match &result {
				Ok(outcome) if outcome.is_success =>
					obs::record_op_outcome(OpKind::Upload, OpOutcome::Success),
				_ => obs::record_op_outcome(OpKind::Upload, OpOutcome::Failure),
			}

			result
		})
	}
}
impl<T> Debug for AzureBlobUploader<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AzureBlobUploader").field("credential", &self.credential).finish()
	}
}

//! Dropbox uploader: bearer-authenticated JSON operations, share links, and
//! deterministic public-folder URLs.
//!
//! Binary transfers go to the content host with the JSON side-channel in the
//! `Dropbox-API-Arg` header; everything else POSTs a small JSON body to the
//! api host. Absent or undecodable responses surface as `None` plus a sink
//! entry, never a panic.

pub mod model;
pub mod session;

// std
use std::io::Write;
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError, DecodeError, TransportError, ValidationError},
	http::{HttpTransport, Method, RequestSpec, static_url},
	obs::{self, OpKind, OpOutcome, OpSpan},
	outcome::{EarlyUrlSink, ErrorSink, UploadOutcome},
	uploader::{Destination, UploadFuture, Uploader},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use model::{DropboxAccount, DropboxLinkMetadata, DropboxMetadata};
use session::{OAuth2Info, OAuth2Session, SessionEndpoints};

const API_VERSION: &str = "2";
const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
/// Content-endpoint upload ceiling in bytes; larger payloads are rejected
/// before any network call.
const UPLOAD_SIZE_LIMIT: u64 = 150_000_000;
const URL_PUBLIC_DIRECT: &str = "https://dl.dropboxusercontent.com/u";
const URL_SHARE_DIRECT: &str = "https://dl.dropboxusercontent.com/s";

#[cfg(feature = "reqwest")]
/// Dropbox uploader specialized for the crate's default reqwest transport.
pub type ReqwestDropboxUploader = DropboxUploader<ReqwestTransport>;

/// Share-URL flavor requested for uploads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShareUrlType {
	/// Provider-default share URL.
	#[default]
	Default,
	/// Behaves as [`ShareUrlType::Default`]; the upstream short-URL option
	/// was never implemented.
	Shortened,
	/// Direct-content URL on `dl.dropboxusercontent.com`.
	Direct,
}

/// API host pair; override for integration tests.
#[derive(Clone, Debug)]
pub struct DropboxHosts {
	/// JSON RPC host.
	pub api: Url,
	/// Binary upload/download host.
	pub content: Url,
}
impl DropboxHosts {
	fn api_endpoint(&self, path: &str) -> Result<Url> {
		join_endpoint(&self.api, path)
	}

	fn content_endpoint(&self, path: &str) -> Result<Url> {
		join_endpoint(&self.content, path)
	}
}
impl Default for DropboxHosts {
	fn default() -> Self {
		Self {
			api: static_url("https://api.dropboxapi.com"),
			content: static_url("https://content.dropboxapi.com"),
		}
	}
}

fn join_endpoint(base: &Url, path: &str) -> Result<Url> {
	Url::parse(&format!("{}/{API_VERSION}/{path}", base.as_str().trim_end_matches('/')))
		.map_err(|source| ConfigError::InvalidEndpoint { source }.into())
}

/// Dropbox backend configuration.
#[derive(Clone, Debug, Default)]
pub struct DropboxConfig {
	/// OAuth credentials and token state.
	pub auth: OAuth2Info,
	/// Base directory uploads land in; see [`tidy_upload_path`].
	pub upload_path: String,
	/// Request a share link for every upload instead of deriving the
	/// public-folder URL.
	pub auto_share: bool,
	/// Share-URL flavor used when `auto_share` is set.
	pub share_url_type: ShareUrlType,
	/// Account user id used for public-folder URLs.
	pub user_id: Option<String>,
}

#[derive(Serialize)]
struct PathArg<'a> {
	path: &'a str,
}
#[derive(Serialize)]
struct UploadArg<'a> {
	path: &'a str,
	mode: &'a str,
	autorename: bool,
	mute: bool,
}
#[derive(Serialize)]
struct MetadataArg<'a> {
	path: &'a str,
	include_media_info: bool,
	include_deleted: bool,
	include_has_explicit_shared_members: bool,
}
#[derive(Serialize)]
struct RelocationArg<'a> {
	from_path: &'a str,
	to_path: &'a str,
}
#[derive(Serialize)]
struct ShareArg<'a> {
	path: &'a str,
	settings: ShareSettings<'a>,
}
#[derive(Serialize)]
struct ShareSettings<'a> {
	// Anyone who has received the link can access it. No login required.
	requested_visibility: &'a str,
}

/// Uploader that pushes files into a Dropbox account and shares them.
pub struct DropboxUploader<T>
where
	T: HttpTransport,
{
	session: OAuth2Session<T>,
	transport: Arc<T>,
	hosts: DropboxHosts,
	upload_path: String,
	auto_share: bool,
	share_url_type: ShareUrlType,
	user_id: Option<String>,
	early_url: Option<EarlyUrlSink>,
	errors: ErrorSink,
	op_guard: AsyncMutex<()>,
}
impl<T> DropboxUploader<T>
where
	T: HttpTransport,
{
	/// Creates an uploader against the production hosts.
	pub fn with_transport(config: DropboxConfig, transport: impl Into<Arc<T>>) -> Self {
		Self::with_endpoints(config, transport, DropboxHosts::default(), SessionEndpoints::default())
	}

	/// Creates an uploader against caller-provided hosts and OAuth endpoints.
	pub fn with_endpoints(
		config: DropboxConfig,
		transport: impl Into<Arc<T>>,
		hosts: DropboxHosts,
		endpoints: SessionEndpoints,
	) -> Self {
		let transport = transport.into();

		Self {
			session: OAuth2Session::with_endpoints(config.auth, Arc::clone(&transport), endpoints),
			transport,
			hosts,
			upload_path: config.upload_path,
			auto_share: config.auto_share,
			share_url_type: config.share_url_type,
			user_id: config.user_id,
			early_url: None,
			errors: ErrorSink::default(),
			op_guard: AsyncMutex::new(()),
		}
	}

	/// Subscribes a callback for the predicted URL emitted before the upload
	/// completes. Only fires when auto-share is off and the session is valid.
	pub fn with_early_url_sink(mut self, sink: EarlyUrlSink) -> Self {
		self.early_url = Some(sink);

		self
	}

	/// Returns the OAuth session backing this uploader.
	pub fn session(&self) -> &OAuth2Session<T> {
		&self.session
	}

	/// Uploads `content` as `{dir}/{file_name}`, overwriting silently.
	///
	/// On success the outcome carries either a share link (`auto_share`) or
	/// the deterministic public-folder URL derived from the entry's display
	/// path.
	pub async fn upload_file(
		&self,
		content: &[u8],
		dir: &str,
		file_name: &str,
		auto_share: bool,
		url_type: ShareUrlType,
	) -> Result<UploadOutcome> {
		let size = content.len() as u64;

		if size > UPLOAD_SIZE_LIMIT {
			self.errors.push(ValidationError::PayloadTooLarge { size });

			return Ok(UploadOutcome::failure());
		}

		let Some(authorization) = self.session.auth_header() else {
			self.errors.push(AuthError::MissingAccessToken);

			return Ok(UploadOutcome::failure());
		};
		let path = combine(&add_leading_slash(dir), file_name);
		let arg = UploadArg { path: &path, mode: "overwrite", autorename: false, mute: true };
		let api_arg = serde_json::to_string(&arg).map_err(|source| DecodeError::Encode { source })?;
		let url = self.hosts.content_endpoint("files/upload")?;
		let request = RequestSpec::new(Method::Post, url)
			.header("Authorization", &authorization)
			.header(API_ARG_HEADER, api_arg)
			.content_type(CONTENT_TYPE_OCTET_STREAM)
			.body(content.to_vec());
		let response = match self.transport.dispatch(request).await {
			Ok(response) => response,
			Err(err) => {
				self.errors.push(err);

				return Ok(UploadOutcome::failure());
			},
		};

		if !response.is_success() {
			self.errors.push(format!("Upload request failed with HTTP status {}.", response.status));

			return Ok(UploadOutcome::failure().with_raw_response(response.text()));
		}

		let raw = response.text();
		let Some(metadata) = self.decode::<DropboxMetadata>(&response.body) else {
			return Ok(UploadOutcome::failure().with_raw_response(raw));
		};
		let url = if auto_share {
			self.create_shareable_link(&metadata.path_display, url_type).await?
		} else {
			Some(self.derived_public_url(&metadata.path_display))
		};

		Ok(UploadOutcome { is_success: true, url, raw_response: Some(raw) })
	}

	/// Streams a file's content into `sink`; returns `true` on success.
	pub async fn download(&self, path: &str, sink: &mut (dyn Write + Send)) -> Result<bool> {
		if path.is_empty() || !self.session.is_valid() {
			return Ok(false);
		}

		let Some(authorization) = self.session.auth_header() else {
			return Ok(false);
		};
		let path = add_leading_slash(path);
		let arg = PathArg { path: &path };
		let api_arg = serde_json::to_string(&arg).map_err(|source| DecodeError::Encode { source })?;
		let url = self.hosts.content_endpoint("files/download")?;
		let span = OpSpan::new(OpKind::FileOp, "files/download");

		obs::record_op_outcome(OpKind::FileOp, OpOutcome::Attempt);

		let request = RequestSpec::new(Method::Post, url)
			.header("Authorization", &authorization)
			.header(API_ARG_HEADER, api_arg)
			.content_type(CONTENT_TYPE_JSON);

		match span.instrument(self.transport.dispatch(request)).await {
			Ok(response) if response.is_success() => {
				sink.write_all(&response.body).map_err(TransportError::from)?;

				obs::record_op_outcome(OpKind::FileOp, OpOutcome::Success);

				Ok(true)
			},
			Ok(response) => {
				self.errors
					.push(format!("Download request failed with HTTP status {}.", response.status));

				obs::record_op_outcome(OpKind::FileOp, OpOutcome::Failure);

				Ok(false)
			},
			Err(err) => {
				self.errors.push(err);

				obs::record_op_outcome(OpKind::FileOp, OpOutcome::Failure);

				Ok(false)
			},
		}
	}

	/// Fetches metadata for a path; `None` when the session is invalid or the
	/// response is absent/undecodable.
	pub async fn get_metadata(&self, path: &str) -> Result<Option<DropboxMetadata>> {
		if !self.session.is_valid() {
			return Ok(None);
		}

		let path = add_leading_slash(path);
		let arg = MetadataArg {
			path: &path,
			include_media_info: false,
			include_deleted: false,
			include_has_explicit_shared_members: false,
		};

		self.file_op("files/get_metadata", &arg).await
	}

	/// Returns `true` iff metadata exists and its tag is not "deleted"
	/// (case-insensitively).
	pub async fn is_exists(&self, path: &str) -> Result<bool> {
		Ok(self
			.get_metadata(path)
			.await?
			.is_some_and(|metadata| !metadata.tag.eq_ignore_ascii_case("deleted")))
	}

	/// Copies an entry.
	pub async fn copy_file(
		&self,
		from_path: &str,
		to_path: &str,
	) -> Result<Option<DropboxMetadata>> {
		if from_path.is_empty() || to_path.is_empty() || !self.session.is_valid() {
			return Ok(None);
		}

		let from_path = add_leading_slash(from_path);
		let to_path = add_leading_slash(to_path);
		let arg = RelocationArg { from_path: &from_path, to_path: &to_path };

		self.file_op("files/copy", &arg).await
	}

	/// Moves an entry.
	pub async fn move_file(
		&self,
		from_path: &str,
		to_path: &str,
	) -> Result<Option<DropboxMetadata>> {
		if from_path.is_empty() || to_path.is_empty() || !self.session.is_valid() {
			return Ok(None);
		}

		let from_path = add_leading_slash(from_path);
		let to_path = add_leading_slash(to_path);
		let arg = RelocationArg { from_path: &from_path, to_path: &to_path };

		self.file_op("files/move", &arg).await
	}

	/// Deletes an entry.
	pub async fn delete(&self, path: &str) -> Result<Option<DropboxMetadata>> {
		if path.is_empty() || !self.session.is_valid() {
			return Ok(None);
		}

		let path = add_leading_slash(path);
		let arg = PathArg { path: &path };

		self.file_op("files/delete", &arg).await
	}

	/// Creates a folder.
	pub async fn create_folder(&self, path: &str) -> Result<Option<DropboxMetadata>> {
		if path.is_empty() || !self.session.is_valid() {
			return Ok(None);
		}

		let path = add_leading_slash(path);
		let arg = PathArg { path: &path };

		self.file_op("files/create_folder", &arg).await
	}

	/// Fetches the account record for the session's token.
	pub async fn get_current_account(&self) -> Result<Option<DropboxAccount>> {
		let url = self.hosts.api_endpoint("users/get_current_account")?;

		self.post_json(url, &()).await
	}

	/// Requests a public share link for `path` and shapes it per `url_type`.
	///
	/// `Direct` rewrites the default `…dropbox.com/s/…` shape onto the
	/// direct-content host; a URL not matching that shape yields `None`.
	pub async fn create_shareable_link(
		&self,
		path: &str,
		url_type: ShareUrlType,
	) -> Result<Option<String>> {
		if path.is_empty() || !self.session.is_valid() {
			return Ok(None);
		}

		let span = OpSpan::new(OpKind::ShareLink, "create_shared_link");

		obs::record_op_outcome(OpKind::ShareLink, OpOutcome::Attempt);

		let path = add_leading_slash(path);
		let arg = ShareArg { path: &path, settings: ShareSettings { requested_visibility: "public" } };
		let url = self.hosts.api_endpoint("sharing/create_shared_link_with_settings")?;
		let link: Option<DropboxLinkMetadata> =
			span.instrument(self.post_json(url, &arg)).await?;
		let result = link.and_then(|link| match url_type {
			ShareUrlType::Direct => rewrite_direct_share_url(&link.url),
			ShareUrlType::Default | ShareUrlType::Shortened => Some(link.url),
		});

		match &result {
			Some(_) => obs::record_op_outcome(OpKind::ShareLink, OpOutcome::Success),
			None => obs::record_op_outcome(OpKind::ShareLink, OpOutcome::Failure),
		}

		Ok(result)
	}

	async fn file_op<A>(&self, endpoint: &'static str, arg: &A) -> Result<Option<DropboxMetadata>>
	where
		A: Serialize + ?Sized,
	{
		let span = OpSpan::new(OpKind::FileOp, endpoint);

		obs::record_op_outcome(OpKind::FileOp, OpOutcome::Attempt);

		let url = self.hosts.api_endpoint(endpoint)?;
		let result = span.instrument(self.post_json(url, arg)).await;

		match &result {
			Ok(Some(_)) => obs::record_op_outcome(OpKind::FileOp, OpOutcome::Success),
			_ => obs::record_op_outcome(OpKind::FileOp, OpOutcome::Failure),
		}

		result
	}

	async fn post_json<A, R>(&self, url: Url, arg: &A) -> Result<Option<R>>
	where
		A: Serialize + ?Sized,
		R: DeserializeOwned,
	{
		let Some(authorization) = self.session.auth_header() else {
			return Ok(None);
		};
		let body = serde_json::to_vec(arg).map_err(|source| DecodeError::Encode { source })?;
		let request = RequestSpec::new(Method::Post, url)
			.header("Authorization", &authorization)
			.content_type(CONTENT_TYPE_JSON)
			.body(body);
		let response = match self.transport.dispatch(request).await {
			Ok(response) => response,
			Err(err) => {
				self.errors.push(err);

				return Ok(None);
			},
		};

		if !response.is_success() {
			self.errors.push(format!("Request failed with HTTP status {}.", response.status));

			return Ok(None);
		}

		Ok(self.decode(&response.body))
	}

	fn decode<R>(&self, body: &[u8]) -> Option<R>
	where
		R: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(body);

		match serde_path_to_error::deserialize(&mut deserializer) {
			Ok(value) => Some(value),
			Err(source) => {
				self.errors.push(DecodeError::Json { source });

				None
			},
		}
	}

	fn derived_public_url(&self, path: &str) -> String {
		public_url(self.user_id.as_deref().unwrap_or_default(), path).to_string()
	}

	fn notify_early_url(&self, file_name: &str) {
		if self.auto_share || !self.session.is_valid() {
			return;
		}

		let Some(sink) = &self.early_url else {
			return;
		};
		let url = self.derived_public_url(&combine(&self.upload_path, file_name));

		sink(&url);
	}
}
#[cfg(feature = "reqwest")]
impl DropboxUploader<ReqwestTransport> {
	/// Creates an uploader backed by the crate's default reqwest transport.
	pub fn new(config: DropboxConfig) -> Self {
		Self::with_transport(config, ReqwestTransport::default())
	}
}
impl<T> Uploader for DropboxUploader<T>
where
	T: HttpTransport,
{
	fn destination(&self) -> Destination {
		Destination::Dropbox
	}

	fn errors(&self) -> &ErrorSink {
		&self.errors
	}

	fn upload<'a>(&'a self, content: &'a [u8], file_name: &'a str) -> UploadFuture<'a> {
		Box::pin(async move {
			let _operation = self.op_guard.lock().await;
			let span = OpSpan::new(OpKind::Upload, "dropbox");

			obs::record_op_outcome(OpKind::Upload, OpOutcome::Attempt);
			self.notify_early_url(file_name);

			let result = span
				.instrument(self.upload_file(
					content,
					&self.upload_path,
					file_name,
					self.auto_share,
					self.share_url_type,
				))
				.await;

			match &result {
				Ok(outcome) if outcome.is_success =>
					obs::record_op_outcome(OpKind::Upload, OpOutcome::Success),
				_ => obs::record_op_outcome(OpKind::Upload, OpOutcome::Failure),
			}

			result
		})
	}
}
impl<T> Debug for DropboxUploader<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DropboxUploader")
			.field("session", &self.session)
			.field("upload_path", &self.upload_path)
			.field("auto_share", &self.auto_share)
			.field("share_url_type", &self.share_url_type)
			.finish()
	}
}

/// Outcome of the deterministic public-folder URL derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicUrl {
	/// Shareable direct-content URL for a path under `Public/`.
	Shareable(String),
	/// The path lives outside `Public/`; displaying this variant yields a
	/// descriptive message instead of a URL.
	Private,
}
impl PublicUrl {
	/// Returns the shareable URL, when the path was eligible.
	pub fn shareable(&self) -> Option<&str> {
		match self {
			PublicUrl::Shareable(url) => Some(url),
			PublicUrl::Private => None,
		}
	}
}
impl Display for PublicUrl {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			PublicUrl::Shareable(url) => f.write_str(url),
			PublicUrl::Private => Display::fmt(&ValidationError::PrivateUploadPath, f),
		}
	}
}

/// Derives the deterministic public-folder URL for a path.
///
/// After trimming slashes the path must start with `Public/`
/// (case-insensitively); the remainder is percent-path-encoded onto
/// `https://dl.dropboxusercontent.com/u/{user_id}/`. Ineligible paths yield
/// [`PublicUrl::Private`].
pub fn public_url(user_id: &str, path: &str) -> PublicUrl {
	const PUBLIC_PREFIX: &str = "Public/";

	let trimmed = path.trim_matches('/');
	let Some(prefix) = trimmed.get(..PUBLIC_PREFIX.len()) else {
		return PublicUrl::Private;
	};

	if !prefix.eq_ignore_ascii_case(PUBLIC_PREFIX) {
		return PublicUrl::Private;
	}

	let remainder = &trimmed[PUBLIC_PREFIX.len()..];
	let Ok(base) = Url::parse(&format!("{URL_PUBLIC_DIRECT}/{user_id}/")) else {
		return PublicUrl::Private;
	};

	match base.join(remainder) {
		Ok(url) => PublicUrl::Shareable(url.to_string()),
		Err(_) => PublicUrl::Private,
	}
}

/// Rewrites a default share URL onto the direct-content host.
///
/// Accepts `http(s)://(www.)dropbox.com/s/<id>/<rest>` and returns
/// `https://dl.dropboxusercontent.com/s/<id>/<rest>`; any other shape yields
/// `None`.
pub fn rewrite_direct_share_url(url: &str) -> Option<String> {
	let parsed = Url::parse(url).ok()?;

	if !matches!(parsed.scheme(), "http" | "https") {
		return None;
	}
	if !matches!(parsed.host_str(), Some("dropbox.com" | "www.dropbox.com")) {
		return None;
	}

	let mut segments = parsed.path_segments()?;

	if segments.next() != Some("s") {
		return None;
	}

	let id = segments
		.next()
		.filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))?;
	let rest = segments.collect::<Vec<_>>().join("/");

	if rest.is_empty() {
		return None;
	}

	Some(format!("{URL_SHARE_DIRECT}/{id}/{rest}"))
}

/// Normalizes a configured base directory: trims whitespace, folds
/// backslashes to forward slashes, and appends exactly one trailing slash.
/// An empty input stays empty.
pub fn tidy_upload_path(upload_path: &str) -> String {
	if upload_path.is_empty() {
		return String::new();
	}

	format!("{}/", upload_path.trim().replace('\\', "/").trim_matches('/'))
}

fn add_leading_slash(path: &str) -> String {
	if path.starts_with('/') { path.to_owned() } else { format!("/{path}") }
}

fn combine(left: &str, right: &str) -> String {
	format!("{}/{}", left.trim_end_matches('/'), right.trim_start_matches('/'))
}

//! OAuth 2.0 session state and token grants for the Dropbox backend.
//!
//! The session owns the client credentials plus the current token and runs
//! the authorization-code and refresh-token grants through the `oauth2`
//! facade, dispatched over the crate's own [`HttpTransport`] by a small
//! adapter. A session is "valid" iff it holds a non-empty access token;
//! every authenticated Dropbox call checks that predicate first and no-ops
//! instead of issuing a doomed request.

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet,
	EndpointSet, HttpClientError, HttpRequest, HttpResponse, RefreshToken, RequestTokenError,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
	http::{
		StatusCode,
		header::{CONTENT_TYPE, HeaderName, HeaderValue},
	},
};
// self
use crate::{
	_prelude::*,
	error::{AuthError, ConfigError, DecodeError, TransportError},
	http::{HttpTransport, Method, RequestSpec, static_url},
	obs::{self, OpKind, OpOutcome, OpSpan},
};

const URL_WEB: &str = "https://www.dropbox.com";
const URL_API_BASE: &str = "https://api.dropboxapi.com";

type ConfiguredClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSecret(String);
impl AccessSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for AccessSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessSecret").field(&"<redacted>").finish()
	}
}
impl Display for AccessSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Decoded token-endpoint payload retained by the session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuth2Token {
	/// Bearer access token.
	pub access_token: AccessSecret,
	/// Refresh token, when the provider issued one.
	pub refresh_token: Option<AccessSecret>,
	/// Relative expiry reported by the token endpoint.
	pub expires_in: Option<Duration>,
}

/// Client credentials plus current token state for one account.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OAuth2Info {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	pub client_secret: String,
	/// Current token, once a grant succeeded.
	pub token: Option<OAuth2Token>,
}
impl OAuth2Info {
	/// Creates credentials with no token yet.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: client_secret.into(), token: None }
	}

	/// Returns `true` iff a non-empty access token is present.
	pub fn is_valid(&self) -> bool {
		self.token.as_ref().is_some_and(|token| !token.access_token.expose().is_empty())
	}
}

/// Authorization and token endpoints used by a session.
#[derive(Clone, Debug)]
pub struct SessionEndpoints {
	/// User-facing authorization page.
	pub authorize: Url,
	/// Token exchange endpoint.
	pub token: Url,
}
impl SessionEndpoints {
	/// Production Dropbox endpoints.
	pub fn dropbox() -> Self {
		Self {
			authorize: static_url(&format!("{URL_WEB}/oauth2/authorize")),
			token: static_url(&format!("{URL_API_BASE}/oauth2/token")),
		}
	}
}
impl Default for SessionEndpoints {
	fn default() -> Self {
		Self::dropbox()
	}
}

enum Grant<'a> {
	AuthorizationCode(&'a str),
	Refresh(&'a str),
}

/// Bearer-token session threading one account's OAuth state through calls.
///
/// The token field may be read and replaced across a single uploader's
/// successive calls; two concurrent operations must not share one session.
/// Give each its own, or serialize access externally.
pub struct OAuth2Session<T>
where
	T: HttpTransport,
{
	transport: Arc<T>,
	endpoints: SessionEndpoints,
	info: RwLock<OAuth2Info>,
}
impl<T> OAuth2Session<T>
where
	T: HttpTransport,
{
	/// Creates a session against the production endpoints.
	pub fn new(info: OAuth2Info, transport: impl Into<Arc<T>>) -> Self {
		Self::with_endpoints(info, transport, SessionEndpoints::default())
	}

	/// Creates a session against caller-provided endpoints.
	pub fn with_endpoints(
		info: OAuth2Info,
		transport: impl Into<Arc<T>>,
		endpoints: SessionEndpoints,
	) -> Self {
		Self { transport: transport.into(), endpoints, info: RwLock::new(info) }
	}

	/// Builds the user-facing authorization URL for the configured client.
	pub fn authorization_url(&self) -> Url {
		let mut url = self.endpoints.authorize.clone();

		url.query_pairs_mut()
			.append_pair("response_type", "code")
			.append_pair("client_id", &self.info.read().client_id);

		url
	}

	/// Returns `true` iff the session holds a non-empty access token.
	pub fn is_valid(&self) -> bool {
		self.info.read().is_valid()
	}

	/// Returns the `Authorization` header value for authenticated calls, or
	/// `None` while the session is invalid.
	pub fn auth_header(&self) -> Option<String> {
		let info = self.info.read();
		let token = info.token.as_ref()?;

		if token.access_token.expose().is_empty() {
			return None;
		}

		Some(format!("Bearer {}", token.access_token.expose()))
	}

	/// Returns a snapshot of the credential + token state.
	pub fn info(&self) -> OAuth2Info {
		self.info.read().clone()
	}

	/// Exchanges an authorization code for a token.
	///
	/// Returns `true` and stores the decoded token on success; any failure
	/// (network error, malformed JSON, empty access token) returns `false`
	/// and leaves prior token state unchanged.
	pub async fn exchange_code(&self, code: &str) -> bool {
		let span = OpSpan::new(OpKind::TokenExchange, "authorization_code");

		obs::record_op_outcome(OpKind::TokenExchange, OpOutcome::Attempt);

		match span.instrument(self.request_grant(Grant::AuthorizationCode(code))).await {
			Ok(token) => {
				self.info.write().token = Some(token);

				obs::record_op_outcome(OpKind::TokenExchange, OpOutcome::Success);

				true
			},
			Err(err) => {
				obs::record_op_outcome(OpKind::TokenExchange, OpOutcome::Failure);

				#[cfg(feature = "tracing")]
				tracing::debug!(error = %err, "authorization code exchange failed");
				#[cfg(not(feature = "tracing"))]
				let _ = err;

				false
			},
		}
	}

	/// Rotates the stored token via the refresh-token grant.
	///
	/// When the endpoint omits a replacement refresh token the previous one
	/// is kept, so a later rotation remains possible.
	pub async fn refresh(&self) -> Result<()> {
		let previous_refresh = self
			.info
			.read()
			.token
			.as_ref()
			.and_then(|token| token.refresh_token.clone())
			.ok_or(AuthError::MissingRefreshToken)?;
		let span = OpSpan::new(OpKind::TokenExchange, "refresh_token");

		obs::record_op_outcome(OpKind::TokenExchange, OpOutcome::Attempt);

		let result =
			span.instrument(self.request_grant(Grant::Refresh(previous_refresh.expose()))).await;

		match result {
			Ok(mut token) => {
				if token.refresh_token.is_none() {
					token.refresh_token = Some(previous_refresh);
				}

				self.info.write().token = Some(token);

				obs::record_op_outcome(OpKind::TokenExchange, OpOutcome::Success);

				Ok(())
			},
			Err(err) => {
				obs::record_op_outcome(OpKind::TokenExchange, OpOutcome::Failure);

				Err(err)
			},
		}
	}

	fn oauth_client(&self) -> Result<ConfiguredClient> {
		let (client_id, client_secret) = {
			let info = self.info.read();

			(info.client_id.clone(), info.client_secret.clone())
		};
		let auth_url = AuthUrl::new(self.endpoints.authorize.to_string())
			.map_err(|source| AuthError::InvalidEndpoint { source })?;
		let token_url = TokenUrl::new(self.endpoints.token.to_string())
			.map_err(|source| AuthError::InvalidEndpoint { source })?;

		// Dropbox expects client_secret_post credentials in the form body.
		Ok(BasicClient::new(ClientId::new(client_id))
			.set_client_secret(ClientSecret::new(client_secret))
			.set_auth_uri(auth_url)
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody))
	}

	async fn request_grant(&self, grant: Grant<'_>) -> Result<OAuth2Token> {
		let client = self.oauth_client()?;
		let handle = TransportHandle(Arc::clone(&self.transport));
		let response = match grant {
			Grant::AuthorizationCode(code) =>
				client
					.exchange_code(AuthorizationCode::new(code.to_owned()))
					.request_async(&handle)
					.await,
			Grant::Refresh(secret) =>
				client
					.exchange_refresh_token(&RefreshToken::new(secret.to_owned()))
					.request_async(&handle)
					.await,
		}
		.map_err(map_token_error)?;

		token_from_response(&response)
	}
}
impl<T> Debug for OAuth2Session<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let info = self.info.read();

		f.debug_struct("OAuth2Session")
			.field("client_id", &info.client_id)
			.field("token_set", &info.token.is_some())
			.finish()
	}
}

/// Adapter exposing an [`HttpTransport`] to the `oauth2` facade.
struct TransportHandle<T>(Arc<T>)
where
	T: HttpTransport;
impl<'c, T> AsyncHttpClient<'c> for TransportHandle<T>
where
	T: HttpTransport,
{
	type Error = HttpClientError<TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let transport = Arc::clone(&self.0);

		Box::pin(async move {
			let spec = into_request_spec(request)?;
			let response = transport.dispatch(spec).await.map_err(Box::new)?;
			let status = StatusCode::from_u16(response.status).map_err(|_| {
				HttpClientError::Other("Transport returned an invalid HTTP status code.".into())
			})?;
			let headers = response.headers;
			let mut response_new = HttpResponse::new(response.body);

			*response_new.status_mut() = status;

			for (name, value) in &headers {
				if let (Ok(name), Ok(value)) =
					(name.parse::<HeaderName>(), HeaderValue::from_str(value))
				{
					response_new.headers_mut().insert(name, value);
				}
			}

			Ok(response_new)
		})
	}
}

fn into_request_spec(request: HttpRequest) -> Result<RequestSpec, HttpClientError<TransportError>> {
	let method = match request.method().as_str() {
		"GET" => Method::Get,
		"POST" => Method::Post,
		"PUT" => Method::Put,
		"DELETE" => Method::Delete,
		other =>
			return Err(HttpClientError::Other(format!(
				"Transport does not support the {other} method."
			))),
	};
	let url = Url::parse(&request.uri().to_string()).map_err(|err| {
		HttpClientError::Other(format!("Token endpoint URI is not a valid URL: {err}."))
	})?;
	let mut spec = RequestSpec::new(method, url);

	for (name, value) in request.headers() {
		let Ok(value) = value.to_str() else {
			continue;
		};

		if name == &CONTENT_TYPE {
			spec = spec.content_type(value);
		} else {
			spec = spec.header(name.as_str(), value);
		}
	}

	let body = request.into_body();

	if !body.is_empty() {
		spec = spec.body(body);
	}

	Ok(spec)
}

fn token_from_response(response: &BasicTokenResponse) -> Result<OAuth2Token> {
	let access_token = response.access_token().secret().clone();

	if access_token.is_empty() {
		return Err(AuthError::EmptyAccessToken.into());
	}

	let refresh_token =
		response.refresh_token().map(|secret| AccessSecret::new(secret.secret().clone()));
	let expires_in = match response.expires_in() {
		Some(delta) => Some(Duration::seconds(
			i64::try_from(delta.as_secs()).map_err(|_| AuthError::ExpiresInOutOfRange)?,
		)),
		None => None,
	};

	Ok(OAuth2Token { access_token: AccessSecret::new(access_token), refresh_token, expires_in })
}

fn map_token_error(err: BasicRequestTokenError<HttpClientError<TransportError>>) -> Error {
	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => description.clone(),
				None => response.error().as_ref().to_owned(),
			};

			AuthError::TokenEndpoint { reason }.into()
		},
		RequestTokenError::Request(error) => match error {
			HttpClientError::Reqwest(inner) => Error::Transport(*inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => AuthError::TokenEndpoint { reason: message }.into(),
			_ => AuthError::TokenEndpoint {
				reason: "HTTP client error occurred while calling the token endpoint".into(),
			}
			.into(),
		},
		RequestTokenError::Parse(source, _body) => DecodeError::TokenResponse { source }.into(),
		RequestTokenError::Other(message) => AuthError::TokenEndpoint { reason: message }.into(),
	}
}

#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use updrop::{
	_preludet::*,
	dropbox::session::{AccessSecret, OAuth2Info, OAuth2Session, OAuth2Token, SessionEndpoints},
	error::{AuthError, Error},
	http::ReqwestTransport,
};

fn build_session(server: &MockServer, info: OAuth2Info) -> OAuth2Session<ReqwestTransport> {
	let endpoints = SessionEndpoints {
		authorize: Url::parse(&server.url("/oauth2/authorize"))
			.expect("Mock authorize endpoint should parse."),
		token: Url::parse(&server.url("/oauth2/token"))
			.expect("Mock token endpoint should parse."),
	};

	OAuth2Session::with_endpoints(info, test_reqwest_transport(), endpoints)
}

fn token(access: &str, refresh: Option<&str>) -> OAuth2Token {
	OAuth2Token {
		access_token: AccessSecret::new(access),
		refresh_token: refresh.map(AccessSecret::new),
		expires_in: None,
	}
}

#[tokio::test]
async fn code_exchange_stores_the_decoded_token() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"at-1\",\"token_type\":\"bearer\",\
				 \"refresh_token\":\"rt-1\",\"expires_in\":14400}",
			);
		})
		.await;
	let session = build_session(&server, OAuth2Info::new("client-id", "client-secret"));

	assert!(!session.is_valid());
	assert!(session.exchange_code("pasted-code").await);

	token_mock.assert_async().await;

	assert!(session.is_valid());
	assert_eq!(session.auth_header().as_deref(), Some("Bearer at-1"));

	let stored = session.info().token.expect("Exchange should have stored a token.");

	assert_eq!(stored.refresh_token.as_ref().map(AccessSecret::expose), Some("rt-1"));
	assert_eq!(stored.expires_in, Some(Duration::seconds(14400)));
}

#[tokio::test]
async fn rejected_grant_leaves_prior_state_unchanged() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let mut info = OAuth2Info::new("client-id", "client-secret");

	info.token = Some(token("prior-token", None));

	let session = build_session(&server, info);

	assert!(!session.exchange_code("stale-code").await);
	// The previously stored token survives the failed exchange.
	assert_eq!(session.auth_header().as_deref(), Some("Bearer prior-token"));
}

#[tokio::test]
async fn malformed_token_response_fails_the_exchange() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body("not-json");
		})
		.await;
	let session = build_session(&server, OAuth2Info::new("client-id", "client-secret"));

	assert!(!session.exchange_code("pasted-code").await);
	assert!(!session.is_valid());
}

#[tokio::test]
async fn empty_access_token_fails_the_exchange() {
	let server = MockServer::start_async().await;
	let _token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"\",\"token_type\":\"bearer\"}");
		})
		.await;
	let session = build_session(&server, OAuth2Info::new("client-id", "client-secret"));

	assert!(!session.exchange_code("pasted-code").await);
	assert!(!session.is_valid());
}

#[tokio::test]
async fn refresh_rotates_access_and_keeps_the_prior_refresh_secret() {
	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"at-2\",\"token_type\":\"bearer\"}");
		})
		.await;
	let mut info = OAuth2Info::new("client-id", "client-secret");

	info.token = Some(token("at-1", Some("rt-1")));

	let session = build_session(&server, info);

	session.refresh().await.expect("Refresh grant should succeed.");

	token_mock.assert_async().await;

	assert_eq!(session.auth_header().as_deref(), Some("Bearer at-2"));

	let stored = session.info().token.expect("Refresh should have stored a token.");

	// The endpoint omitted a replacement, so the old secret must survive.
	assert_eq!(stored.refresh_token.as_ref().map(AccessSecret::expose), Some("rt-1"));
}

#[tokio::test]
async fn refresh_without_a_refresh_token_is_an_auth_error() {
	let server = MockServer::start_async().await;
	// No mocks: the session must fail before reaching the endpoint.
	let mut info = OAuth2Info::new("client-id", "client-secret");

	info.token = Some(token("at-1", None));

	let session = build_session(&server, info);
	let err = session.refresh().await.expect_err("Refresh without a secret should fail.");

	assert!(matches!(err, Error::Auth(AuthError::MissingRefreshToken)));
	// Prior state is untouched.
	assert_eq!(session.auth_header().as_deref(), Some("Bearer at-1"));
}

#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use updrop::{
	_preludet::*,
	dropbox::{
		DropboxConfig, DropboxHosts, ShareUrlType,
		session::{AccessSecret, OAuth2Info, OAuth2Token, SessionEndpoints},
	},
	outcome::EarlyUrlSink,
	uploader::Uploader,
};

fn mock_hosts(server: &MockServer) -> DropboxHosts {
	let base = Url::parse(&server.base_url()).expect("Mock server base URL should parse.");

	DropboxHosts { api: base.clone(), content: base }
}

fn mock_endpoints(server: &MockServer) -> SessionEndpoints {
	SessionEndpoints {
		authorize: Url::parse(&server.url("/oauth2/authorize"))
			.expect("Mock authorize endpoint should parse."),
		token: Url::parse(&server.url("/oauth2/token"))
			.expect("Mock token endpoint should parse."),
	}
}

fn authed_config() -> DropboxConfig {
	let mut auth = OAuth2Info::new("client-id", "client-secret");

	auth.token = Some(OAuth2Token {
		access_token: AccessSecret::new("token-123"),
		refresh_token: None,
		expires_in: None,
	});

	DropboxConfig {
		auth,
		upload_path: "Public/captures/".into(),
		auto_share: false,
		share_url_type: ShareUrlType::Default,
		user_id: Some("42".into()),
	}
}

#[tokio::test]
async fn upload_derives_the_public_folder_url_and_notifies_early() {
	let server = MockServer::start_async().await;
	let upload_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/2/files/upload")
				.header("Authorization", "Bearer token-123")
				.header(
					"Dropbox-API-Arg",
					"{\"path\":\"/Public/captures/shot.png\",\"mode\":\"overwrite\",\
					 \"autorename\":false,\"mute\":true}",
				)
				.body("payload");
			then.status(200).header("content-type", "application/json").body(
				"{\".tag\":\"file\",\"name\":\"shot.png\",\
				 \"path_lower\":\"/public/captures/shot.png\",\
				 \"path_display\":\"/Public/captures/shot.png\",\"size\":7}",
			);
		})
		.await;
	let captured = Arc::new(Mutex::new(None::<String>));
	let sink_capture = Arc::clone(&captured);
	let early_sink: EarlyUrlSink = Arc::new(move |url: &str| {
		*sink_capture.lock() = Some(url.to_owned());
	});
	let uploader =
		build_dropbox_test_uploader(authed_config(), mock_hosts(&server), mock_endpoints(&server))
			.with_early_url_sink(early_sink);
	let outcome =
		uploader.upload(b"payload", "shot.png").await.expect("Dropbox upload should not fault.");

	upload_mock.assert_async().await;

	assert!(outcome.is_success);
	assert_eq!(
		outcome.url.as_deref(),
		Some("https://dl.dropboxusercontent.com/u/42/captures/shot.png"),
	);
	// The predicted URL fired before the upload and matches the final one.
	assert_eq!(
		captured.lock().as_deref(),
		Some("https://dl.dropboxusercontent.com/u/42/captures/shot.png"),
	);
	assert!(uploader.errors().is_empty());
}

#[tokio::test]
async fn auto_share_requests_a_link_and_rewrites_it_direct() {
	let server = MockServer::start_async().await;
	let upload_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/2/files/upload");
			then.status(200).header("content-type", "application/json").body(
				"{\".tag\":\"file\",\"path_display\":\"/Public/captures/shot.png\"}",
			);
		})
		.await;
	let share_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/2/sharing/create_shared_link_with_settings")
				.header("Authorization", "Bearer token-123")
				.body(
					"{\"path\":\"/Public/captures/shot.png\",\
					 \"settings\":{\"requested_visibility\":\"public\"}}",
				);
			then.status(200).header("content-type", "application/json").body(
				"{\".tag\":\"file\",\"url\":\"https://www.dropbox.com/s/abcd1234/shot.png\"}",
			);
		})
		.await;
	let config = DropboxConfig {
		auto_share: true,
		share_url_type: ShareUrlType::Direct,
		..authed_config()
	};
	let uploader =
		build_dropbox_test_uploader(config, mock_hosts(&server), mock_endpoints(&server));
	let outcome =
		uploader.upload(b"payload", "shot.png").await.expect("Dropbox upload should not fault.");

	upload_mock.assert_async().await;
	share_mock.assert_async().await;

	assert!(outcome.is_success);
	assert_eq!(
		outcome.url.as_deref(),
		Some("https://dl.dropboxusercontent.com/s/abcd1234/shot.png"),
	);
}

#[tokio::test]
async fn oversized_payload_is_rejected_without_io() {
	let server = MockServer::start_async().await;
	// No mocks: a stray request would 404 and grow the sink beyond the
	// single size-limit entry asserted below.
	let uploader =
		build_dropbox_test_uploader(authed_config(), mock_hosts(&server), mock_endpoints(&server));
	let content = vec![0_u8; 150_000_001];
	let outcome =
		uploader.upload(&content, "huge.bin").await.expect("Dropbox upload should not fault.");

	assert!(!outcome.is_success);
	assert_eq!(
		uploader.errors().entries(),
		vec!["There's a 150MB limit to uploads through the API.".to_owned()],
	);
}

#[tokio::test]
async fn private_upload_path_yields_the_descriptive_message() {
	let server = MockServer::start_async().await;
	let _upload_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/2/files/upload");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\".tag\":\"file\",\"path_display\":\"/captures/shot.png\"}");
		})
		.await;
	let config = DropboxConfig { upload_path: "captures/".into(), ..authed_config() };
	let uploader =
		build_dropbox_test_uploader(config, mock_hosts(&server), mock_endpoints(&server));
	let outcome =
		uploader.upload(b"payload", "shot.png").await.expect("Dropbox upload should not fault.");

	assert!(outcome.is_success);
	assert_eq!(
		outcome.url.as_deref(),
		Some("Upload path is private. Use \"Public\" folder to get public URL."),
	);
}

#[tokio::test]
async fn invalid_session_fails_fast_without_io() {
	let server = MockServer::start_async().await;
	let config = DropboxConfig { auth: OAuth2Info::new("client-id", "client-secret"), ..authed_config() };
	let uploader =
		build_dropbox_test_uploader(config, mock_hosts(&server), mock_endpoints(&server));
	let outcome =
		uploader.upload(b"payload", "shot.png").await.expect("Dropbox upload should not fault.");

	assert!(!outcome.is_success);
	assert_eq!(
		uploader.errors().entries(),
		vec!["Session does not hold a valid access token.".to_owned()],
	);
}

#[tokio::test]
async fn undecodable_upload_response_is_a_recorded_failure() {
	let server = MockServer::start_async().await;
	let _upload_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/2/files/upload");
			then.status(200).header("content-type", "application/json").body("not-json");
		})
		.await;
	let uploader =
		build_dropbox_test_uploader(authed_config(), mock_hosts(&server), mock_endpoints(&server));
	let outcome =
		uploader.upload(b"payload", "shot.png").await.expect("Dropbox upload should not fault.");

	assert!(!outcome.is_success);
	assert_eq!(outcome.raw_response.as_deref(), Some("not-json"));
	assert_eq!(
		uploader.errors().entries(),
		vec!["Response body could not be decoded.".to_owned()],
	);
}

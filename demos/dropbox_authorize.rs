//! Demonstrates the Dropbox backend against a mock service: authorization URL
//! construction, code exchange, an upload, and a direct share link rewrite.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use updrop::{
	dropbox::{
		DropboxConfig, DropboxHosts, DropboxUploader, ShareUrlType,
		session::{OAuth2Info, SessionEndpoints},
	},
	http::ReqwestTransport,
	reqwest::Client,
	uploader::Uploader,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":14400}",
			);
		})
		.await;
	let upload_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/2/files/upload");
			then.status(200).header("content-type", "application/json").body(
				"{\".tag\":\"file\",\"name\":\"shot.png\",\"path_display\":\"/captures/shot.png\"}",
			);
		})
		.await;
	let share_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/2/sharing/create_shared_link_with_settings");
			then.status(200).header("content-type", "application/json").body(
				"{\".tag\":\"file\",\"url\":\"https://www.dropbox.com/s/abcd1234/shot.png\"}",
			);
		})
		.await;
	let base = Url::parse(&server.base_url())?;
	let hosts = DropboxHosts { api: base.clone(), content: base };
	let endpoints = SessionEndpoints {
		authorize: Url::parse(&server.url("/oauth2/authorize"))?,
		token: Url::parse(&server.url("/oauth2/token"))?,
	};
	let config = DropboxConfig {
		auth: OAuth2Info::new("demo-client", "demo-secret"),
		upload_path: "captures/".into(),
		auto_share: true,
		share_url_type: ShareUrlType::Direct,
		user_id: None,
	};
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let uploader = DropboxUploader::with_endpoints(config, transport, hosts, endpoints);

	println!("Visit to authorize: {}.", uploader.session().authorization_url());

	// A real flow pastes the code the user copied from the authorize page.
	if !uploader.session().exchange_code("pasted-code").await {
		eprintln!("Code exchange failed.");

		return Ok(());
	}

	let outcome = uploader.upload(b"demo-payload", "shot.png").await?;

	if outcome.is_success {
		println!("Shared: {}.", outcome.url.unwrap_or_default());
	}
	for entry in uploader.errors().entries() {
		eprintln!("{entry}");
	}

	token_mock.assert_async().await;
	upload_mock.assert_async().await;
	share_mock.assert_async().await;

	Ok(())
}

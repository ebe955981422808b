//! Demonstrates the shared-key Azure Blob backend end to end against a mock
//! service: container creation, public ACL, and the signed block-blob PUT.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use updrop::{
	azure::{AzureBlobUploader, SharedKeyCredential},
	http::ReqwestTransport,
	reqwest::Client,
	uploader::Uploader,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	// Serves both the container-create and ACL stages; they share the path.
	let _container_mock = server
		.mock_async(|when, then| {
			when.method(PUT).path("/captures").query_param("restype", "container");
			then.status(201);
		})
		.await;
	let blob_mock = server
		.mock_async(|when, then| {
			when.method(PUT).path("/captures/shot.png").header("x-ms-blob-type", "BlockBlob");
			then.status(201);
		})
		.await;
	// base64 of a demo key; real account keys come from the portal.
	let credential = SharedKeyCredential::new("demo-account", "MDEyMzQ1Njc4OWFiY2RlZg==", "captures")
		.with_endpoint(Url::parse(&server.base_url())?);
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let uploader = AzureBlobUploader::with_transport(credential, transport);
	let outcome = uploader.upload(b"demo-payload", "shot.png").await?;

	if outcome.is_success {
		println!("Uploaded: {}.", outcome.url.unwrap_or_default());
	}
	for entry in uploader.errors().entries() {
		eprintln!("{entry}");
	}

	blob_mock.assert_async().await;

	Ok(())
}

//! Authenticated file uploads for capture tools—shared-key and OAuth 2.0
//! backends that turn a byte payload into a shareable URL.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod azure;
pub mod dropbox;
pub mod error;
pub mod http;
pub mod obs;
pub mod outcome;
pub mod uploader;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		azure::{AzureBlobUploader, ReqwestAzureBlobUploader, SharedKeyCredential},
		dropbox::{
			DropboxConfig, DropboxHosts, DropboxUploader, ReqwestDropboxUploader,
			session::SessionEndpoints,
		},
		http::ReqwestTransport,
	};

	/// Builds a reqwest transport that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_transport() -> ReqwestTransport {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestTransport::with_client(client)
	}

	/// Builds an Azure uploader over the insecure test transport; point the
	/// credential's endpoint at the mock server.
	pub fn build_azure_test_uploader(credential: SharedKeyCredential) -> ReqwestAzureBlobUploader {
		AzureBlobUploader::with_transport(credential, test_reqwest_transport())
	}

	/// Builds a Dropbox uploader over the insecure test transport with every
	/// endpoint pointed at the mock server.
	pub fn build_dropbox_test_uploader(
		config: DropboxConfig,
		hosts: DropboxHosts,
		endpoints: SessionEndpoints,
	) -> ReqwestDropboxUploader {
		DropboxUploader::with_endpoints(config, test_reqwest_transport(), hosts, endpoints)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _, tokio as _, updrop as _};

//! Shared-key canonicalization and HMAC-SHA256 request signing.
//!
//! Every function here is pure: identical inputs produce byte-identical
//! output, with no clock or randomness captured inside. The caller decodes
//! the account key up front (a malformed key is a configuration error raised
//! before this stage), so signing itself cannot fail.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Decodes the base64 account access key into raw key bytes.
pub fn decode_access_key(access_key: &str) -> Result<Vec<u8>, base64::DecodeError> {
	STANDARD.decode(access_key)
}

/// Builds the canonicalized header block: each `x-ms-*` header as
/// `name:value\n` with the name lowercased, sorted lexicographically by name.
pub fn canonicalized_headers(headers: &[(&str, &str)]) -> String {
	let mut sorted: Vec<_> =
		headers.iter().map(|(name, value)| (name.to_ascii_lowercase(), *value)).collect();

	sorted.sort();

	let mut buf = String::new();

	for (name, value) in sorted {
		buf.push_str(&name);
		buf.push(':');
		buf.push_str(value);
		buf.push('\n');
	}

	buf
}

/// Builds the canonicalized resource: `/{account}/{container}[/{blob}]`
/// followed by newline-joined `key:value` query pairs sorted by key.
pub fn canonicalized_resource(
	account: &str,
	container: &str,
	blob: Option<&str>,
	query: &[(&str, &str)],
) -> String {
	let mut buf = format!("/{account}/{container}");

	if let Some(blob) = blob {
		buf.push('/');
		buf.push_str(blob);
	}

	let mut pairs = query.to_vec();

	pairs.sort();

	for (key, value) in pairs {
		buf.push('\n');
		buf.push_str(key);
		buf.push(':');
		buf.push_str(value);
	}

	buf
}

/// Assembles the string-to-sign for a shared-key request.
///
/// The layout is the fixed twelve-field sequence: verb, Content-Encoding,
/// Content-Language, Content-Length, Content-MD5, Content-Type, Date,
/// If-Modified-Since, If-Match, If-None-Match, If-Unmodified-Since, Range.
/// Each field is newline-terminated, then the canonicalized headers and
/// resource follow with no extra separator. Only the verb and Content-Length
/// are ever populated
/// by this backend; the date travels in the `x-ms-date` header instead. The
/// zero-body container and ACL requests pass `None` so the Content-Length
/// field stays empty even though their request header carries an explicit 0.
pub fn string_to_sign(
	verb: &str,
	content_length: Option<u64>,
	canonicalized_headers: &str,
	canonicalized_resource: &str,
) -> String {
	let content_length = content_length.map(|len| len.to_string()).unwrap_or_default();
	let fields =
		[verb, "", "", content_length.as_str(), "", "", "", "", "", "", "", ""];
	let mut buf = fields.join("\n");

	buf.push('\n');
	buf.push_str(canonicalized_headers);
	buf.push_str(canonicalized_resource);

	buf
}

/// Computes the base64 HMAC-SHA256 signature of the string-to-sign.
pub fn sign(string_to_sign: &str, key: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");

	mac.update(string_to_sign.as_bytes());

	STANDARD.encode(mac.finalize().into_bytes())
}

/// Formats the `Authorization` header value for a signed request.
pub fn authorization(account: &str, signature: &str) -> String {
	format!("SharedKey {account}:{signature}")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const DATE: &str = "Wed, 01 Jan 2025 00:00:00 GMT";
	const VERSION: &str = "2016-05-31";
	// base64 of the 16 ASCII bytes `0123456789abcdef`.
	const KEY_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZg==";

	fn key() -> Vec<u8> {
		decode_access_key(KEY_B64).expect("Test key fixture should decode.")
	}

	#[test]
	fn header_block_sorts_and_lowercases() {
		let block = canonicalized_headers(&[
			("x-ms-version", VERSION),
			("X-Ms-Date", DATE),
			("x-ms-blob-type", "BlockBlob"),
		]);

		assert_eq!(
			block,
			format!("x-ms-blob-type:BlockBlob\nx-ms-date:{DATE}\nx-ms-version:{VERSION}\n"),
		);
	}

	#[test]
	fn resource_sorts_query_pairs_by_key() {
		let resource = canonicalized_resource(
			"acme",
			"captures",
			None,
			&[("restype", "container"), ("comp", "acl")],
		);

		assert_eq!(resource, "/acme/captures\ncomp:acl\nrestype:container");
	}

	#[test]
	fn string_to_sign_matches_blob_layout() {
		let headers = canonicalized_headers(&[
			("x-ms-blob-type", "BlockBlob"),
			("x-ms-date", DATE),
			("x-ms-version", VERSION),
		]);
		let resource = canonicalized_resource("acme", "captures", Some("shot.png"), &[]);
		let string_to_sign = string_to_sign("PUT", Some(4), &headers, &resource);

		assert_eq!(
			string_to_sign,
			format!(
				"PUT\n\n\n4\n\n\n\n\n\n\n\n\nx-ms-blob-type:BlockBlob\nx-ms-date:{DATE}\n\
				 x-ms-version:{VERSION}\n/acme/captures/shot.png",
			),
		);
	}

	#[test]
	fn string_to_sign_omits_absent_content_length() {
		let headers = canonicalized_headers(&[("x-ms-date", DATE), ("x-ms-version", VERSION)]);
		let resource =
			canonicalized_resource("acme", "captures", None, &[("restype", "container")]);
		let string_to_sign = string_to_sign("PUT", None, &headers, &resource);

		assert_eq!(
			string_to_sign,
			format!(
				"PUT\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{DATE}\nx-ms-version:{VERSION}\n\
				 /acme/captures\nrestype:container",
			),
		);
	}

	#[test]
	fn signature_matches_known_blob_vector() {
		let headers = canonicalized_headers(&[
			("x-ms-blob-type", "BlockBlob"),
			("x-ms-date", DATE),
			("x-ms-version", VERSION),
		]);
		let resource = canonicalized_resource("acme", "captures", Some("shot.png"), &[]);
		let string_to_sign = string_to_sign("PUT", Some(4), &headers, &resource);

		assert_eq!(sign(&string_to_sign, &key()), "8f8gaoqvjF95sJ9l1W40OAJM4Ah+qLwh0268f4vL42Q=");
	}

	#[test]
	fn signature_matches_known_container_vector() {
		let headers = canonicalized_headers(&[("x-ms-date", DATE), ("x-ms-version", VERSION)]);
		let resource =
			canonicalized_resource("acme", "captures", None, &[("restype", "container")]);
		let string_to_sign = string_to_sign("PUT", None, &headers, &resource);

		assert_eq!(sign(&string_to_sign, &key()), "S4wvIZoGCaOK9dmRQHEf7rHYMyiMiK7LXQIEKQiNX6Q=");
	}

	#[test]
	fn signature_matches_known_acl_vector() {
		let headers = canonicalized_headers(&[
			("x-ms-blob-public-access", "container"),
			("x-ms-date", DATE),
			("x-ms-version", VERSION),
		]);
		let resource = canonicalized_resource(
			"acme",
			"captures",
			None,
			&[("restype", "container"), ("comp", "acl")],
		);
		let string_to_sign = string_to_sign("PUT", None, &headers, &resource);

		assert_eq!(sign(&string_to_sign, &key()), "pGmaS6+AQH5/0Y5SVgEp5corsxcqUokoBz1WeYgMKvU=");
	}

	#[test]
	fn signing_is_deterministic() {
		let string_to_sign = string_to_sign("PUT", Some(17), "x-ms-date:now\n", "/a/b");

		assert_eq!(sign(&string_to_sign, &key()), sign(&string_to_sign, &key()));
	}

	#[test]
	fn authorization_joins_account_and_signature() {
		assert_eq!(authorization("acme", "c2ln"), "SharedKey acme:c2ln");
	}

	#[test]
	fn malformed_key_is_rejected_before_signing() {
		assert!(decode_access_key("not-base64!").is_err());
	}
}

//! Shared result and error-accumulation contracts used by every backend.

// self
use crate::_prelude::*;

/// Final result of one upload attempt; immutable after construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadOutcome {
	/// `true` when the payload reached the backend.
	pub is_success: bool,
	/// URL produced for the uploaded file, when one is available.
	pub url: Option<String>,
	/// Raw response body retained for diagnostics.
	pub raw_response: Option<String>,
}
impl UploadOutcome {
	/// Creates a successful outcome carrying the produced URL.
	pub fn success(url: impl Into<String>) -> Self {
		Self { is_success: true, url: Some(url.into()), raw_response: None }
	}

	/// Creates a failed outcome; details live in the uploader's [`ErrorSink`].
	pub fn failure() -> Self {
		Self::default()
	}

	/// Attaches the raw response body.
	pub fn with_raw_response(mut self, body: impl Into<String>) -> Self {
		self.raw_response = Some(body.into());

		self
	}

	/// Replaces the produced URL.
	pub fn with_url(mut self, url: Option<String>) -> Self {
		self.url = url;

		self
	}
}

/// Ordered, append-only sequence of human-readable error strings.
///
/// Clones share the same underlying list, so an uploader can hand the sink to
/// helper calls while the caller keeps a handle for the final verdict. Any
/// entry marks the enclosing operation as failed; the one exception is the
/// container-ACL warning, which is recorded here while the blob upload still
/// proceeds. Callers treat a non-empty sink as overall failure either way.
#[derive(Clone, Debug, Default)]
pub struct ErrorSink(Arc<Mutex<Vec<String>>>);
impl ErrorSink {
	/// Appends an error entry.
	pub fn push(&self, entry: impl Display) {
		self.0.lock().push(entry.to_string());
	}

	/// Returns `true` once any entry has been recorded.
	pub fn is_error(&self) -> bool {
		!self.0.lock().is_empty()
	}

	/// Returns a snapshot of the accumulated entries in insertion order.
	pub fn entries(&self) -> Vec<String> {
		self.0.lock().clone()
	}

	/// Returns the number of accumulated entries.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` while no entry has been recorded.
	pub fn is_empty(&self) -> bool {
		!self.is_error()
	}
}

/// Callback invoked with a predicted URL before the upload completes.
///
/// Fire-and-forget: the uploader calls it at most once per operation and never
/// inspects a result, so a missing subscriber cannot block or fail an upload.
pub type EarlyUrlSink = Arc<dyn Fn(&str) + Send + Sync>;

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn sink_clones_share_entries() {
		let sink = ErrorSink::default();
		let handle = sink.clone();

		handle.push("'Account Name' must not be empty.");

		assert!(sink.is_error());
		assert_eq!(sink.len(), 1);
		assert_eq!(sink.entries(), vec!["'Account Name' must not be empty.".to_owned()]);
	}

	#[test]
	fn sink_preserves_insertion_order() {
		let sink = ErrorSink::default();

		sink.push("first");
		sink.push("second");

		assert_eq!(sink.entries(), vec!["first".to_owned(), "second".to_owned()]);
	}

	#[test]
	fn outcome_builders_round_out_fields() {
		let outcome = UploadOutcome::success("https://example.com/file.png")
			.with_raw_response("{\"ok\":true}");

		assert!(outcome.is_success);
		assert_eq!(outcome.url.as_deref(), Some("https://example.com/file.png"));
		assert_eq!(outcome.raw_response.as_deref(), Some("{\"ok\":true}"));
		assert!(!UploadOutcome::failure().is_success);
	}
}

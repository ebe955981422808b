//! Optional observability helpers for uploader operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `updrop.op` with the `op` (operation kind)
//!   and `stage` (call site) fields.
//! - Enable `metrics` to increment the `updrop_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operation kinds observed by the uploaders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// End-to-end upload of one payload.
	Upload,
	/// Share-link creation and rewriting.
	ShareLink,
	/// OAuth token grant (code exchange or refresh).
	TokenExchange,
	/// Metadata and file-management calls.
	FileOp,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::Upload => "upload",
			OpKind::ShareLink => "share_link",
			OpKind::TokenExchange => "token_exchange",
			OpKind::FileOp => "file_op",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to an uploader operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure surfaced to the caller or recorded in the sink.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

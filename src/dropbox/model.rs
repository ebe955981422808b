//! Typed records decoded from Dropbox API responses.
//!
//! All records are read-only products of response decoding. Unknown fields
//! are ignored and absent fields fall back to defaults so the crate survives
//! additive API changes; the response type discriminator keeps its reserved
//! wire key `.tag` for compatibility.

// self
use crate::_prelude::*;

/// File or folder record returned by metadata-bearing endpoints.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxMetadata {
	/// Response type discriminator (`file`, `folder`, `deleted`).
	#[serde(rename = ".tag", default)]
	pub tag: String,
	/// Entry name.
	#[serde(default)]
	pub name: String,
	/// Stable entry identifier.
	#[serde(default)]
	pub id: String,
	/// Client-reported modification timestamp.
	#[serde(default)]
	pub client_modified: String,
	/// Server-recorded modification timestamp.
	#[serde(default)]
	pub server_modified: String,
	/// Revision identifier.
	#[serde(default)]
	pub rev: String,
	/// Size in bytes.
	#[serde(default)]
	pub size: u64,
	/// Lowercased full path.
	#[serde(default)]
	pub path_lower: String,
	/// Display-cased full path.
	#[serde(default)]
	pub path_display: String,
	/// Sharing state, when the entry lives in a shared folder.
	#[serde(default)]
	pub sharing_info: Option<DropboxSharingInfo>,
	/// Custom property groups attached to the entry.
	#[serde(default)]
	pub property_groups: Vec<DropboxPropertyGroup>,
	/// Whether any member has explicit access to the file.
	#[serde(default)]
	pub has_explicit_shared_members: bool,
}

/// Sharing state for entries inside shared folders.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxSharingInfo {
	/// Whether the entry is read-only for the current account.
	#[serde(default)]
	pub read_only: bool,
	/// Identifier of the containing shared folder.
	#[serde(default)]
	pub parent_shared_folder_id: String,
	/// Account that last modified the entry.
	#[serde(default)]
	pub modified_by: String,
}

/// Custom property group attached to a metadata record.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxPropertyGroup {
	/// Template the group instantiates.
	#[serde(default)]
	pub template_id: String,
	/// Property fields in template order.
	#[serde(default)]
	pub fields: Vec<DropboxPropertyGroupField>,
}

/// Single name/value pair inside a property group.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxPropertyGroupField {
	/// Field name.
	#[serde(default)]
	pub name: String,
	/// Field value.
	#[serde(default)]
	pub value: String,
}

/// Shared-link record returned by `create_shared_link_with_settings`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxLinkMetadata {
	/// Response type discriminator.
	#[serde(rename = ".tag", default)]
	pub tag: String,
	/// Share URL in the provider's default shape.
	#[serde(default)]
	pub url: String,
	/// Linked entry name.
	#[serde(default)]
	pub name: String,
	/// Permissions attached to the link.
	#[serde(default)]
	pub link_permissions: DropboxLinkPermissions,
	/// Client-reported modification timestamp.
	#[serde(default)]
	pub client_modified: String,
	/// Server-recorded modification timestamp.
	#[serde(default)]
	pub server_modified: String,
	/// Revision identifier.
	#[serde(default)]
	pub rev: String,
	/// Size in bytes.
	#[serde(default)]
	pub size: u64,
	/// Stable entry identifier.
	#[serde(default)]
	pub id: String,
	/// Lowercased full path.
	#[serde(default)]
	pub path_lower: String,
	/// Team member that owns the link, for team content.
	#[serde(default)]
	pub team_member_info: Option<DropboxTeamMemberInfo>,
}

/// Permissions attached to a shared link.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxLinkPermissions {
	/// Whether the current account can revoke the link.
	#[serde(default)]
	pub can_revoke: bool,
	/// Effective visibility after policy resolution.
	#[serde(default)]
	pub resolved_visibility: TagRecord,
	/// Why revocation would fail, when it would.
	#[serde(default)]
	pub revoke_failure_reason: Option<TagRecord>,
}

/// Record whose only payload is the `.tag` discriminator.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TagRecord {
	/// Discriminator value.
	#[serde(rename = ".tag", default)]
	pub tag: String,
}

/// Team attribution for links created on team content.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxTeamMemberInfo {
	/// Team the member belongs to.
	#[serde(default)]
	pub team_info: DropboxTeamInfo,
	/// Member display name.
	#[serde(default)]
	pub display_name: String,
	/// Stable member identifier.
	#[serde(default)]
	pub member_id: String,
}

/// Team descriptor nested inside member attribution.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxTeamInfo {
	/// Stable team identifier.
	#[serde(default)]
	pub id: String,
	/// Team display name.
	#[serde(default)]
	pub name: String,
}

/// Account record returned by `users/get_current_account`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxAccount {
	/// Stable account identifier.
	#[serde(default)]
	pub account_id: String,
	/// Name forms for the account holder.
	#[serde(default)]
	pub name: DropboxAccountName,
	/// Primary email address.
	#[serde(default)]
	pub email: String,
	/// Whether the email address is verified.
	#[serde(default)]
	pub email_verified: bool,
	/// Whether the account has been disabled.
	#[serde(default)]
	pub disabled: bool,
	/// Locale preference.
	#[serde(default)]
	pub locale: String,
	/// Referral link for the account.
	#[serde(default)]
	pub referral_link: String,
	/// Whether the account is paired with a work account.
	#[serde(default)]
	pub is_paired: bool,
	/// Account tier discriminator (`basic`, `pro`, `business`).
	#[serde(default)]
	pub account_type: TagRecord,
	/// Profile photo URL, when one is set.
	#[serde(default)]
	pub profile_photo_url: String,
	/// Country code reported for the account.
	#[serde(default)]
	pub country: String,
}

/// Name forms attached to an account record.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DropboxAccountName {
	/// Given name.
	#[serde(default)]
	pub given_name: String,
	/// Surname.
	#[serde(default)]
	pub surname: String,
	/// Familiar form used in casual contexts.
	#[serde(default)]
	pub familiar_name: String,
	/// Full display name.
	#[serde(default)]
	pub display_name: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn metadata_decodes_tag_from_reserved_key() {
		let body = r#"{
			".tag": "file",
			"name": "shot.png",
			"id": "id:abc",
			"rev": "0123456789ab",
			"size": 4096,
			"path_lower": "/public/shot.png",
			"path_display": "/Public/shot.png",
			"unknown_future_field": {"ignored": true}
		}"#;
		let metadata: DropboxMetadata =
			serde_json::from_str(body).expect("Metadata fixture should decode.");

		assert_eq!(metadata.tag, "file");
		assert_eq!(metadata.path_display, "/Public/shot.png");
		assert_eq!(metadata.size, 4096);
		assert!(metadata.sharing_info.is_none());
		assert!(metadata.property_groups.is_empty());
	}

	#[test]
	fn link_metadata_decodes_nested_permission_tags() {
		let body = r#"{
			".tag": "file",
			"url": "https://www.dropbox.com/s/abcd1234/shot.png",
			"link_permissions": {
				"can_revoke": true,
				"resolved_visibility": {".tag": "public"}
			}
		}"#;
		let link: DropboxLinkMetadata =
			serde_json::from_str(body).expect("Link metadata fixture should decode.");

		assert_eq!(link.url, "https://www.dropbox.com/s/abcd1234/shot.png");
		assert!(link.link_permissions.can_revoke);
		assert_eq!(link.link_permissions.resolved_visibility.tag, "public");
		assert!(link.link_permissions.revoke_failure_reason.is_none());
	}

	#[test]
	fn account_tolerates_missing_fields() {
		let account: DropboxAccount =
			serde_json::from_str(r#"{"account_id": "dbid:xyz"}"#)
				.expect("Sparse account fixture should decode.");

		assert_eq!(account.account_id, "dbid:xyz");
		assert!(account.name.display_name.is_empty());
		assert!(account.account_type.tag.is_empty());
	}
}

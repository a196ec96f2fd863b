//! Pull request list customization section

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::patch::lenient;

/// Which PR list pages the customization runs on, plus its hide flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrListSettings {
    pub enabled_on_pages: BTreeMap<String, bool>,
    pub hide_labels: bool,
    pub hide_status_badges: bool,
    pub hide_author_avatars: bool,
    pub hide_descriptions: bool,
    pub hide_review_status: bool,
    pub hide_merge_status: bool,
    pub hide_file_change_counts: bool,
    pub hide_comment_counts: bool,
    pub hide_timestamps: bool,
    pub hide_branch_names: bool,
    pub hide_pr_meta_info: bool,
    pub hide_review_status_text: bool,
}

impl Default for PrListSettings {
    fn default() -> Self {
        Self {
            enabled_on_pages: BTreeMap::from([("pulls".to_string(), true)]),
            hide_labels: false,
            hide_status_badges: false,
            hide_author_avatars: false,
            hide_descriptions: false,
            hide_review_status: false,
            hide_merge_status: false,
            hide_file_change_counts: false,
            hide_comment_counts: false,
            hide_timestamps: false,
            hide_branch_names: false,
            hide_pr_meta_info: false,
            hide_review_status_text: false,
        }
    }
}

impl PrListSettings {
    /// JSON keys of the hide flags, in display order
    pub const HIDE_FLAGS: [&'static str; 12] = [
        "hideLabels",
        "hideStatusBadges",
        "hideAuthorAvatars",
        "hideDescriptions",
        "hideReviewStatus",
        "hideMergeStatus",
        "hideFileChangeCounts",
        "hideCommentCounts",
        "hideTimestamps",
        "hideBranchNames",
        "hidePrMetaInfo",
        "hideReviewStatusText",
    ];

    /// Whether the customization runs on the given page id; absent = off
    pub fn enabled_on(&self, page: &str) -> bool {
        self.enabled_on_pages.get(page).copied().unwrap_or(false)
    }

    /// Number of hide flags currently switched on
    pub fn active_hide_count(&self) -> usize {
        [
            self.hide_labels,
            self.hide_status_badges,
            self.hide_author_avatars,
            self.hide_descriptions,
            self.hide_review_status,
            self.hide_merge_status,
            self.hide_file_change_counts,
            self.hide_comment_counts,
            self.hide_timestamps,
            self.hide_branch_names,
            self.hide_pr_meta_info,
            self.hide_review_status_text,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrListPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub enabled_on_pages: Option<BTreeMap<String, bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_labels: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_status_badges: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_author_avatars: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_descriptions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_review_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_merge_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_file_change_counts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_comment_counts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_timestamps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_branch_names: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_pr_meta_info: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub hide_review_status_text: Option<bool>,
}

impl From<PrListSettings> for PrListPatch {
    fn from(s: PrListSettings) -> Self {
        Self {
            enabled_on_pages: Some(s.enabled_on_pages),
            hide_labels: Some(s.hide_labels),
            hide_status_badges: Some(s.hide_status_badges),
            hide_author_avatars: Some(s.hide_author_avatars),
            hide_descriptions: Some(s.hide_descriptions),
            hide_review_status: Some(s.hide_review_status),
            hide_merge_status: Some(s.hide_merge_status),
            hide_file_change_counts: Some(s.hide_file_change_counts),
            hide_comment_counts: Some(s.hide_comment_counts),
            hide_timestamps: Some(s.hide_timestamps),
            hide_branch_names: Some(s.hide_branch_names),
            hide_pr_meta_info: Some(s.hide_pr_meta_info),
            hide_review_status_text: Some(s.hide_review_status_text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let pr_list = PrListSettings::default();
        assert!(pr_list.enabled_on("pulls"));
        assert!(!pr_list.enabled_on("issues"));
        assert_eq!(pr_list.active_hide_count(), 0);
    }

    #[test]
    fn test_hide_flag_keys_match_serialization() {
        let value = serde_json::to_value(PrListSettings::default()).unwrap();
        for key in PrListSettings::HIDE_FLAGS {
            assert_eq!(value.get(key), Some(&serde_json::Value::Bool(false)), "{}", key);
        }
    }
}

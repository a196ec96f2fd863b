//! Static table of the built-in features

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::schema::{FieldType, SettingField, SettingsSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    Aliasing,
    BuildFavicon,
    CopyPath,
    ExpandResolved,
    HideWhitespace,
    ImageSize,
    PackageLinks,
    PrListCustomization,
    PreventClose,
    ReactionAvatars,
    ReadCommentsTracker,
    StickyHeaders,
    ViewedCheckbox,
}

impl FeatureKind {
    pub const ALL: [FeatureKind; 13] = [
        FeatureKind::Aliasing,
        FeatureKind::BuildFavicon,
        FeatureKind::CopyPath,
        FeatureKind::ExpandResolved,
        FeatureKind::HideWhitespace,
        FeatureKind::ImageSize,
        FeatureKind::PackageLinks,
        FeatureKind::PrListCustomization,
        FeatureKind::PreventClose,
        FeatureKind::ReactionAvatars,
        FeatureKind::ReadCommentsTracker,
        FeatureKind::StickyHeaders,
        FeatureKind::ViewedCheckbox,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            FeatureKind::Aliasing => "aliasing",
            FeatureKind::BuildFavicon => "build-favicon",
            FeatureKind::CopyPath => "copy-path",
            FeatureKind::ExpandResolved => "expand-resolved",
            FeatureKind::HideWhitespace => "hide-whitespace",
            FeatureKind::ImageSize => "image-size",
            FeatureKind::PackageLinks => "package-links",
            FeatureKind::PrListCustomization => "pr-list-customization",
            FeatureKind::PreventClose => "prevent-close",
            FeatureKind::ReactionAvatars => "reaction-avatars",
            FeatureKind::ReadCommentsTracker => "read-comments-tracker",
            FeatureKind::StickyHeaders => "sticky-headers",
            FeatureKind::ViewedCheckbox => "viewed-checkbox",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureKind::Aliasing => "Aliasing",
            FeatureKind::BuildFavicon => "Build Status Favicon",
            FeatureKind::CopyPath => "Copy File Path Button",
            FeatureKind::ExpandResolved => "Auto-Expand Resolved Comments",
            FeatureKind::HideWhitespace => "Default Hide Whitespace",
            FeatureKind::ImageSize => "Image Size Display",
            FeatureKind::PackageLinks => "NPM/Package Links",
            FeatureKind::PrListCustomization => "PR List Customization",
            FeatureKind::PreventClose => "Prevent Accidental Tab Close",
            FeatureKind::ReactionAvatars => "Reaction Avatars",
            FeatureKind::ReadCommentsTracker => "Read Comments Tracker",
            FeatureKind::StickyHeaders => "Sticky File Headers",
            FeatureKind::ViewedCheckbox => "\"Viewed\" Checkbox Visibility",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FeatureKind::Aliasing => {
                "Create custom aliases for GitHub users, projects, and organizations with colors and icons"
            }
            FeatureKind::BuildFavicon => "Update favicon to reflect CI/CD build status",
            FeatureKind::CopyPath => {
                "Add a one-click button to copy the relative file path in file headers"
            }
            FeatureKind::ExpandResolved => {
                "Add a button to expand all resolved comment threads in PRs"
            }
            FeatureKind::HideWhitespace => "Automatically hide whitespace changes in PR diffs",
            FeatureKind::ImageSize => {
                "Display image dimensions and file size in Pull Request diffs and file views"
            }
            FeatureKind::PackageLinks => {
                "Turn package names in dependency files into clickable links to their registries"
            }
            FeatureKind::PrListCustomization => {
                "Customize which elements are shown on pull request listing pages"
            }
            FeatureKind::PreventClose => "Warn before closing tab if there are unsaved comments",
            FeatureKind::ReactionAvatars => "Display user avatars next to reaction emojis",
            FeatureKind::ReadCommentsTracker => {
                "Tracks new comments on PRs and highlights them in the PR list."
            }
            FeatureKind::StickyHeaders => {
                "Keep file names visible while scrolling through large diffs in Pull Requests"
            }
            FeatureKind::ViewedCheckbox => {
                "Make the \"Viewed\" checkbox more accessible via a floating button"
            }
        }
    }

    /// Whether the feature has anything to do on a page with this path
    pub fn runs_on(&self, path: &str) -> bool {
        let pull = path.contains("/pull/");
        let files = path.contains("/files");
        match self {
            FeatureKind::Aliasing | FeatureKind::PreventClose => true,
            FeatureKind::PrListCustomization => path.contains("/pulls"),
            FeatureKind::ReadCommentsTracker => path.contains("/pulls") || pull,
            FeatureKind::HideWhitespace
            | FeatureKind::StickyHeaders
            | FeatureKind::ViewedCheckbox => pull && files,
            FeatureKind::PackageLinks => path.contains("/blob/"),
            FeatureKind::ImageSize | FeatureKind::CopyPath => path.contains("/blob/") || pull,
            FeatureKind::ExpandResolved => pull && !files,
            FeatureKind::ReactionAvatars => pull || path.contains("/issues/"),
            FeatureKind::BuildFavicon => pull,
        }
    }

    /// Schema for the feature's settings card
    pub fn settings_schema(&self) -> SettingsSchema {
        SettingsSchema {
            feature_id: self.id().to_string(),
            display_name: self.display_name().to_string(),
            description: Some(self.description().to_string()),
            pages: Vec::new(),
            fields: self.fields(),
        }
    }

    fn fields(&self) -> Vec<SettingField> {
        match self {
            FeatureKind::PrListCustomization => PR_LIST_FIELDS
                .iter()
                .map(|(key, label, description)| SettingField::checkbox(key, label, description))
                .collect(),
            FeatureKind::Aliasing => {
                let mut fields: Vec<SettingField> = ALIASING_TOGGLES
                    .iter()
                    .map(|(key, label, description)| SettingField::checkbox(key, label, description))
                    .collect();
                fields.extend(ALIAS_LISTS.iter().map(|(key, label, description)| {
                    SettingField::new(key, FieldType::AliasList, label, json!([]))
                        .describe(description)
                }));
                fields
            }
            FeatureKind::ReadCommentsTracker => vec![
                SettingField::new(
                    "readCommentsTracker.readColor",
                    FieldType::Color,
                    "Read Color",
                    Value::from("#2da44e"),
                )
                .describe("Color for PRs with no new comments"),
                SettingField::new(
                    "readCommentsTracker.unreadColor",
                    FieldType::Color,
                    "Unread Color",
                    Value::from("#bc8c00"),
                )
                .describe("Color for PRs with new comments"),
            ],
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

const PR_LIST_FIELDS: [(&str, &str, &str); 12] = [
    ("prList.hideLabels", "Hide Labels", "Hide PR labels from the list view"),
    (
        "prList.hideStatusBadges",
        "Hide Status Badges",
        "Hide draft, ready for review, and other status badges",
    ),
    ("prList.hideAuthorAvatars", "Hide Author Avatars", "Hide author profile pictures"),
    ("prList.hideDescriptions", "Hide Descriptions", "Hide PR description previews"),
    ("prList.hideReviewStatus", "Hide Review Status", "Hide review status indicators"),
    ("prList.hideMergeStatus", "Hide Merge Status", "Hide merge status indicators"),
    (
        "prList.hideFileChangeCounts",
        "Hide File Change Counts",
        "Hide the number of files changed",
    ),
    ("prList.hideCommentCounts", "Hide Comment Counts", "Hide comment count badges"),
    (
        "prList.hideTimestamps",
        "Hide Timestamps",
        "Hide time information (e.g., \"2 days ago\")",
    ),
    ("prList.hideBranchNames", "Hide Branch Names", "Hide source and target branch names"),
    (
        "prList.hidePrMetaInfo",
        "Hide PR Meta Info",
        "Hide PR number and author line (e.g. \"#123 opened by User\")",
    ),
    (
        "prList.hideReviewStatusText",
        "Hide Review Status Text",
        "Hide review status text (e.g. \"Review required\")",
    ),
];

const ALIASING_TOGGLES: [(&str, &str, &str); 6] = [
    (
        "aliasing.autoHarvestUsers",
        "Auto-harvest Users",
        "Automatically detect and store users found on pages",
    ),
    (
        "aliasing.autoHarvestProjects",
        "Auto-harvest Projects",
        "Automatically detect and store projects found on pages",
    ),
    (
        "aliasing.autoHarvestOrgs",
        "Auto-harvest Organizations",
        "Automatically detect and store organizations found on pages",
    ),
    (
        "aliasing.autoAliasUsers",
        "Auto-alias Users",
        "Automatically create aliases for users using their avatar as icon",
    ),
    (
        "aliasing.autoAliasProjects",
        "Auto-alias Projects",
        "Automatically create aliases for projects using acronym and color",
    ),
    (
        "aliasing.autoAliasOrgs",
        "Auto-alias Organizations",
        "Automatically create aliases for organizations using acronym and color",
    ),
];

const ALIAS_LISTS: [(&str, &str, &str); 3] = [
    ("aliasing.users", "User Aliases", "Manage aliases for GitHub users"),
    ("aliasing.projects", "Project Aliases", "Manage aliases for GitHub repositories"),
    ("aliasing.orgs", "Organization Aliases", "Manage aliases for GitHub organizations"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    #[test]
    fn test_ids_roundtrip() {
        for kind in FeatureKind::ALL {
            assert_eq!(FeatureKind::from_id(kind.id()), Some(kind));
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.id());
        }
        assert_eq!(FeatureKind::from_id("dark-mode"), None);
    }

    #[test]
    fn test_page_predicates() {
        assert!(FeatureKind::PrListCustomization.runs_on("/facebook/react/pulls"));
        assert!(!FeatureKind::PrListCustomization.runs_on("/facebook/react/pull/1"));
        assert!(FeatureKind::HideWhitespace.runs_on("/facebook/react/pull/1/files"));
        assert!(!FeatureKind::HideWhitespace.runs_on("/facebook/react/pull/1"));
        assert!(FeatureKind::ExpandResolved.runs_on("/facebook/react/pull/1"));
        assert!(!FeatureKind::ExpandResolved.runs_on("/facebook/react/pull/1/files"));
        assert!(FeatureKind::PackageLinks.runs_on("/facebook/react/blob/main/package.json"));
        assert!(FeatureKind::ReactionAvatars.runs_on("/facebook/react/issues/7"));
        assert!(FeatureKind::Aliasing.runs_on("/"));
    }

    #[test]
    fn test_schema_keys_exist_in_settings() {
        let settings = Settings::default();
        for kind in FeatureKind::ALL {
            for field in kind.settings_schema().fields {
                let value = settings.value_at(&field.key);
                assert_eq!(value.as_ref(), Some(&field.default), "{}", field.key);
            }
        }
    }

    #[test]
    fn test_field_counts() {
        assert_eq!(FeatureKind::PrListCustomization.settings_schema().fields.len(), 12);
        assert_eq!(FeatureKind::Aliasing.settings_schema().fields.len(), 9);
        assert_eq!(FeatureKind::ReadCommentsTracker.settings_schema().fields.len(), 2);
        assert!(FeatureKind::CopyPath.settings_schema().fields.is_empty());
    }
}

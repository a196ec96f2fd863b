//! Per-section merge rules
//!
//! | section               | rule                                              |
//! |-----------------------|---------------------------------------------------|
//! | top-level scalars     | overwrite                                         |
//! | `features`            | key-wise, untouched keys preserved                |
//! | `prList`              | fields overwrite, `enabledOnPages` key-wise       |
//! | `aliasing`            | fields overwrite, provided lists replace wholesale|
//! | `readCommentsTracker` | field-wise                                        |
//! | unknown keys          | overwrite                                         |

use std::collections::{BTreeMap, HashSet};

use super::aliasing::{AliasKind, AliasingPatch, AliasingSettings};
use super::patch::ReadCommentsTrackerPatch;
use super::pr_list::{PrListPatch, PrListSettings};
use super::{ReadCommentsTrackerSettings, Settings, SettingsPatch};

macro_rules! overwrite {
    ($target:expr, $patch:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $target.$field = value;
            }
        )+
    };
}

pub fn merge_features(current: &mut BTreeMap<String, bool>, patch: BTreeMap<String, bool>) {
    current.extend(patch);
}

pub fn merge_pr_list(current: &mut PrListSettings, patch: PrListPatch) {
    if let Some(pages) = patch.enabled_on_pages {
        current.enabled_on_pages.extend(pages);
    }
    overwrite!(
        current,
        patch,
        hide_labels,
        hide_status_badges,
        hide_author_avatars,
        hide_descriptions,
        hide_review_status,
        hide_merge_status,
        hide_file_change_counts,
        hide_comment_counts,
        hide_timestamps,
        hide_branch_names,
        hide_pr_meta_info,
        hide_review_status_text,
    );
}

/// Lists are never merged element-wise: a provided list is the new list
pub fn merge_aliasing(current: &mut AliasingSettings, patch: AliasingPatch) {
    overwrite!(
        current,
        patch,
        users,
        projects,
        orgs,
        auto_harvest_users,
        auto_harvest_projects,
        auto_harvest_orgs,
        auto_alias_users,
        auto_alias_projects,
        auto_alias_orgs,
        harvest_org_whitelist,
        harvest_repo_whitelist,
    );
}

pub fn merge_read_comments_tracker(
    current: &mut ReadCommentsTrackerSettings,
    patch: ReadCommentsTrackerPatch,
) {
    overwrite!(current, patch, read_color, unread_color);
}

impl Settings {
    /// Merge a partial update into this document
    pub fn apply(&mut self, patch: SettingsPatch) {
        overwrite!(self, patch, language, theme, enable_mode, allowlist, debug);
        if let Some(features) = patch.features {
            merge_features(&mut self.features, features);
        }
        if let Some(pr_list) = patch.pr_list {
            merge_pr_list(&mut self.pr_list, pr_list);
        }
        if let Some(aliasing) = patch.aliasing {
            merge_aliasing(&mut self.aliasing, aliasing);
        }
        if let Some(tracker) = patch.read_comments_tracker {
            merge_read_comments_tracker(&mut self.read_comments_tracker, tracker);
        }
        self.extra.extend(patch.extra);
    }

    /// Owned variant of [`Settings::apply`]
    pub fn merged(mut self, patch: SettingsPatch) -> Self {
        self.apply(patch);
        self
    }
}

/// First alias original that repeats (case-insensitively) an earlier item
/// of the same list
pub fn find_duplicate(settings: &Settings) -> Option<(AliasKind, String)> {
    AliasKind::ALL.into_iter().find_map(|kind| {
        let mut seen = HashSet::new();
        settings
            .aliasing
            .list(kind)
            .iter()
            .find(|item| !seen.insert(item.original.to_lowercase()))
            .map(|item| (kind, item.original.clone()))
    })
}

/// Drop alias items whose original repeats (case-insensitively) an earlier
/// item of the same list. Returns whether anything was removed.
pub fn heal(settings: &mut Settings) -> bool {
    let mut changed = false;
    for kind in AliasKind::ALL {
        let list = settings.aliasing.list_mut(kind);
        let before = list.len();
        let mut seen = HashSet::new();
        list.retain(|item| seen.insert(item.original.to_lowercase()));
        changed |= list.len() != before;
    }
    changed
}

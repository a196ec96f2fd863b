//! Deciding which features run on a page

use super::FeatureKind;
use crate::settings::{same_name, EnableMode, Settings};

impl Settings {
    /// Apply the enable mode to a page path such as `/facebook/react/pulls`.
    ///
    /// In allowlist mode an entry matches the owner (`facebook`) or the
    /// owner/repo pair (`facebook/react`). An empty allowlist and pages
    /// without an owner (the dashboard) are denied.
    pub fn allows_page(&self, path: &str) -> bool {
        match self.enable_mode {
            EnableMode::On => true,
            EnableMode::Off => false,
            EnableMode::Allowlist => {
                let mut segments = path.split('/').filter(|s| !s.is_empty());
                let Some(owner) = segments.next() else {
                    return false;
                };
                let owner_repo = segments.next().map(|repo| format!("{}/{}", owner, repo));

                self.allowlist.iter().any(|entry| {
                    same_name(entry, owner)
                        || owner_repo
                            .as_deref()
                            .is_some_and(|owner_repo| same_name(entry, owner_repo))
                })
            }
        }
    }
}

/// Enable mode, the feature's own toggle and its page predicate combined
pub fn is_feature_active(settings: &Settings, kind: FeatureKind, path: &str) -> bool {
    settings.allows_page(path) && settings.feature_enabled(kind.id()) && kind.runs_on(path)
}

/// Every built-in feature that should be running on `path`
pub fn active_features(settings: &Settings, path: &str) -> Vec<FeatureKind> {
    FeatureKind::ALL
        .into_iter()
        .filter(|kind| is_feature_active(settings, *kind, path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlisted(entries: &[&str]) -> Settings {
        Settings {
            enable_mode: EnableMode::Allowlist,
            allowlist: entries.iter().map(|e| e.to_string()).collect(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_enable_modes() {
        let mut settings = Settings::default();
        assert!(settings.allows_page("/"));
        settings.enable_mode = EnableMode::Off;
        assert!(!settings.allows_page("/facebook/react"));
    }

    #[test]
    fn test_allowlist_matching() {
        let settings = allowlisted(&["Facebook", "vuejs/vue"]);
        assert!(settings.allows_page("/facebook/react/pulls"));
        assert!(settings.allows_page("/facebook"));
        assert!(settings.allows_page("/VueJS/Vue/issues"));
        assert!(!settings.allows_page("/vuejs/core"));
        assert!(!settings.allows_page("/"));
    }

    #[test]
    fn test_empty_allowlist_denies() {
        assert!(!allowlisted(&[]).allows_page("/facebook/react"));
    }

    #[test]
    fn test_feature_toggle_and_page() {
        let mut settings = Settings::default();
        assert!(is_feature_active(&settings, FeatureKind::BuildFavicon, "/o/r/pull/3"));
        settings.features.insert("build-favicon".into(), false);
        assert!(!is_feature_active(&settings, FeatureKind::BuildFavicon, "/o/r/pull/3"));

        // Absent toggle counts as enabled
        settings.features.remove("copy-path");
        assert!(is_feature_active(&settings, FeatureKind::CopyPath, "/o/r/blob/main/x.rs"));
    }

    #[test]
    fn test_active_features_on_pr_files() {
        let active = active_features(&Settings::default(), "/o/r/pull/3/files");
        assert!(active.contains(&FeatureKind::ViewedCheckbox));
        assert!(active.contains(&FeatureKind::Aliasing));
        assert!(!active.contains(&FeatureKind::ExpandResolved));
        assert!(!active.contains(&FeatureKind::PrListCustomization));
    }
}

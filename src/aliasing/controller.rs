//! Per-page sequencing of the harvest, auto-alias and apply passes

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use super::apply::{apply_aliases, AppliedNodes, ApplyCounts};
use super::avatar::AvatarFetcher;
use super::book::AliasBook;
use super::harvester::harvest;
use super::HarvestedItem;
use super::whitelist::harvest_allowed;
use crate::dom::{NodeId, Page};
use crate::registry::{is_feature_active, FeatureKind};
use crate::settings::{AliasKind, Settings, SettingsError};

pub const DEFAULT_HARVEST_COOLDOWN: Duration = Duration::from_secs(2);

/// Why a pass did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The same pass is already running
    InProgress,
    /// The previous harvest finished less than the cooldown ago
    Cooldown,
    /// The page's org or repo is not on the harvest whitelist
    NotWhitelisted,
    /// Turned off in settings, or nothing to do for this page
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestOutcome {
    Completed { found: usize, added: usize },
    Skipped(SkipReason),
}

impl HarvestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, HarvestOutcome::Completed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Applied(ApplyCounts),
    Skipped(SkipReason),
}

/// Result of one full round of passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub harvest: HarvestOutcome,
    /// Aliases created by the auto-alias pass
    pub auto_aliased: usize,
    pub apply: ApplyOutcome,
}

/// Holds a pass flag for its lifetime
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives aliasing for one page context.
///
/// Harvesting and applying each have an in-progress flag so a pass never
/// overlaps itself, e.g. when a settings write made by the harvest triggers
/// an apply request. Node handles written by the apply pass are remembered so
/// that mutation bursts caused only by those writes are ignored.
pub struct AliasingController {
    book: AliasBook,
    fetcher: Arc<dyn AvatarFetcher>,
    cooldown: Duration,
    harvesting: AtomicBool,
    applying: AtomicBool,
    last_harvest: Mutex<Option<Instant>>,
    applied: Mutex<AppliedNodes>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AliasingController {
    pub fn new(book: AliasBook, fetcher: Arc<dyn AvatarFetcher>) -> Self {
        Self {
            book,
            fetcher,
            cooldown: DEFAULT_HARVEST_COOLDOWN,
            harvesting: AtomicBool::new(false),
            applying: AtomicBool::new(false),
            last_harvest: Mutex::new(None),
            applied: Mutex::new(AppliedNodes::new()),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn book(&self) -> &AliasBook {
        &self.book
    }

    /// Number of nodes written by apply passes on the current page
    pub fn applied_count(&self) -> usize {
        lock(&self.applied).len()
    }

    pub fn is_harvesting(&self) -> bool {
        self.harvesting.load(Ordering::Acquire)
    }

    pub fn is_applying(&self) -> bool {
        self.applying.load(Ordering::Acquire)
    }

    /// First load of a page: harvest, auto-alias, then apply
    pub fn on_page_load(&self, page: &mut Page) -> Result<PassReport, SettingsError> {
        lock(&self.applied).clear();
        self.full_round(page)
    }

    /// In-page navigation replaced the document
    pub fn on_navigation(&self, page: &mut Page) -> Result<PassReport, SettingsError> {
        debug!(url = %page.url, "Navigation");
        lock(&self.applied).clear();
        self.full_round(page)
    }

    /// A debounced burst of DOM additions.
    ///
    /// Returns `None` when the burst was ignored: a pass is running, or every
    /// added node lies inside a subtree this controller rewrote.
    pub fn on_mutations_settled(
        &self,
        page: &mut Page,
        added: &[NodeId],
    ) -> Result<Option<PassReport>, SettingsError> {
        if self.is_harvesting() || self.is_applying() {
            return Ok(None);
        }
        {
            let mut applied = lock(&self.applied);
            let pruned = applied.prune_detached(&page.document);
            if pruned > 0 {
                debug!(pruned, "Dropped rewritten nodes the page removed");
            }
            if !added.is_empty() && added.iter().all(|&id| applied.covers(&page.document, id)) {
                debug!(nodes = added.len(), "Ignoring self-caused mutations");
                return Ok(None);
            }
        }

        let apply = self.apply_pass(page)?;
        let harvest = self.harvest_pass(page)?;
        let auto_aliased = self.auto_alias_pass(page)?;
        Ok(Some(PassReport {
            harvest,
            auto_aliased,
            apply,
        }))
    }

    /// Settings changed elsewhere; re-render with the new lists
    pub fn on_settings_changed(&self, page: &mut Page) -> Result<ApplyOutcome, SettingsError> {
        self.apply_pass(page)
    }

    fn full_round(&self, page: &mut Page) -> Result<PassReport, SettingsError> {
        let harvest = self.harvest_pass(page)?;
        let auto_aliased = self.auto_alias_pass(page)?;
        let apply = self.apply_pass(page)?;
        Ok(PassReport {
            harvest,
            auto_aliased,
            apply,
        })
    }

    /// Collect new entities into the alias lists
    pub fn harvest_pass(&self, page: &Page) -> Result<HarvestOutcome, SettingsError> {
        let Some(_guard) = PassGuard::enter(&self.harvesting) else {
            debug!("Harvest already in progress, skipping");
            return Ok(HarvestOutcome::Skipped(SkipReason::InProgress));
        };
        if let Some(last) = *lock(&self.last_harvest) {
            if last.elapsed() < self.cooldown {
                debug!("Harvest cooldown active, skipping");
                return Ok(HarvestOutcome::Skipped(SkipReason::Cooldown));
            }
        }

        let settings = self.book.manager().get_settings()?;
        let kinds = wanted_kinds(&settings, |kind| settings.aliasing.auto_harvest(kind));
        if kinds.is_empty() || !is_feature_active(&settings, FeatureKind::Aliasing, page.path()) {
            return Ok(HarvestOutcome::Skipped(SkipReason::Disabled));
        }
        if !harvest_allowed(&settings.aliasing, &page.url) {
            debug!(url = %page.url, "Harvesting not allowed for this page");
            return Ok(HarvestOutcome::Skipped(SkipReason::NotWhitelisted));
        }

        let found = self.harvest_kinds(page, kinds);
        let added = self.book.harvest_new(&found)?;
        *lock(&self.last_harvest) = Some(Instant::now());
        debug!(found = found.len(), added, "Harvest pass complete");
        Ok(HarvestOutcome::Completed {
            found: found.len(),
            added,
        })
    }

    /// Generate default aliases for entities of auto-alias kinds
    pub fn auto_alias_pass(&self, page: &Page) -> Result<usize, SettingsError> {
        let settings = self.book.manager().get_settings()?;
        let kinds = wanted_kinds(&settings, |kind| settings.aliasing.auto_alias(kind));
        if kinds.is_empty()
            || !is_feature_active(&settings, FeatureKind::Aliasing, page.path())
            || !harvest_allowed(&settings.aliasing, &page.url)
        {
            return Ok(0);
        }

        let found = self.harvest_kinds(page, kinds);
        let mut created = 0;
        for item in &found {
            if settings.aliasing.find(item.kind, &item.original).is_some() {
                continue;
            }
            if self
                .book
                .generate_auto_alias(item, self.fetcher.as_ref())?
                .is_some()
            {
                created += 1;
            }
        }
        if created > 0 {
            info!(created, "Generated aliases");
        }
        Ok(created)
    }

    fn harvest_kinds(&self, page: &Page, kinds: Vec<AliasKind>) -> Vec<HarvestedItem> {
        let applied = lock(&self.applied);
        let mut found = Vec::new();
        for kind in kinds {
            found.extend(harvest(page, &applied, kind));
        }
        found
    }

    /// Render every enabled alias onto the page
    pub fn apply_pass(&self, page: &mut Page) -> Result<ApplyOutcome, SettingsError> {
        let Some(_guard) = PassGuard::enter(&self.applying) else {
            return Ok(ApplyOutcome::Skipped(SkipReason::InProgress));
        };
        let settings = self.book.manager().get_settings()?;
        if !is_feature_active(&settings, FeatureKind::Aliasing, page.path()) {
            return Ok(ApplyOutcome::Skipped(SkipReason::Disabled));
        }
        let mut applied = lock(&self.applied);
        Ok(ApplyOutcome::Applied(apply_aliases(
            page,
            &settings.aliasing,
            &mut applied,
        )))
    }
}

fn wanted_kinds<F>(settings: &Settings, wanted: F) -> Vec<AliasKind>
where
    F: Fn(AliasKind) -> bool,
{
    if !settings.feature_enabled(FeatureKind::Aliasing.id()) {
        return Vec::new();
    }
    AliasKind::ALL.into_iter().filter(|&kind| wanted(kind)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliasing::OfflineAvatarFetcher;
    use crate::settings::{AliasItem, AliasingPatch, HarvestWhitelist, SettingsManager, SettingsPatch};
    use crate::store::{MemoryStore, StorageArea};

    const HTML: &str = r#"
        <div class="js-issue-row">
          <a href="/facebook/react/pull/1" class="Link--primary">Fix hooks</a>
          <a href="/gaearon" class="author">gaearon</a>
        </div>"#;

    fn controller(cooldown: Duration) -> AliasingController {
        let manager = SettingsManager::new(Arc::new(MemoryStore::new(StorageArea::Sync)));
        manager
            .update_settings(
                AliasingPatch {
                    auto_harvest_users: Some(true),
                    auto_harvest_projects: Some(true),
                    ..Default::default()
                }
                .into(),
            )
            .unwrap();
        AliasingController::new(AliasBook::new(manager), Arc::new(OfflineAvatarFetcher))
            .with_cooldown(cooldown)
    }

    fn page() -> Page {
        Page::parse("https://github.com/facebook/react/pulls", HTML).unwrap()
    }

    #[test]
    fn test_page_load_harvests_and_applies() {
        let controller = controller(Duration::ZERO);
        let mut page = page();
        let report = controller.on_page_load(&mut page).unwrap();
        assert!(report.harvest.is_completed());

        let book = controller.book();
        assert!(book.get_alias(AliasKind::User, "gaearon").unwrap().is_some());
        assert!(book.get_alias(AliasKind::Project, "facebook/react").unwrap().is_some());
        assert!(matches!(report.apply, ApplyOutcome::Applied(_)));
    }

    #[test]
    fn test_cooldown_allows_one_harvest() {
        let controller = controller(Duration::from_secs(60));
        let page = page();
        assert!(controller.harvest_pass(&page).unwrap().is_completed());
        assert_eq!(
            controller.harvest_pass(&page).unwrap(),
            HarvestOutcome::Skipped(SkipReason::Cooldown)
        );
    }

    #[test]
    fn test_no_cooldown_runs_every_time() {
        let controller = controller(Duration::ZERO);
        let page = page();
        assert!(controller.harvest_pass(&page).unwrap().is_completed());
        assert_eq!(
            controller.harvest_pass(&page).unwrap(),
            HarvestOutcome::Completed { found: 2, added: 0 }
        );
    }

    #[test]
    fn test_whitelist_blocks_harvest() {
        let controller = controller(Duration::ZERO);
        controller
            .book()
            .manager()
            .update_settings(
                AliasingPatch::with_whitelist(
                    crate::settings::WhitelistKind::Org,
                    HarvestWhitelist::List(vec!["vuejs".into()]),
                )
                .into(),
            )
            .unwrap();
        assert_eq!(
            controller.harvest_pass(&page()).unwrap(),
            HarvestOutcome::Skipped(SkipReason::NotWhitelisted)
        );
    }

    #[test]
    fn test_feature_toggle_disables_passes() {
        let controller = controller(Duration::ZERO);
        let mut patch = SettingsPatch::default();
        patch.features = Some([("aliasing".to_string(), false)].into_iter().collect());
        controller.book().manager().update_settings(patch).unwrap();

        let mut page = page();
        let report = controller.on_page_load(&mut page).unwrap();
        assert_eq!(report.harvest, HarvestOutcome::Skipped(SkipReason::Disabled));
        assert_eq!(report.apply, ApplyOutcome::Skipped(SkipReason::Disabled));
    }

    #[test]
    fn test_guard_rejects_reentry() {
        let controller = controller(Duration::ZERO);
        let _held = PassGuard::enter(&controller.harvesting).unwrap();
        assert_eq!(
            controller.harvest_pass(&page()).unwrap(),
            HarvestOutcome::Skipped(SkipReason::InProgress)
        );
        let mut page = page();
        assert_eq!(controller.on_mutations_settled(&mut page, &[]).unwrap(), None);
    }

    #[test]
    fn test_self_caused_mutations_are_ignored() {
        let controller = controller(Duration::ZERO);
        controller
            .book()
            .manager()
            .update_settings(
                AliasingPatch::with_list(
                    AliasKind::User,
                    vec![AliasItem::new("gaearon", "Dan").with_color("#884455")],
                )
                .into(),
            )
            .unwrap();
        let mut page = page();
        controller.on_page_load(&mut page).unwrap();
        assert!(controller.applied_count() > 0);

        let link = page
            .document
            .select(|doc, id| doc.attr(id, "href") == Some("/gaearon"))[0];
        let badge = page.document.children(link)[0];
        assert_eq!(controller.on_mutations_settled(&mut page, &[badge]).unwrap(), None);

        // New content from the site itself triggers a round
        let body = page.document.root();
        let fresh = page.document.create_element("a", &[("href", "/sebmarkbage")]);
        page.document.append_child(body, fresh);
        let report = controller.on_mutations_settled(&mut page, &[fresh]).unwrap();
        assert!(report.is_some());
    }

    #[test]
    fn test_removed_nodes_leave_the_applied_set() {
        let controller = controller(Duration::ZERO);
        controller
            .book()
            .manager()
            .update_settings(
                AliasingPatch::with_list(
                    AliasKind::User,
                    vec![AliasItem::new("gaearon", "Dan").with_color("#884455")],
                )
                .into(),
            )
            .unwrap();
        let mut page = page();
        controller.on_page_load(&mut page).unwrap();
        assert!(controller.applied_count() > 0);

        // The site replaces the row; the old handles now point at detached nodes
        let row = page.document.select(|doc, id| doc.has_class(id, "js-issue-row"))[0];
        page.document.clear_children(row);
        let report = controller.on_mutations_settled(&mut page, &[]).unwrap();
        assert!(report.is_some());
        assert_eq!(controller.applied_count(), 0);
    }
}

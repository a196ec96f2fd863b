//! End-to-end harvesting and alias rendering over a saved page

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use betterhub::aliasing::{
    add_entry, harvest, AliasBook, AliasDeepLink, AliasingController, AppliedNodes, ApplyOutcome,
    HarvestOutcome, OfflineAvatarFetcher, SkipReason,
};
use betterhub::dom::Page;
use betterhub::settings::{AliasKind, AliasingPatch, SettingsManager, WhitelistKind};
use betterhub::store::{FileStore, StorageArea};

const PULLS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Pull requests · facebook/react</title></head>
<body>
  <header class="AppHeader">
    <a href="/notifications">Notifications</a>
    <a href="/octocat"><img class="avatar" src="https://avatars.githubusercontent.com/u/1?v=4"></a>
  </header>
  <div class="repo-title"><a href="/facebook/react">facebook/react</a></div>
  <div class="js-issue-row">
    <a href="/facebook/react/pull/101" class="Link--primary">Fix effect cleanup</a>
    <span class="opened-by">opened by <a href="/gaearon" class="Link--muted">gaearon</a></span>
  </div>
  <div class="js-issue-row">
    <a href="/facebook/react/pull/102" class="Link--primary">Docs</a>
    <span class="opened-by">opened by <a href="/sebmarkbage" class="Link--muted">sebmarkbage</a></span>
  </div>
  <div class="comment-body"><p>cc @gaearon for review</p></div>
  <a href="/vuejs/core">vuejs/core</a>
</body>
</html>"#;

fn page() -> Page {
    Page::parse("https://github.com/facebook/react/pulls", PULLS_PAGE).unwrap()
}

fn controller(dir: &TempDir) -> AliasingController {
    let manager = SettingsManager::new(Arc::new(FileStore::open(dir.path(), StorageArea::Sync)));
    manager.initialize().unwrap();
    AliasingController::new(AliasBook::new(manager), Arc::new(OfflineAvatarFetcher))
        .with_cooldown(Duration::from_secs(30))
}

fn names(page: &Page, kind: AliasKind) -> Vec<String> {
    harvest(page, &AppliedNodes::new(), kind)
        .into_iter()
        .map(|item| item.original)
        .collect()
}

#[test]
fn test_harvest_skips_site_chrome() {
    let page = page();
    let users = names(&page, AliasKind::User);
    assert!(users.contains(&"gaearon".to_string()));
    assert!(users.contains(&"sebmarkbage".to_string()));
    assert!(!users.contains(&"octocat".to_string()), "header avatar harvested: {:?}", users);
    assert!(!users.contains(&"notifications".to_string()));

    let projects = names(&page, AliasKind::Project);
    assert_eq!(projects, vec!["facebook/react", "vuejs/core"]);
}

#[test]
fn test_manual_aliases_render_on_page() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&dir);
    let book = controller.book();
    book.add_alias(AliasKind::Project, "facebook/react", "React").unwrap();
    book.add_alias(AliasKind::User, "gaearon", "Dan").unwrap();
    book.set_display_plain(AliasKind::User, "gaearon").unwrap();

    let mut page = page();
    let report = controller.on_page_load(&mut page).unwrap();
    let ApplyOutcome::Applied(counts) = report.apply else {
        panic!("apply skipped: {:?}", report.apply);
    };
    assert!(counts.total() > 0);

    let html = page.document.to_html();
    assert!(html.contains(">Dan</a>"), "{}", html);
    assert!(html.contains("cc @Dan for review"), "{}", html);
    assert!(html.contains("betterhub-alias-badge"), "{}", html);

    // Running again over the rewritten page changes nothing
    let before = page.document.to_html();
    controller.on_settings_changed(&mut page).unwrap();
    assert_eq!(page.document.to_html(), before);
}

#[test]
fn test_auto_harvest_and_auto_alias() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&dir);
    controller
        .book()
        .manager()
        .update_settings(
            AliasingPatch {
                auto_harvest_users: Some(true),
                auto_alias_projects: Some(true),
                ..Default::default()
            }
            .into(),
        )
        .unwrap();

    let mut page = page();
    let report = controller.on_page_load(&mut page).unwrap();
    assert!(matches!(report.harvest, HarvestOutcome::Completed { added, .. } if added >= 2));
    assert_eq!(report.auto_aliased, 2);

    let react = controller
        .book()
        .get_alias(AliasKind::Project, "facebook/react")
        .unwrap()
        .unwrap();
    assert_eq!(react.alias, "F");
    assert!(react.color().is_some());

    // A second trigger inside the cooldown does not harvest again
    assert_eq!(
        controller.harvest_pass(&page).unwrap(),
        HarvestOutcome::Skipped(SkipReason::Cooldown)
    );

    // Everything survives a restart of the context
    let reopened = controller_from(&dir);
    let users = reopened.book().list(AliasKind::User).unwrap();
    assert!(users.iter().any(|u| u.original == "gaearon"));
}

fn controller_from(dir: &TempDir) -> AliasingController {
    controller(dir)
}

#[test]
fn test_whitelist_limits_harvest() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&dir);
    let manager = controller.book().manager().clone();
    manager
        .update_settings(
            AliasingPatch {
                auto_harvest_projects: Some(true),
                ..Default::default()
            }
            .into(),
        )
        .unwrap();
    add_entry(&manager, WhitelistKind::Org, "vuejs").unwrap();

    let mut page = page();
    let report = controller.on_page_load(&mut page).unwrap();
    assert_eq!(report.harvest, HarvestOutcome::Skipped(SkipReason::NotWhitelisted));
    assert!(controller.book().list(AliasKind::Project).unwrap().is_empty());
}

#[test]
fn test_deep_link_points_at_stored_row() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let controller = controller(&dir);
    controller
        .book()
        .add_alias(AliasKind::Project, "facebook/react", "React")
        .unwrap();

    let fragment = AliasDeepLink::new(AliasKind::Project, "facebook/react").to_fragment();
    let link: AliasDeepLink = fragment.parse().unwrap();
    let settings = controller.book().manager().get_settings().unwrap();
    assert_eq!(link.locate(&settings.aliasing).unwrap().alias, "React");
}

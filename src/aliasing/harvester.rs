//! Entity harvester
//!
//! Scans a page for users, repositories and organizations. Each function
//! returns names de-duplicated case-insensitively in discovery order and
//! ignores anything covered by the [`AppliedNodes`] set.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::apply::{find_avatar, AppliedNodes, ICON_CLASS};
use super::avatar::avatar_url;
use super::url::{
    extract_org_name, extract_username, is_exact_profile_url, is_profile_section, is_site_url,
    is_valid_login, path_segments, project_from_url, SYSTEM_LINK_TEXT, SYSTEM_PATHS,
};
use super::HarvestedItem;
use crate::dom::{Document, NodeId, Page};
use crate::settings::AliasKind;

static MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9]+(?:-[A-Za-z0-9]+)*)").expect("valid mention regex"));

const NAV_LABEL_HINTS: [&str; 7] = [
    "navigation",
    "Site-wide",
    "Platform",
    "Ecosystem",
    "Support",
    "Company",
    "Legal",
];

/// Names already emitted by a harvest function
#[derive(Default)]
struct Seen(HashSet<String>);

impl Seen {
    fn insert(&mut self, name: &str) -> bool {
        self.0.insert(name.to_lowercase())
    }

    fn contains(&self, name: &str) -> bool {
        self.0.contains(&name.to_lowercase())
    }
}

fn in_site_chrome(doc: &Document, id: NodeId) -> bool {
    doc.closest(id, |doc, node| {
        matches!(doc.tag_name(node), Some("nav" | "header" | "footer"))
            || doc.attr(node, "role") == Some("navigation")
            || doc.has_class(node, "Header")
            || doc.has_class(node, "footer")
    })
    .is_some()
}

fn in_labelled_navigation(doc: &Document, id: NodeId) -> bool {
    doc.closest(id, |doc, node| {
        doc.attr(node, "aria-label")
            .is_some_and(|label| NAV_LABEL_HINTS.iter().any(|hint| label.contains(hint)))
    })
    .is_some()
}

/// Markup the site uses around author and hovercard links
fn in_user_context(doc: &Document, id: NodeId) -> bool {
    doc.closest(id, |doc, node| {
        doc.attr(node, "data-hovercard-type") == Some("user")
            || doc.attr(node, "itemprop") == Some("author")
            || doc.has_class(node, "author")
            || doc
                .attr(node, "data-hovercard-url")
                .is_some_and(|url| url.contains("/users/"))
    })
    .is_some()
}

fn is_mention_context(doc: &Document, text_node: NodeId) -> bool {
    let Some(parent) = doc.parent_element(text_node) else {
        return true;
    };
    doc.closest(parent, |doc, node| {
        doc.has_class(node, "user-mention") || doc.attr(node, "data-hovercard-type") == Some("user")
    })
    .is_some()
}

/// Images treated as avatars: an `avatar*` class or an `@login` alt text
fn is_avatar_candidate(doc: &Document, id: NodeId) -> bool {
    doc.is_tag(id, "img")
        && (doc.attr(id, "class").is_some_and(|c| c.contains("avatar"))
            || doc.attr(id, "alt").is_some_and(|alt| alt.contains('@')))
}

fn closest_link(doc: &Document, id: NodeId) -> Option<NodeId> {
    doc.closest(id, |doc, node| doc.is_tag(node, "a") && doc.attr(node, "href").is_some())
}

fn links(doc: &Document) -> Vec<NodeId> {
    doc.select(|doc, node| doc.is_tag(node, "a") && doc.attr(node, "href").is_some())
}

fn users_from_avatars(page: &Page, applied: &AppliedNodes, seen: &mut Seen, out: &mut Vec<HarvestedItem>) {
    let doc = &page.document;
    for img in doc.select(is_avatar_candidate) {
        if applied.contains(img) || doc.has_class(img, ICON_CLASS) {
            continue;
        }
        let Some(link) = closest_link(doc, img) else {
            continue;
        };
        if applied.contains(link) || in_site_chrome(doc, link) {
            continue;
        }
        let Some(url) = page.href(link) else {
            continue;
        };
        if !in_user_context(doc, link) && !is_exact_profile_url(&url) {
            continue;
        }
        let Some(login) = extract_username(&url) else {
            continue;
        };
        if seen.contains(&login) {
            continue;
        }
        if path_segments(&url).get(1).is_some_and(|s| !is_profile_section(s)) {
            continue;
        }
        seen.insert(&login);
        out.push(HarvestedItem::user(login, avatar_url(page, img)));
    }
}

fn users_from_links(page: &Page, applied: &AppliedNodes, seen: &mut Seen, out: &mut Vec<HarvestedItem>) {
    let doc = &page.document;
    for link in links(doc) {
        let Some(url) = page.href(link).filter(is_site_url) else {
            continue;
        };
        if applied.covers(doc, link) || in_site_chrome(doc, link) || in_labelled_navigation(doc, link) {
            continue;
        }
        let text = doc.text_content(link).trim().to_lowercase();
        if SYSTEM_LINK_TEXT.iter().any(|indicator| text.contains(indicator)) {
            continue;
        }

        let avatar = find_avatar(doc, link);
        let user_context = avatar.is_some()
            || in_user_context(doc, link)
            || doc.closest(link, |doc, node| doc.has_class(node, "user-mention")).is_some();

        let segments = path_segments(&url);
        if !user_context {
            let [only] = segments.as_slice() else {
                continue;
            };
            if SYSTEM_PATHS.contains(&only.to_lowercase().as_str()) {
                continue;
            }
        }
        let Some(first) = segments.first() else {
            continue;
        };
        if segments.get(1).is_some_and(|s| !is_profile_section(s)) {
            continue;
        }
        if !is_valid_login(first) || !seen.insert(first) {
            continue;
        }
        let icon = avatar.and_then(|img| avatar_url(page, img));
        out.push(HarvestedItem::user(first.to_string(), icon));
    }
}

fn users_from_mentions(page: &Page, applied: &AppliedNodes, seen: &mut Seen, out: &mut Vec<HarvestedItem>) {
    let doc = &page.document;
    for text_node in doc.text_nodes(doc.root()) {
        if applied.covers(doc, text_node) {
            continue;
        }
        let Some(text) = doc.text(text_node) else {
            continue;
        };
        for capture in MENTION.captures_iter(text) {
            let name = &capture[1];
            // Names longer than the grammar allows are cut, as the site does,
            // without leaving a dangling hyphen
            let login = name[..name.len().min(39)].trim_end_matches('-');
            if !is_valid_login(login) || seen.contains(login) {
                continue;
            }
            if is_mention_context(doc, text_node) {
                seen.insert(login);
                out.push(HarvestedItem::user(login.to_string(), None));
            }
        }
    }
}

/// Users from avatars, then profile links, then `@mentions`
pub fn harvest_users(page: &Page, applied: &AppliedNodes) -> Vec<HarvestedItem> {
    let mut seen = Seen::default();
    let mut users = Vec::new();

    users_from_avatars(page, applied, &mut seen, &mut users);
    let from_avatars = users.len();
    users_from_links(page, applied, &mut seen, &mut users);
    let from_links = users.len() - from_avatars;
    users_from_mentions(page, applied, &mut seen, &mut users);
    let from_mentions = users.len() - from_avatars - from_links;

    debug!(
        from_avatars,
        from_links,
        from_mentions,
        total = users.len(),
        "Harvested users"
    );
    users
}

/// Repositories linked from the page, as `owner/repo`
pub fn harvest_projects(page: &Page, applied: &AppliedNodes) -> Vec<HarvestedItem> {
    let doc = &page.document;
    let mut seen = Seen::default();
    let mut projects = Vec::new();

    for link in links(doc) {
        if applied.covers(doc, link) {
            continue;
        }
        let Some(name) = page.href(link).and_then(|url| project_from_url(&url)) else {
            continue;
        };
        if seen.insert(&name) {
            projects.push(HarvestedItem::new(name, AliasKind::Project));
        }
    }

    debug!(total = projects.len(), "Harvested projects");
    projects
}

/// Organizations from `/orgs/` links and organization hovercards or labels
pub fn harvest_orgs(page: &Page, applied: &AppliedNodes) -> Vec<HarvestedItem> {
    let doc = &page.document;
    let mut seen = Seen::default();
    let mut orgs = Vec::new();

    let mut push = |link: NodeId, orgs: &mut Vec<HarvestedItem>| {
        if applied.covers(doc, link) {
            return;
        }
        let name = page
            .href(link)
            .and_then(|url| extract_org_name(&url).or_else(|| extract_username(&url)));
        if let Some(name) = name.filter(|name| is_valid_login(name)) {
            if seen.insert(&name) {
                orgs.push(HarvestedItem::new(name, AliasKind::Org));
            }
        }
    };

    let org_links = doc.select(|doc, node| {
        doc.is_tag(node, "a") && doc.attr(node, "href").is_some_and(|href| href.contains("/orgs/"))
    });
    for link in org_links {
        push(link, &mut orgs);
    }

    let hovercards = doc.select(|doc, node| doc.attr(node, "data-hovercard-type") == Some("organization"));
    let labelled = doc.select(|doc, node| {
        doc.attr(node, "aria-label").is_some_and(|v| v.contains("organization"))
            || doc.attr(node, "title").is_some_and(|v| v.contains("organization"))
    });
    for indicator in hovercards.into_iter().chain(labelled) {
        if let Some(link) = closest_link(doc, indicator) {
            push(link, &mut orgs);
        }
    }

    debug!(total = orgs.len(), "Harvested orgs");
    orgs
}

/// Dispatch on the entity kind
pub fn harvest(page: &Page, applied: &AppliedNodes, kind: AliasKind) -> Vec<HarvestedItem> {
    match kind {
        AliasKind::User => harvest_users(page, applied),
        AliasKind::Project => harvest_projects(page, applied),
        AliasKind::Org => harvest_orgs(page, applied),
    }
}

//! Alias matcher: rewrites entity links and mentions on a page
//!
//! Every node written here is recorded in [`AppliedNodes`]. Later passes
//! (apply and harvest alike) skip anything covered by that set, so the
//! markup this module produces never feeds back into another pass.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;

use super::url::{extract_repo_name, extract_username, path_segments};
use crate::dom::{Document, NodeId, Page};
use crate::settings::{same_name, AliasDisplay, AliasItem, AliasingSettings};

pub const BADGE_CLASS: &str = "betterhub-alias-badge";
pub const ICON_CLASS: &str = "betterhub-alias-icon";

/// Nodes produced or rewritten by alias application
#[derive(Debug, Clone, Default)]
pub struct AppliedNodes {
    nodes: HashSet<NodeId>,
}

impl AppliedNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId) -> bool {
        self.nodes.insert(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Whether `id` or one of its ancestors has been applied
    pub fn covers(&self, doc: &Document, id: NodeId) -> bool {
        self.contains(id) || doc.ancestors(id).any(|a| self.contains(a))
    }

    /// Forget nodes that are no longer in the page; returns how many
    pub fn prune_detached(&mut self, doc: &Document) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|id| doc.is_attached(*id));
        before - self.nodes.len()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Nodes rewritten by one apply pass, per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyCounts {
    pub users: usize,
    pub projects: usize,
    pub orgs: usize,
    pub mentions: usize,
}

impl ApplyCounts {
    pub fn total(&self) -> usize {
        self.users + self.projects + self.orgs + self.mentions
    }
}

enum Render<'a> {
    Badge(&'a str),
    Icon(&'a str),
    Text,
}

fn render_mode(item: &AliasItem) -> Render<'_> {
    match &item.display {
        AliasDisplay::Color(color) if !color.is_empty() => Render::Badge(color),
        AliasDisplay::Icon(icon) if !icon.is_empty() => Render::Icon(icon),
        _ => Render::Text,
    }
}

/// Case-insensitive literal matcher
struct Needle(Regex);

impl Needle {
    fn new(literal: &str) -> Option<Self> {
        if literal.is_empty() {
            return None;
        }
        RegexBuilder::new(&regex::escape(literal))
            .case_insensitive(true)
            .build()
            .ok()
            .map(Needle)
    }

    fn is_in(&self, text: &str) -> bool {
        self.0.is_match(text)
    }

    /// Replace every occurrence; with `whole_name`, occurrences followed by
    /// another name character (`@octo` inside `@octocat`) are left alone.
    fn replace(&self, text: &str, replacement: &str, whole_name: bool) -> Option<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut replaced = false;
        for m in self.0.find_iter(text) {
            let continues = text[m.end()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-');
            if whole_name && continues {
                continue;
            }
            out.push_str(&text[last..m.start()]);
            out.push_str(replacement);
            last = m.end();
            replaced = true;
        }
        if !replaced {
            return None;
        }
        out.push_str(&text[last..]);
        Some(out)
    }
}

fn badge(doc: &mut Document, text: &str, color: &str) -> NodeId {
    let style = format!(
        "background-color:{};color:#fff;padding:2px 6px;border-radius:3px;font-size:0.85em;display:inline-block",
        color
    );
    let span = doc.create_element("span", &[("class", BADGE_CLASS), ("style", &style)]);
    let label = doc.create_text(text);
    doc.append_child(span, label);
    span
}

fn icon(doc: &mut Document, src: &str, alt: &str) -> NodeId {
    doc.create_element(
        "img",
        &[
            ("class", ICON_CLASS),
            ("src", src),
            ("alt", alt),
            ("style", "width:16px;height:16px;vertical-align:middle;display:inline-block"),
        ],
    )
}

/// Swap the link content for a badge
fn render_badge(doc: &mut Document, applied: &mut AppliedNodes, link: NodeId, item: &AliasItem, color: &str) {
    doc.clear_children(link);
    let span = badge(doc, &item.alias, color);
    doc.append_child(link, span);
    applied.insert(span);
}

/// Swap the link content for an icon followed by the alias
fn render_icon(doc: &mut Document, applied: &mut AppliedNodes, link: NodeId, item: &AliasItem, src: &str) {
    doc.clear_children(link);
    let img = icon(doc, src, &item.alias);
    let label = doc.create_text(&format!(" {}", item.alias));
    doc.append_child(link, img);
    doc.append_child(link, label);
    applied.insert(img);
}

fn replace_in_text_nodes(doc: &mut Document, root: NodeId, needle: &Needle, alias: &str) {
    for text_node in doc.text_nodes(root) {
        let replaced = doc
            .text(text_node)
            .and_then(|text| needle.replace(text, alias, false));
        if let Some(replaced) = replaced {
            doc.set_text(text_node, &replaced);
        }
    }
}

pub(crate) fn is_avatar_img(doc: &Document, id: NodeId) -> bool {
    doc.is_tag(id, "img")
        && doc
            .attr(id, "class")
            .is_some_and(|class| class.contains("avatar"))
}

/// First avatar image inside a link
pub(crate) fn find_avatar(doc: &Document, link: NodeId) -> Option<NodeId> {
    doc.descendants(link)
        .into_iter()
        .find(|node| is_avatar_img(doc, *node))
}

fn links_where<F>(page: &Page, applied: &AppliedNodes, matches: F) -> Vec<NodeId>
where
    F: Fn(&Page, NodeId) -> bool,
{
    page.document
        .elements_named("a")
        .into_iter()
        .filter(|link| !applied.covers(&page.document, *link))
        .filter(|link| matches(page, *link))
        .collect()
}

fn apply_user(page: &mut Page, item: &AliasItem, applied: &mut AppliedNodes, counts: &mut ApplyCounts) {
    let Some(needle) = Needle::new(&item.original) else {
        return;
    };

    let links = links_where(page, applied, |page, link| {
        page.href(link)
            .and_then(|url| extract_username(&url))
            .is_some_and(|login| same_name(&login, &item.original))
    });

    let doc = &mut page.document;
    for link in links {
        applied.insert(link);
        counts.users += 1;
        match render_mode(item) {
            Render::Badge(color) => render_badge(doc, applied, link, item, color),
            Render::Icon(src) => {
                if let Some(avatar) = find_avatar(doc, link) {
                    doc.set_attr(avatar, "src", src);
                    doc.remove_attr(avatar, "srcset");
                }
                if needle.is_in(&doc.text_content(link)) {
                    replace_in_text_nodes(doc, link, &needle, &item.alias);
                }
            }
            Render::Text => {
                if needle.is_in(&doc.text_content(link)) {
                    replace_in_text_nodes(doc, link, &needle, &item.alias);
                }
            }
        }
    }

    let Some(mention) = Needle::new(&format!("@{}", item.original)) else {
        return;
    };
    let replacement = format!("@{}", item.alias);
    for text_node in doc.text_nodes(doc.root()) {
        if applied.covers(doc, text_node) || in_raw_text(doc, text_node) {
            continue;
        }
        let replaced = doc
            .text(text_node)
            .and_then(|text| mention.replace(text, &replacement, true));
        if let Some(replaced) = replaced {
            doc.set_text(text_node, &replaced);
            applied.insert(text_node);
            counts.mentions += 1;
        }
    }
}

fn in_raw_text(doc: &Document, text_node: NodeId) -> bool {
    doc.parent_element(text_node)
        .and_then(|parent| doc.tag_name(parent))
        .is_some_and(|tag| matches!(tag, "script" | "style" | "textarea" | "title"))
}

fn apply_project(page: &mut Page, item: &AliasItem, applied: &mut AppliedNodes, counts: &mut ApplyCounts) {
    let Some((_, repo)) = item.original.split_once('/') else {
        return;
    };
    let (Some(full), Some(short)) = (Needle::new(&item.original), Needle::new(repo)) else {
        return;
    };

    let links = links_where(page, applied, |page, link| {
        page.href(link)
            .and_then(|url| extract_repo_name(&url))
            .is_some_and(|name| same_name(&name, &item.original))
    });

    let doc = &mut page.document;
    for link in links {
        let text = doc.text_content(link);
        if !short.is_in(&text) && !full.is_in(&text) {
            continue;
        }
        applied.insert(link);
        counts.projects += 1;
        match render_mode(item) {
            Render::Badge(color) => render_badge(doc, applied, link, item, color),
            Render::Icon(src) => render_icon(doc, applied, link, item, src),
            Render::Text => {
                let needle = if full.is_in(&text) { &full } else { &short };
                if let Some(replaced) = needle.replace(&text, &item.alias, false) {
                    doc.set_text_content(link, &replaced);
                }
            }
        }
    }
}

fn links_to_org(page: &Page, link: NodeId, original: &str) -> bool {
    let Some(url) = page.href(link) else {
        return false;
    };
    match path_segments(&url).as_slice() {
        ["orgs", name, ..] => same_name(name, original),
        [first, ..] => {
            page.document.attr(link, "data-hovercard-type") == Some("organization")
                && same_name(first, original)
        }
        [] => false,
    }
}

fn apply_org(page: &mut Page, item: &AliasItem, applied: &mut AppliedNodes, counts: &mut ApplyCounts) {
    let Some(needle) = Needle::new(&item.original) else {
        return;
    };

    let links = links_where(page, applied, |page, link| {
        links_to_org(page, link, &item.original)
    });

    let doc = &mut page.document;
    for link in links {
        let text = doc.text_content(link);
        if !needle.is_in(&text) {
            continue;
        }
        applied.insert(link);
        counts.orgs += 1;
        match render_mode(item) {
            Render::Badge(color) => render_badge(doc, applied, link, item, color),
            Render::Icon(src) => render_icon(doc, applied, link, item, src),
            Render::Text => {
                if let Some(replaced) = needle.replace(&text, &item.alias, false) {
                    doc.set_text_content(link, &replaced);
                }
            }
        }
    }
}

/// Apply every enabled alias to the page
pub fn apply_aliases(page: &mut Page, aliasing: &AliasingSettings, applied: &mut AppliedNodes) -> ApplyCounts {
    let mut counts = ApplyCounts::default();
    for item in aliasing.users.iter().filter(|item| item.enabled) {
        apply_user(page, item, applied, &mut counts);
    }
    for item in aliasing.projects.iter().filter(|item| item.enabled) {
        apply_project(page, item, applied, &mut counts);
    }
    for item in aliasing.orgs.iter().filter(|item| item.enabled) {
        apply_org(page, item, applied, &mut counts);
    }
    debug!(
        users = counts.users,
        projects = counts.projects,
        orgs = counts.orgs,
        mentions = counts.mentions,
        "Applied aliases"
    );
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> Page {
        Page::parse("https://github.com/facebook/react/pulls", html).unwrap()
    }

    fn apply(page: &mut Page, aliasing: &AliasingSettings) -> (ApplyCounts, AppliedNodes) {
        let mut applied = AppliedNodes::new();
        let counts = apply_aliases(page, aliasing, &mut applied);
        (counts, applied)
    }

    #[test]
    fn test_user_plain_text_and_mentions() {
        let mut page = page(
            r#"<a href="/octocat" class="author">octocat</a><p>thanks @OctoCat and @octocat-bot</p>"#,
        );
        let mut aliasing = AliasingSettings::default();
        aliasing.users.push(AliasItem::new("octocat", "Octo"));

        let (counts, _) = apply(&mut page, &aliasing);
        assert_eq!(counts.users, 1);
        assert_eq!(counts.mentions, 1);
        let html = page.document.to_html();
        assert!(html.contains(r#"<a href="/octocat" class="author">Octo</a>"#));
        assert!(html.contains("thanks @Octo and @octocat-bot"));
    }

    #[test]
    fn test_user_color_badge() {
        let mut page = page(r#"<a href="https://github.com/octocat"><b>octocat</b></a>"#);
        let mut aliasing = AliasingSettings::default();
        aliasing
            .users
            .push(AliasItem::new("octocat", "Octo").with_color("#336699"));

        apply(&mut page, &aliasing);
        let link = page.document.elements_named("a")[0];
        let span = page.document.children(link)[0];
        assert!(page.document.has_class(span, BADGE_CLASS));
        assert_eq!(page.document.text_content(link), "Octo");
        assert!(page.document.attr(span, "style").unwrap().starts_with("background-color:#336699;"));
    }

    #[test]
    fn test_user_icon_swaps_avatar() {
        let mut page = page(
            r#"<a href="/octocat"><img class="avatar avatar-user" src="https://a/1.png" srcset="https://a/2.png 2x"> octocat</a>"#,
        );
        let mut aliasing = AliasingSettings::default();
        aliasing
            .users
            .push(AliasItem::new("octocat", "Octo").with_icon("data:image/png;base64,AA"));

        apply(&mut page, &aliasing);
        let img = page.document.elements_named("img")[0];
        assert_eq!(page.document.attr(img, "src"), Some("data:image/png;base64,AA"));
        assert_eq!(page.document.attr(img, "srcset"), None);
        assert_eq!(page.document.text_content(page.document.root()), " Octo");
    }

    #[test]
    fn test_disabled_alias_is_ignored() {
        let mut page = page(r#"<a href="/octocat">octocat</a>"#);
        let mut aliasing = AliasingSettings::default();
        let mut item = AliasItem::new("octocat", "Octo");
        item.enabled = false;
        aliasing.users.push(item);

        let (counts, applied) = apply(&mut page, &aliasing);
        assert_eq!(counts.total(), 0);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_repo_link_is_not_a_user_target() {
        let mut page = page(r#"<a href="/octocat/hello-world">octocat/hello-world</a>"#);
        let mut aliasing = AliasingSettings::default();
        aliasing.users.push(AliasItem::new("octocat", "Octo"));
        let (counts, _) = apply(&mut page, &aliasing);
        assert_eq!(counts.users, 0);
    }

    #[test]
    fn test_project_modes() {
        let html = r#"<a href="/facebook/react">facebook/react</a><a href="/facebook/react/issues">react</a><a href="/facebook/react">Docs</a>"#;
        let mut aliasing = AliasingSettings::default();
        aliasing.projects.push(AliasItem::new("facebook/react", "R"));

        let mut plain = page(html);
        let (counts, _) = apply(&mut plain, &aliasing);
        assert_eq!(counts.projects, 2);
        let links = plain.document.elements_named("a");
        assert_eq!(plain.document.text_content(links[0]), "R");
        assert_eq!(plain.document.text_content(links[1]), "R");
        assert_eq!(plain.document.text_content(links[2]), "Docs");

        aliasing.projects[0].display = AliasDisplay::Icon("https://x/i.png".into());
        let mut with_icon = page(html);
        apply(&mut with_icon, &aliasing);
        let link = with_icon.document.elements_named("a")[0];
        let img = with_icon.document.children(link)[0];
        assert!(with_icon.document.has_class(img, ICON_CLASS));
        assert_eq!(with_icon.document.attr(img, "alt"), Some("R"));
        assert_eq!(with_icon.document.text_content(link), " R");
    }

    #[test]
    fn test_org_links() {
        let mut page = page(
            r#"<a href="/orgs/vuejs/people">vuejs</a><a href="/vuejs" data-hovercard-type="organization">VueJS</a><a href="/vuejs">vuejs</a>"#,
        );
        let mut aliasing = AliasingSettings::default();
        aliasing
            .orgs
            .push(AliasItem::new("vuejs", "V").with_color("#505050"));

        let (counts, _) = apply(&mut page, &aliasing);
        assert_eq!(counts.orgs, 2);
        let links = page.document.elements_named("a");
        assert_eq!(page.document.text_content(links[2]), "vuejs");
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let mut page = page(r#"<a href="/octocat">octocat</a> @octocat"#);
        let mut aliasing = AliasingSettings::default();
        aliasing.users.push(AliasItem::new("octocat", "octocat2"));

        let mut applied = AppliedNodes::new();
        let first = apply_aliases(&mut page, &aliasing, &mut applied);
        let html = page.document.to_html();
        let second = apply_aliases(&mut page, &aliasing, &mut applied);

        assert_eq!(first.total(), 2);
        assert_eq!(second.total(), 0);
        assert_eq!(page.document.to_html(), html);
    }

    #[test]
    fn test_needle_replace() {
        let needle = Needle::new("@octo").unwrap();
        assert_eq!(needle.replace("@Octo!", "@O", true).as_deref(), Some("@O!"));
        assert_eq!(needle.replace("@octocat", "@O", true), None);
        assert_eq!(needle.replace("@octocat", "@O", false).as_deref(), Some("@Ocat"));
        assert_eq!(needle.replace("nothing", "@O", false), None);
    }
}

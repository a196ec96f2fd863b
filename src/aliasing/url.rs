//! URL shape classification for site entities

use url::Url;

pub const SITE_HOST: &str = "github.com";

/// Second path segments under a user profile (`/octocat/followers`)
pub const PROFILE_SECTIONS: [&str; 10] = [
    "settings",
    "repositories",
    "stars",
    "followers",
    "following",
    "projects",
    "packages",
    "sponsors",
    "organizations",
    "teams",
];

/// Account pages that still identify a user, beyond [`PROFILE_SECTIONS`]
const ACCOUNT_SECTIONS: [&str; 17] = [
    "account",
    "billing",
    "emails",
    "notifications",
    "security",
    "sessions",
    "applications",
    "keys",
    "gpg",
    "ssh",
    "installations",
    "interaction-limits",
    "blocked_users",
    "saved-replies",
    "developer-settings",
    "advanced-security",
    "audit-log",
];

/// Third path segments that mark a repository sub-resource
pub const REPO_SUBPATHS: [&str; 18] = [
    "blob", "tree", "commits", "branches", "tags", "releases", "compare", "pulls", "issues",
    "actions", "projects", "wiki", "security", "pulse", "graphs", "network", "settings", "search",
];

/// Repo segments that never name a repository
pub const RESERVED_REPO_NAMES: [&str; 6] =
    ["settings", "explore", "topics", "trending", "stars", "marketplace"];

/// First path segments owned by the site itself
pub const SYSTEM_PATHS: [&str; 34] = [
    "login", "signup", "join", "logout", "features", "enterprise", "pricing", "security",
    "marketplace", "topics", "trending", "collections", "sponsors", "readme", "terms",
    "privacy", "sitemap", "about", "contact", "blog", "solutions", "team", "partners",
    "premium-support", "customer-stories", "why-github", "mcp", "home-assistant", "explore",
    "settings", "notifications", "new", "search", "orgs",
];

/// Visible link texts that belong to site chrome, never to a person
pub const SYSTEM_LINK_TEXT: [&str; 30] = [
    "sign in", "sign up", "login", "signup", "join", "logout", "features", "enterprise",
    "pricing", "security", "marketplace", "topics", "trending", "collections", "sponsors",
    "readme", "terms", "privacy", "sitemap", "about", "contact", "blog", "solutions", "team",
    "partners", "premium support", "customer stories", "why github", "mcp", "home-assistant",
];

/// Account name grammar: 1-39 alphanumerics or single inner hyphens
pub fn is_valid_login(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 39 {
        return false;
    }
    if !bytes[0].is_ascii_alphanumeric() || !bytes[bytes.len() - 1].is_ascii_alphanumeric() {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-') && !name.contains("--")
}

pub fn is_site_url(url: &Url) -> bool {
    url.host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(SITE_HOST))
}

/// Non-empty path segments
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn is_system_path(segment: &str) -> bool {
    SYSTEM_PATHS.contains(&segment.to_lowercase().as_str())
}

pub fn is_profile_section(segment: &str) -> bool {
    PROFILE_SECTIONS.contains(&segment.to_lowercase().as_str())
}

fn is_account_section(segment: &str) -> bool {
    ACCOUNT_SECTIONS.contains(&segment.to_lowercase().as_str())
}

/// Login of a user profile URL: `/octocat` or `/octocat/<profile page>`
pub fn extract_username(url: &Url) -> Option<String> {
    if !is_site_url(url) {
        return None;
    }
    let segments = path_segments(url);
    let first = *segments.first()?;
    if !is_valid_login(first) {
        return None;
    }
    match segments.get(1) {
        None => Some(first.to_string()),
        Some(second) if is_profile_section(second) || is_account_section(second) => {
            Some(first.to_string())
        }
        Some(_) => None,
    }
}

/// `owner/repo` from any URL with at least two segments
pub fn extract_repo_name(url: &Url) -> Option<String> {
    if !is_site_url(url) {
        return None;
    }
    match path_segments(url).as_slice() {
        [owner, repo, ..] => Some(format!("{}/{}", owner, repo)),
        _ => None,
    }
}

/// Org name from `/orgs/<name>/...`, otherwise the first segment
pub fn extract_org_name(url: &Url) -> Option<String> {
    if !is_site_url(url) {
        return None;
    }
    match path_segments(url).as_slice() {
        ["orgs", name, ..] => Some(name.to_string()),
        [first, ..] => Some(first.to_string()),
        [] => None,
    }
}

/// `https://github.com/<login>` with nothing after it
pub fn is_exact_profile_url(url: &Url) -> bool {
    if !is_site_url(url) || url.query().is_some() || url.fragment().is_some() {
        return false;
    }
    let path = url.path();
    let Some(login) = path.strip_prefix('/') else {
        return false;
    };
    !login.contains('/') && is_valid_login(login)
}

/// Repository a link points at, as `owner/repo`.
///
/// Org pages, repository sub-resources, site pages and reserved repo
/// names do not count.
pub fn project_from_url(url: &Url) -> Option<String> {
    if !is_site_url(url) || url.as_str().contains("/orgs/") {
        return None;
    }
    let segments = path_segments(url);
    let [owner, repo, rest @ ..] = segments.as_slice() else {
        return None;
    };
    if rest.first().is_some_and(|third| REPO_SUBPATHS.contains(third)) {
        return None;
    }
    if owner.starts_with('@') || is_system_path(owner) {
        return None;
    }
    if RESERVED_REPO_NAMES.contains(&repo.to_lowercase().as_str()) {
        return None;
    }
    Some(format!("{}/{}", owner, repo))
}

/// Organization the page belongs to, if any
pub fn current_org(url: &Url) -> Option<String> {
    if !is_site_url(url) {
        return None;
    }
    match path_segments(url).as_slice() {
        ["orgs", name, ..] => Some(name.to_string()),
        [owner, _, ..] if !is_system_path(owner) => Some(owner.to_string()),
        _ => None,
    }
}

/// Repository the page belongs to, as `owner/repo`
pub fn current_repo(url: &Url) -> Option<String> {
    if !is_site_url(url) {
        return None;
    }
    match path_segments(url).as_slice() {
        [owner, repo, ..] if !is_system_path(owner) => Some(format!("{}/{}", owner, repo)),
        _ => None,
    }
}

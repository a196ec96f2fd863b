//! Aliasing section of the settings document

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use super::patch::{lenient, lenient_items};

/// Kind of entity an alias refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasKind {
    User,
    Project,
    Org,
}

impl AliasKind {
    pub const ALL: [AliasKind; 3] = [AliasKind::User, AliasKind::Project, AliasKind::Org];

    pub fn as_str(&self) -> &'static str {
        match self {
            AliasKind::User => "user",
            AliasKind::Project => "project",
            AliasKind::Org => "org",
        }
    }

    /// Name of the list holding this kind in [`AliasingSettings`]
    pub fn list_key(&self) -> &'static str {
        match self {
            AliasKind::User => "users",
            AliasKind::Project => "projects",
            AliasKind::Org => "orgs",
        }
    }
}

impl std::fmt::Display for AliasKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AliasKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "users" => Ok(AliasKind::User),
            "project" | "projects" | "repo" => Ok(AliasKind::Project),
            "org" | "orgs" | "organization" => Ok(AliasKind::Org),
            other => Err(format!("unknown alias type '{}' (expected user, project or org)", other)),
        }
    }
}

/// Case-insensitive name comparison used for every alias and whitelist lookup
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// How an alias is rendered on the page.
///
/// Color and icon are exclusive display modes, so they share one enum.
/// An empty icon means "keep the real avatar, only swap the text".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AliasDisplay {
    #[default]
    Plain,
    Color(String),
    Icon(String),
}

/// Stored mapping from an original entity name to its display substitute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAliasItem", into = "RawAliasItem")]
pub struct AliasItem {
    /// Key within its list, never renamed
    pub original: String,
    pub alias: String,
    pub enabled: bool,
    pub display: AliasDisplay,
}

impl AliasItem {
    pub fn new(original: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            alias: alias.into(),
            enabled: true,
            display: AliasDisplay::Plain,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.display = AliasDisplay::Color(color.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.display = AliasDisplay::Icon(icon.into());
        self
    }

    pub fn color(&self) -> Option<&str> {
        match &self.display {
            AliasDisplay::Color(color) => Some(color),
            _ => None,
        }
    }

    pub fn icon(&self) -> Option<&str> {
        match &self.display {
            AliasDisplay::Icon(icon) => Some(icon),
            _ => None,
        }
    }
}

/// Wire shape of an alias item (`color` / `icon` optional siblings)
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAliasItem {
    original: String,
    #[serde(default)]
    alias: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    icon: Option<String>,
}

fn default_true() -> bool {
    true
}

impl From<RawAliasItem> for AliasItem {
    fn from(raw: RawAliasItem) -> Self {
        let color = raw.color.filter(|c| !c.trim().is_empty());
        let display = match (color, raw.icon) {
            (Some(color), Some(_)) => {
                warn!(original = %raw.original, "alias has both color and icon, keeping color");
                AliasDisplay::Color(color)
            }
            (Some(color), None) => AliasDisplay::Color(color),
            (None, Some(icon)) => AliasDisplay::Icon(icon),
            (None, None) => AliasDisplay::Plain,
        };
        let alias = if raw.alias.is_empty() {
            raw.original.clone()
        } else {
            raw.alias
        };
        Self {
            original: raw.original,
            alias,
            enabled: raw.enabled,
            display,
        }
    }
}

impl From<AliasItem> for RawAliasItem {
    fn from(item: AliasItem) -> Self {
        let (color, icon) = match item.display {
            AliasDisplay::Plain => (None, None),
            AliasDisplay::Color(color) => (Some(color), None),
            AliasDisplay::Icon(icon) => (None, Some(icon)),
        };
        Self {
            original: item.original,
            alias: item.alias,
            enabled: item.enabled,
            color,
            icon,
        }
    }
}

/// Where harvesting is permitted: everywhere, or only on listed orgs/repos
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HarvestWhitelist {
    #[default]
    All,
    List(Vec<String>),
}

impl HarvestWhitelist {
    /// Whether a page belonging to `current` may be harvested.
    ///
    /// Pages without an identifiable org/repo are always permitted.
    pub fn permits(&self, current: Option<&str>) -> bool {
        match (self, current) {
            (HarvestWhitelist::All, _) => true,
            (_, None) => true,
            (HarvestWhitelist::List(entries), Some(current)) => {
                entries.iter().any(|entry| same_name(entry, current))
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, HarvestWhitelist::All)
    }

    pub fn entries(&self) -> &[String] {
        match self {
            HarvestWhitelist::All => &[],
            HarvestWhitelist::List(entries) => entries,
        }
    }
}

impl Serialize for HarvestWhitelist {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HarvestWhitelist::All => serializer.serialize_str("all"),
            HarvestWhitelist::List(entries) => entries.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for HarvestWhitelist {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Keyword(String),
            List(Vec<String>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Keyword(keyword) if keyword.eq_ignore_ascii_case("all") => {
                Ok(HarvestWhitelist::All)
            }
            Repr::Keyword(other) => Err(serde::de::Error::custom(format!(
                "expected \"all\" or a list, got \"{}\"",
                other
            ))),
            Repr::List(entries) => Ok(HarvestWhitelist::List(entries)),
        }
    }
}

/// Which whitelist a harvest gate refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitelistKind {
    Org,
    Repo,
}

impl std::fmt::Display for WhitelistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhitelistKind::Org => write!(f, "org"),
            WhitelistKind::Repo => write!(f, "repo"),
        }
    }
}

/// Alias lists plus the auto-harvest / auto-alias switches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AliasingSettings {
    pub users: Vec<AliasItem>,
    pub projects: Vec<AliasItem>,
    pub orgs: Vec<AliasItem>,

    pub auto_harvest_users: bool,
    pub auto_harvest_projects: bool,
    pub auto_harvest_orgs: bool,

    pub auto_alias_users: bool,
    pub auto_alias_projects: bool,
    pub auto_alias_orgs: bool,

    pub harvest_org_whitelist: HarvestWhitelist,
    pub harvest_repo_whitelist: HarvestWhitelist,
}

impl AliasingSettings {
    pub fn list(&self, kind: AliasKind) -> &[AliasItem] {
        match kind {
            AliasKind::User => &self.users,
            AliasKind::Project => &self.projects,
            AliasKind::Org => &self.orgs,
        }
    }

    pub fn list_mut(&mut self, kind: AliasKind) -> &mut Vec<AliasItem> {
        match kind {
            AliasKind::User => &mut self.users,
            AliasKind::Project => &mut self.projects,
            AliasKind::Org => &mut self.orgs,
        }
    }

    /// Look up an item by original name, enabled or not
    pub fn find(&self, kind: AliasKind, original: &str) -> Option<&AliasItem> {
        self.list(kind)
            .iter()
            .find(|item| same_name(&item.original, original))
    }

    pub fn auto_harvest(&self, kind: AliasKind) -> bool {
        match kind {
            AliasKind::User => self.auto_harvest_users,
            AliasKind::Project => self.auto_harvest_projects,
            AliasKind::Org => self.auto_harvest_orgs,
        }
    }

    pub fn auto_alias(&self, kind: AliasKind) -> bool {
        match kind {
            AliasKind::User => self.auto_alias_users,
            AliasKind::Project => self.auto_alias_projects,
            AliasKind::Org => self.auto_alias_orgs,
        }
    }

    pub fn whitelist(&self, kind: WhitelistKind) -> &HarvestWhitelist {
        match kind {
            WhitelistKind::Org => &self.harvest_org_whitelist,
            WhitelistKind::Repo => &self.harvest_repo_whitelist,
        }
    }
}

/// Partial update of [`AliasingSettings`]; provided lists replace wholesale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_items")]
    pub users: Option<Vec<AliasItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_items")]
    pub projects: Option<Vec<AliasItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_items")]
    pub orgs: Option<Vec<AliasItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub auto_harvest_users: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub auto_harvest_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub auto_harvest_orgs: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub auto_alias_users: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub auto_alias_projects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub auto_alias_orgs: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub harvest_org_whitelist: Option<HarvestWhitelist>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub harvest_repo_whitelist: Option<HarvestWhitelist>,
}

impl AliasingPatch {
    /// Patch replacing a single alias list
    pub fn with_list(kind: AliasKind, items: Vec<AliasItem>) -> Self {
        let mut patch = Self::default();
        match kind {
            AliasKind::User => patch.users = Some(items),
            AliasKind::Project => patch.projects = Some(items),
            AliasKind::Org => patch.orgs = Some(items),
        }
        patch
    }

    /// Patch replacing a single harvest whitelist
    pub fn with_whitelist(kind: WhitelistKind, whitelist: HarvestWhitelist) -> Self {
        let mut patch = Self::default();
        match kind {
            WhitelistKind::Org => patch.harvest_org_whitelist = Some(whitelist),
            WhitelistKind::Repo => patch.harvest_repo_whitelist = Some(whitelist),
        }
        patch
    }
}

impl From<AliasingSettings> for AliasingPatch {
    fn from(s: AliasingSettings) -> Self {
        Self {
            users: Some(s.users),
            projects: Some(s.projects),
            orgs: Some(s.orgs),
            auto_harvest_users: Some(s.auto_harvest_users),
            auto_harvest_projects: Some(s.auto_harvest_projects),
            auto_harvest_orgs: Some(s.auto_harvest_orgs),
            auto_alias_users: Some(s.auto_alias_users),
            auto_alias_projects: Some(s.auto_alias_projects),
            auto_alias_orgs: Some(s.auto_alias_orgs),
            harvest_org_whitelist: Some(s.harvest_org_whitelist),
            harvest_repo_whitelist: Some(s.harvest_repo_whitelist),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_item_wire_shape() {
        let item = AliasItem::new("facebook/react", "R").with_color("#5060ff");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({"original": "facebook/react", "alias": "R", "enabled": true, "color": "#5060ff"})
        );

        let plain = serde_json::to_value(AliasItem::new("octocat", "Octo")).unwrap();
        assert!(plain.get("color").is_none());
        assert!(plain.get("icon").is_none());
    }

    #[test]
    fn test_alias_item_with_both_modes_keeps_color() {
        let item: AliasItem = serde_json::from_value(json!({
            "original": "octocat",
            "alias": "Octo",
            "enabled": false,
            "color": "#ff0000",
            "icon": "https://example.com/a.png"
        }))
        .unwrap();
        assert_eq!(item.display, AliasDisplay::Color("#ff0000".into()));
        assert!(!item.enabled);
    }

    #[test]
    fn test_alias_item_empty_icon_survives() {
        let item: AliasItem =
            serde_json::from_value(json!({"original": "octocat", "alias": "o", "icon": ""})).unwrap();
        assert_eq!(item.icon(), Some(""));
        assert!(item.enabled);
    }

    #[test]
    fn test_whitelist_serde() {
        let all: HarvestWhitelist = serde_json::from_value(json!("all")).unwrap();
        assert!(all.is_all());
        assert_eq!(serde_json::to_value(&all).unwrap(), json!("all"));

        let list: HarvestWhitelist = serde_json::from_value(json!(["facebook"])).unwrap();
        assert_eq!(list, HarvestWhitelist::List(vec!["facebook".into()]));

        assert!(serde_json::from_value::<HarvestWhitelist>(json!("some")).is_err());
    }

    #[test]
    fn test_whitelist_permits() {
        let list = HarvestWhitelist::List(vec!["Facebook".into()]);
        assert!(list.permits(Some("facebook")));
        assert!(!list.permits(Some("google")));
        assert!(list.permits(None));
        assert!(HarvestWhitelist::All.permits(Some("anything")));
        assert!(!HarvestWhitelist::List(vec![]).permits(Some("facebook")));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let mut aliasing = AliasingSettings::default();
        aliasing.users.push(AliasItem::new("OctoCat", "Octo"));
        assert!(aliasing.find(AliasKind::User, "octocat").is_some());
        assert!(aliasing.find(AliasKind::Org, "octocat").is_none());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("users".parse::<AliasKind>().unwrap(), AliasKind::User);
        assert_eq!("Project".parse::<AliasKind>().unwrap(), AliasKind::Project);
        assert!("team".parse::<AliasKind>().is_err());
    }
}

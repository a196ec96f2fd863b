//! Entity aliasing
//!
//! The read path ([`harvester`]) discovers users, repositories and
//! organizations on a page; the write path ([`apply`]) renders stored
//! aliases back onto it. [`AliasBook`] edits the alias lists in the
//! settings document and [`AliasingController`] sequences the passes for
//! one page.

pub mod apply;
pub mod avatar;
mod book;
mod controller;
mod deeplink;
pub mod generate;
pub mod harvester;
pub mod url;
mod whitelist;

pub use apply::{apply_aliases, AppliedNodes, ApplyCounts};
pub use avatar::{avatar_url, AvatarFetcher, HttpAvatarFetcher, OfflineAvatarFetcher};
pub use book::{AliasBook, AliasUpdate};
pub use controller::{
    AliasingController, ApplyOutcome, HarvestOutcome, PassReport, SkipReason,
    DEFAULT_HARVEST_COOLDOWN,
};
pub use deeplink::{AliasDeepLink, DeepLinkError};
pub use generate::{generate_acronym, generate_deterministic_color};
pub use harvester::{harvest, harvest_orgs, harvest_projects, harvest_users};
pub use whitelist::{add_entry, harvest_allowed, remove_entry, set_allow_all};

use serde::Serialize;

use crate::settings::AliasKind;

/// An entity found on a page; never stored as is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestedItem {
    pub original: String,
    #[serde(rename = "type")]
    pub kind: AliasKind,
    /// Avatar URL, users only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl HarvestedItem {
    pub fn new(original: impl Into<String>, kind: AliasKind) -> Self {
        Self {
            original: original.into(),
            kind,
            icon: None,
        }
    }

    pub fn user(original: impl Into<String>, icon: Option<String>) -> Self {
        Self {
            original: original.into(),
            kind: AliasKind::User,
            icon,
        }
    }
}

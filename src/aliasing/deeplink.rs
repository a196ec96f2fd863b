//! `#alias-<type>-<original>` links into the alias editor

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::settings::{AliasItem, AliasKind, AliasingSettings};

const PREFIX: &str = "#alias-";

/// Bytes left alone by `encodeURIComponent`
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeepLinkError {
    #[error("not an alias link: {0}")]
    NotAliasLink(String),

    #[error("unknown alias type '{0}' (expected user, project or org)")]
    UnknownKind(String),

    #[error("alias link has no original name")]
    MissingOriginal,

    #[error("original name is not valid UTF-8 after decoding")]
    InvalidEncoding,
}

/// Points at one row of an alias list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDeepLink {
    pub kind: AliasKind,
    pub original: String,
}

impl AliasDeepLink {
    pub fn new(kind: AliasKind, original: impl Into<String>) -> Self {
        Self {
            kind,
            original: original.into(),
        }
    }

    /// Parse a URL fragment such as `#alias-user-foo%20bar`
    pub fn parse(fragment: &str) -> Result<Self, DeepLinkError> {
        let rest = fragment
            .strip_prefix(PREFIX)
            .ok_or_else(|| DeepLinkError::NotAliasLink(fragment.to_string()))?;
        let (kind, encoded) = rest
            .split_once('-')
            .ok_or_else(|| DeepLinkError::NotAliasLink(fragment.to_string()))?;
        let kind = match kind {
            "user" => AliasKind::User,
            "project" => AliasKind::Project,
            "org" => AliasKind::Org,
            other => return Err(DeepLinkError::UnknownKind(other.to_string())),
        };
        if encoded.is_empty() {
            return Err(DeepLinkError::MissingOriginal);
        }
        let original = percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|_| DeepLinkError::InvalidEncoding)?;
        Ok(Self::new(kind, original))
    }

    pub fn to_fragment(&self) -> String {
        format!(
            "{}{}-{}",
            PREFIX,
            self.kind.as_str(),
            utf8_percent_encode(&self.original, COMPONENT)
        )
    }

    /// The row this link points at, enabled or not
    pub fn locate<'a>(&self, aliasing: &'a AliasingSettings) -> Option<&'a AliasItem> {
        aliasing.find(self.kind, &self.original)
    }
}

impl fmt::Display for AliasDeepLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fragment())
    }
}

impl std::str::FromStr for AliasDeepLink {
    type Err = DeepLinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_link() {
        let link = AliasDeepLink::parse("#alias-user-foo%20bar").unwrap();
        assert_eq!(link, AliasDeepLink::new(AliasKind::User, "foo bar"));
    }

    #[test]
    fn test_project_with_slash() {
        let link = AliasDeepLink::new(AliasKind::Project, "facebook/react");
        assert_eq!(link.to_fragment(), "#alias-project-facebook%2Freact");
        assert_eq!(AliasDeepLink::parse(&link.to_fragment()).unwrap(), link);
    }

    #[test]
    fn test_fragment_matches_uri_component_encoding() {
        let link = AliasDeepLink::new(AliasKind::Org, "My Org (ü)!");
        assert_eq!(link.to_fragment(), "#alias-org-My%20Org%20(%C3%BC)!");
    }

    #[test]
    fn test_original_may_contain_dashes() {
        let link = AliasDeepLink::parse("#alias-org-rust-lang").unwrap();
        assert_eq!(link.original, "rust-lang");
    }

    #[test]
    fn test_rejects_bad_links() {
        assert!(matches!(
            AliasDeepLink::parse("#settings"),
            Err(DeepLinkError::NotAliasLink(_))
        ));
        assert_eq!(
            AliasDeepLink::parse("#alias-users-octocat"),
            Err(DeepLinkError::UnknownKind("users".into()))
        );
        assert_eq!(
            AliasDeepLink::parse("#alias-user-"),
            Err(DeepLinkError::MissingOriginal)
        );
        assert_eq!(
            AliasDeepLink::parse("#alias-user-%FF"),
            Err(DeepLinkError::InvalidEncoding)
        );
    }

    #[test]
    fn test_locate() {
        let mut aliasing = AliasingSettings::default();
        aliasing.users.push(AliasItem::new("octocat", "Octo"));
        let link = AliasDeepLink::parse("#alias-user-OctoCat").unwrap();
        assert_eq!(link.locate(&aliasing).unwrap().alias, "Octo");
        assert!(AliasDeepLink::new(AliasKind::Org, "octocat").locate(&aliasing).is_none());
    }
}

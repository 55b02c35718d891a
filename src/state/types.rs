//! Value types carried by item fields: item type, flags, color, ACL and
//! retention policy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of mailbox item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Folder,
    SearchFolder,
    Tag,
    Conversation,
    Message,
    Contact,
    Document,
    Appointment,
    Task,
    Mountpoint,
    Comment,
    Link,
    SmartFolder,
    Unknown,
}

const ITEM_TYPE_NAMES: &[(ItemType, &str)] = &[
    (ItemType::Folder, "folder"),
    (ItemType::SearchFolder, "search folder"),
    (ItemType::Tag, "tag"),
    (ItemType::Conversation, "conversation"),
    (ItemType::Message, "message"),
    (ItemType::Contact, "contact"),
    (ItemType::Document, "document"),
    (ItemType::Appointment, "appointment"),
    (ItemType::Task, "task"),
    (ItemType::Mountpoint, "mountpoint"),
    (ItemType::Comment, "comment"),
    (ItemType::Link, "link"),
    (ItemType::SmartFolder, "smart folder"),
    (ItemType::Unknown, "unknown"),
];

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        ITEM_TYPE_NAMES
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ITEM_TYPE_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(t, _)| *t)
            .ok_or_else(|| format!("unknown item type: {}", s))
    }
}

/// System flags stored in an item's flag bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    FromMe,
    Attached,
    Replied,
    Forwarded,
    Copied,
    Flagged,
    Draft,
    Deleted,
    Notified,
    Unread,
    HighPriority,
    LowPriority,
}

impl Flag {
    pub fn bitmask(self) -> i32 {
        match self {
            Flag::FromMe => 1 << 0,
            Flag::Attached => 1 << 1,
            Flag::Replied => 1 << 2,
            Flag::Forwarded => 1 << 3,
            Flag::Copied => 1 << 4,
            Flag::Flagged => 1 << 5,
            Flag::Draft => 1 << 6,
            Flag::Deleted => 1 << 7,
            Flag::Notified => 1 << 8,
            Flag::Unread => 1 << 9,
            Flag::HighPriority => 1 << 10,
            Flag::LowPriority => 1 << 11,
        }
    }
}

const RGB_FLAG: i64 = 0x0100_0000;
const RGB_MASK: i64 = 0x00FF_FFFF;

/// Largest index of the predefined color palette.
pub const MAX_MAPPED_COLOR: u8 = 9;

/// Item color: either an index into the predefined palette or a 24-bit RGB
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Mapped(u8),
    Rgb(u32),
}

impl Color {
    pub fn mapped(index: u8) -> Option<Color> {
        (index <= MAX_MAPPED_COLOR).then_some(Color::Mapped(index))
    }

    pub fn rgb(red: u8, green: u8, blue: u8) -> Color {
        Color::Rgb(((red as u32) << 16) | ((green as u32) << 8) | blue as u32)
    }

    /// Numeric code used in item metadata and in the shared tier.
    pub fn to_metadata(self) -> i64 {
        match self {
            Color::Mapped(index) => index as i64,
            Color::Rgb(rgb) => RGB_FLAG | (rgb as i64 & RGB_MASK),
        }
    }

    pub fn from_metadata(code: i64) -> Result<Color, String> {
        if code & RGB_FLAG != 0 {
            return Ok(Color::Rgb((code & RGB_MASK) as u32));
        }
        u8::try_from(code)
            .ok()
            .and_then(Color::mapped)
            .ok_or_else(|| format!("invalid color code {}", code))
    }
}

/// Who a grant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranteeType {
    User,
    Group,
    Domain,
    Cos,
    All,
    Public,
    Guest,
    Key,
}

/// Right bits carried by a grant.
pub mod rights {
    pub const READ: u16 = 0x0001;
    pub const WRITE: u16 = 0x0002;
    pub const INSERT: u16 = 0x0004;
    pub const DELETE: u16 = 0x0008;
    pub const ACTION: u16 = 0x0010;
    pub const ADMIN: u16 = 0x0020;
    pub const PRIVATE: u16 = 0x0040;
    pub const FREEBUSY: u16 = 0x0080;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub grantee: String,
    pub grantee_type: GranteeType,
    pub rights: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
}

/// Access-control list of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    #[serde(default)]
    pub grants: Vec<Grant>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the grant for `grantee`.
    pub fn grant(&mut self, grantee: impl Into<String>, grantee_type: GranteeType, rights: u16) -> &mut Self {
        let grantee = grantee.into();
        self.grants.retain(|g| g.grantee != grantee);
        self.grants.push(Grant {
            grantee,
            grantee_type,
            rights,
            expiry: None,
        });
        self
    }

    pub fn revoke(&mut self, grantee: &str) -> bool {
        let before = self.grants.len();
        self.grants.retain(|g| g.grantee != grantee);
        self.grants.len() != before
    }

    pub fn rights_for(&self, grantee: &str) -> u16 {
        self.grants
            .iter()
            .filter(|g| g.grantee == grantee)
            .fold(0, |acc, g| acc | g.rights)
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    System,
    User,
}

/// One keep/purge rule. System policies are referenced by id; user
/// policies carry their own lifetime (e.g. `"30d"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub kind: PolicyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<String>,
}

impl Policy {
    pub fn system(id: impl Into<String>) -> Self {
        Self {
            kind: PolicyKind::System,
            id: Some(id.into()),
            name: None,
            lifetime: None,
        }
    }

    pub fn user(lifetime: impl Into<String>) -> Self {
        Self {
            kind: PolicyKind::User,
            id: None,
            name: None,
            lifetime: Some(lifetime.into()),
        }
    }
}

/// Retention policy of a folder or item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    #[serde(default)]
    pub keep: Vec<Policy>,
    #[serde(default)]
    pub purge: Vec<Policy>,
}

impl RetentionPolicy {
    pub fn is_set(&self) -> bool {
        !self.keep.is_empty() || !self.purge.is_empty()
    }
}

/// Tags split into plain tags and smart folders, deduplicated in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTags {
    tags: Vec<String>,
    smart_folders: Vec<String>,
}

impl NormalizedTags {
    pub fn new<T, S>(tags: T, smart_folders: S) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            tags: dedup(tags),
            smart_folders: dedup(smart_folders),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn smart_folders(&self) -> &[String] {
        &self.smart_folders
    }
}

fn dedup<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.into();
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_type_names_round_trip() {
        for (ty, name) in ITEM_TYPE_NAMES {
            assert_eq!(ty.to_string(), *name);
            assert_eq!(name.parse::<ItemType>().unwrap(), *ty);
        }
        assert!("bogus".parse::<ItemType>().is_err());
    }

    #[test]
    fn color_codes() {
        assert_eq!(Color::mapped(3).unwrap().to_metadata(), 3);
        assert!(Color::mapped(10).is_none());
        let teal = Color::rgb(0x00, 0x80, 0x80);
        assert_eq!(teal.to_metadata(), 0x0100_8080);
        assert_eq!(Color::from_metadata(0x0100_8080).unwrap(), teal);
        assert_eq!(Color::from_metadata(0).unwrap(), Color::Mapped(0));
        assert!(Color::from_metadata(42).is_err());
        assert!(Color::from_metadata(-1).is_ok()); // all bits set: RGB white
    }

    #[test]
    fn acl_grant_and_revoke() {
        let mut acl = Acl::new();
        acl.grant("alice", GranteeType::User, rights::READ)
            .grant("bob", GranteeType::User, rights::READ | rights::WRITE);
        acl.grant("alice", GranteeType::User, rights::ADMIN);

        assert_eq!(acl.grants.len(), 2);
        assert_eq!(acl.rights_for("alice"), rights::ADMIN);
        assert!(acl.revoke("bob"));
        assert!(!acl.revoke("bob"));
        assert_eq!(acl.rights_for("bob"), 0);
    }

    #[test]
    fn normalized_tags_dedup_in_order() {
        let tags = NormalizedTags::new(["b", "a", "b"], ["sf"]);
        assert_eq!(tags.tags(), ["b", "a"]);
        assert_eq!(tags.smart_folders(), ["sf"]);
    }
}

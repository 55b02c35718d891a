use serde::{Deserialize, Serialize};

use super::types::{Flag, ItemType};
use super::StateError;

/// Canonical local representation of a mailbox item, as loaded from durable
/// storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub id: i32,
    pub mailbox_id: i32,
    pub item_type: ItemType,
    pub parent_id: i32,
    pub folder_id: i32,
    pub index_id: i32,
    pub imap_id: i32,
    pub prev_folders: Option<String>,
    pub locator: Option<String>,
    pub blob_digest: Option<String>,
    pub mod_metadata: i32,
    pub mod_content: i32,
    pub date: i32,
    pub date_changed: i32,
    pub flags: i32,
    pub tags: Vec<String>,
    pub smart_folders: Vec<String>,
    pub size: i64,
    pub unread_count: i32,
    pub metadata: Option<String>,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub uuid: Option<String>,
}

impl ItemData {
    pub fn new(mailbox_id: i32, id: i32, item_type: ItemType) -> Self {
        Self {
            id,
            mailbox_id,
            item_type,
            parent_id: -1,
            folder_id: -1,
            index_id: -1,
            imap_id: -1,
            prev_folders: None,
            locator: None,
            blob_digest: None,
            mod_metadata: 0,
            mod_content: 0,
            date: 0,
            date_changed: 0,
            flags: 0,
            tags: Vec::new(),
            smart_folders: Vec::new(),
            size: 0,
            unread_count: 0,
            metadata: None,
            name: None,
            subject: None,
            uuid: None,
        }
    }

    pub fn is_set(&self, flag: Flag) -> bool {
        self.flags & flag.bitmask() != 0
    }

    pub fn set_flag(&mut self, flag: Flag) -> &mut Self {
        self.flags |= flag.bitmask();
        self
    }

    pub fn unset_flag(&mut self, flag: Flag) -> &mut Self {
        self.flags &= !flag.bitmask();
        self
    }
}

/// Source of the serialized full-entity blob pushed to the shared tier as a
/// fallback during resync.
pub trait EncodeMetadata {
    fn encode_metadata(&self) -> Result<String, StateError>;
}

impl EncodeMetadata for ItemData {
    fn encode_metadata(&self) -> Result<String, StateError> {
        serde_json::to_string(self).map_err(|e| StateError::Snapshot(e.to_string()))
    }
}

//! Static field tables per entity kind.

use tracing::warn;

use super::field::{Binding, ItemField};
use super::types::ItemType;

pub const F_NAME: &str = "name";
pub const F_TYPE: &str = "type";
pub const F_UUID: &str = "uuid";
pub const F_SUBJECT: &str = "subject";
pub const F_PARENT_ID: &str = "parentId";
pub const F_FOLDER_ID: &str = "folderId";
pub const F_INDEX_ID: &str = "indexId";
pub const F_IMAP_ID: &str = "imapId";
pub const F_PREV_FOLDERS: &str = "prevFolders";
pub const F_LOCATOR: &str = "locator";
pub const F_BLOB_DIGEST: &str = "blobDigest";
pub const F_MOD_METADATA: &str = "modMetadata";
pub const F_MOD_CONTENT: &str = "modContent";
pub const F_DATE: &str = "date";
pub const F_DATE_CHANGED: &str = "dateChanged";
pub const F_FLAGS: &str = "flags";
pub const F_TAGS: &str = "tags";
pub const F_SMART_FOLDERS: &str = "smartFolders";
pub const F_SIZE: &str = "size";
pub const F_METADATA: &str = "metadata";
pub const F_UNREAD_COUNT: &str = "unreadCount";
pub const F_METADATA_VERSION: &str = "metadataVersion";
pub const F_VERSION: &str = "version";
pub const F_COLOR: &str = "color";
pub const F_RIGHTS: &str = "rights";
pub const F_RETENTION_POLICY: &str = "retentionPolicy";

macro_rules! str_field {
    ($name:expr, $($path:ident).+) => {
        ItemField::new(
            $name,
            Binding::Str {
                get: |l| l.$($path).+.clone(),
                set: |l, v| l.$($path).+ = v,
            },
        )
    };
}

macro_rules! int_field {
    ($name:expr, $($path:ident).+) => {
        ItemField::new(
            $name,
            Binding::Int {
                get: |l| l.$($path).+,
                set: |l, v| l.$($path).+ = v,
            },
        )
    };
}

/// Ordered set of field slots an entity kind carries.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<ItemField>,
}

impl Schema {
    /// Every attribute of a mailbox item.
    pub fn mail_item() -> Self {
        let fields = vec![
            str_field!(F_NAME, data.name),
            ItemField::new(
                F_TYPE,
                Binding::Str {
                    get: |l| Some(l.data.item_type.as_str().to_string()),
                    set: |l, v| match v.as_deref().map(str::parse::<ItemType>) {
                        Some(Ok(item_type)) => l.data.item_type = item_type,
                        Some(Err(_)) => warn!(value = ?v, "ignoring unknown item type"),
                        None => {}
                    },
                },
            ),
            str_field!(F_UUID, data.uuid),
            str_field!(F_SUBJECT, data.subject),
            int_field!(F_PARENT_ID, data.parent_id),
            int_field!(F_FOLDER_ID, data.folder_id),
            int_field!(F_INDEX_ID, data.index_id),
            int_field!(F_IMAP_ID, data.imap_id),
            str_field!(F_PREV_FOLDERS, data.prev_folders),
            str_field!(F_LOCATOR, data.locator),
            str_field!(F_BLOB_DIGEST, data.blob_digest),
            int_field!(F_MOD_METADATA, data.mod_metadata),
            int_field!(F_MOD_CONTENT, data.mod_content),
            int_field!(F_DATE, data.date),
            int_field!(F_DATE_CHANGED, data.date_changed),
            int_field!(F_FLAGS, data.flags).refreshing(),
            ItemField::new(
                F_TAGS,
                Binding::List {
                    get: |l| l.data.tags.clone(),
                    set: |l, v| l.data.tags = v,
                },
            ),
            ItemField::new(
                F_SMART_FOLDERS,
                Binding::List {
                    get: |l| l.data.smart_folders.clone(),
                    set: |l, v| l.data.smart_folders = v,
                },
            ),
            ItemField::new(
                F_SIZE,
                Binding::Long {
                    get: |l| l.data.size,
                    set: |l, v| l.data.size = v,
                },
            ),
            str_field!(F_METADATA, data.metadata),
            int_field!(F_UNREAD_COUNT, data.unread_count),
            int_field!(F_METADATA_VERSION, metadata_version),
            int_field!(F_VERSION, version),
            ItemField::new(
                F_COLOR,
                Binding::Color {
                    get: |l| l.color,
                    set: |l, v| l.color = v,
                },
            ),
            ItemField::new(
                F_RIGHTS,
                Binding::Rights {
                    get: |l| l.rights.clone(),
                    set: |l, v| l.rights = v,
                },
            ),
            ItemField::new(
                F_RETENTION_POLICY,
                Binding::Retention {
                    get: |l| l.retention_policy.clone(),
                    set: |l, v| l.retention_policy = v,
                },
            ),
        ];
        Self { fields }
    }

    /// The same schema minus the named fields. Accessors for a removed
    /// field log and fall back to a safe default.
    pub fn without(mut self, names: &[&str]) -> Self {
        self.fields.retain(|f| !names.contains(&f.name()));
        self
    }

    pub fn fields(&self) -> &[ItemField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::data::{EncodeMetadata, ItemData};
use super::field::{ItemField, ItemLocal};
use super::schema::*;
use super::types::{Acl, Color, Flag, ItemType, NormalizedTags, RetentionPolicy};
use super::value::{validate_list, FieldValue};
use super::{AccessMode, StateError};
use crate::store::SharedStateAccessor;

/// Outcome of [`MailItemState::resync_all`].
#[derive(Debug, Default, PartialEq)]
pub struct ResyncReport {
    /// Fields pushed to the mirror.
    pub synced: Vec<&'static str>,
    /// Fields whose push failed.
    pub failed: Vec<(&'static str, StateError)>,
    /// Whether the full-entity blob was pushed in place of the metadata field.
    pub snapshot_pushed: bool,
}

impl ResyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Mutable state of one mailbox item, optionally mirrored in a shared store.
///
/// Callers hold the item's external lock for the lifetime of the borrow;
/// nothing in here synchronizes. Read accessors take `&mut self` because a
/// read through an attached mirror overwrites the cached local value.
///
/// ```text
///   accessor ──► ItemField ──► local binding (ItemLocal)
///                    │
///                    └──────► SharedStateAccessor (one per item, shared)
/// ```
pub struct MailItemState {
    local: ItemLocal,
    shared: Option<Arc<dyn SharedStateAccessor>>,
    fields: HashMap<&'static str, ItemField>,
    order: Vec<&'static str>,
}

impl MailItemState {
    pub fn new(data: ItemData) -> Self {
        Self::with_schema(data, &Schema::mail_item())
    }

    pub fn with_schema(data: ItemData, schema: &Schema) -> Self {
        let fields = schema.fields().iter().map(|f| (f.name(), *f)).collect();
        let order = schema.fields().iter().map(|f| f.name()).collect();
        Self {
            local: ItemLocal::new(data),
            shared: None,
            fields,
            order,
        }
    }

    /// The local item data as last written or read through.
    ///
    /// While attached to a mirror that is in use, a field missing from the
    /// mirror reads as empty through the typed accessors (0 for numbers) but
    /// leaves the old local value here, so the two can disagree.
    pub fn data(&self) -> &ItemData {
        &self.local.data
    }

    pub fn id(&self) -> i32 {
        self.local.data.id
    }

    pub fn mailbox_id(&self) -> i32 {
        self.local.data.mailbox_id
    }

    // --- mirror lifecycle -------------------------------------------------

    /// Point every field at `mirror`, replacing any previous one. Nothing is
    /// pushed; use [`resync_all`](Self::resync_all) for that.
    pub fn attach_remote_mirror(&mut self, mirror: Arc<dyn SharedStateAccessor>) {
        debug!(mailbox = self.mailbox_id(), item = self.id(), ?mirror, "attaching shared mirror");
        self.shared = Some(mirror);
    }

    pub fn has_remote_mirror(&self) -> bool {
        self.shared.is_some()
    }

    /// Delete the mirrored namespace and drop the mirror. The handle is
    /// dropped even when the delete fails.
    pub fn detach_remote_mirror(&mut self) -> Result<(), StateError> {
        let Some(shared) = self.shared.take() else {
            return Ok(());
        };
        debug!(mailbox = self.mailbox_id(), item = self.id(), "detaching shared mirror");
        shared.delete().map_err(|e| {
            warn!(mailbox = self.mailbox_id(), item = self.id(), error = %e, "mirror delete failed");
            StateError::backend("*", e)
        })
    }

    /// Push every field with a meaningful local value to the mirror. When
    /// the metadata field had nothing to push, the encoded `snapshot` is
    /// pushed in its place.
    pub fn resync_all(&mut self, snapshot: &dyn EncodeMetadata) -> ResyncReport {
        let mut report = ResyncReport::default();
        if self.shared.is_none() {
            return report;
        }
        let mut metadata_synced = false;
        for name in self.order.clone() {
            let Some(field) = self.fields.get(name).copied() else {
                continue;
            };
            match field.sync(&mut self.local, self.shared.as_deref()) {
                Ok(true) => {
                    metadata_synced |= name == F_METADATA;
                    report.synced.push(name);
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(field = name, error = %err, "resync failed");
                    report.failed.push((name, err));
                }
            }
        }
        if !metadata_synced {
            match self.push_snapshot(snapshot) {
                Ok(pushed) => report.snapshot_pushed = pushed,
                Err(err) => {
                    warn!(error = %err, "snapshot push failed");
                    report.failed.push((F_METADATA, err));
                }
            }
        }
        debug!(
            mailbox = self.mailbox_id(),
            item = self.id(),
            synced = report.synced.len(),
            failed = report.failed.len(),
            "resync finished"
        );
        report
    }

    fn push_snapshot(&mut self, snapshot: &dyn EncodeMetadata) -> Result<bool, StateError> {
        let Ok(field) = self.field(F_METADATA) else {
            return Ok(false);
        };
        let blob = snapshot.encode_metadata()?;
        field.set(
            &mut self.local,
            self.shared.as_deref(),
            FieldValue::Str(Some(blob)),
            AccessMode::RemoteOnly,
        )?;
        Ok(true)
    }

    // --- generic field access ---------------------------------------------

    pub fn field(&self, name: &str) -> Result<ItemField, StateError> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| StateError::UnknownField(name.to_string()))
    }

    pub fn get_value(&mut self, name: &str) -> Result<FieldValue, StateError> {
        let field = self.field(name)?;
        Ok(field.get(&mut self.local, self.shared.as_deref()))
    }

    /// Unmasked write: remote failures are returned to the caller.
    pub fn set_value(&mut self, name: &str, value: FieldValue, mode: AccessMode) -> Result<(), StateError> {
        let field = self.field(name)?;
        field.set(&mut self.local, self.shared.as_deref(), value, mode)
    }

    /// Clear a field locally and remove it from the mirror.
    pub fn unset_field(&mut self, name: &str) -> Result<(), StateError> {
        let field = self.field(name)?;
        field.unset(&mut self.local, self.shared.as_deref())
    }

    fn value(&mut self, name: &str) -> Option<FieldValue> {
        match self.get_value(name) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(field = name, error = %err, "field read failed");
                None
            }
        }
    }

    fn write(&mut self, name: &str, value: FieldValue, mode: AccessMode) {
        if let Err(err) = self.set_value(name, value, mode) {
            if err.is_backend() {
                warn!(field = name, error = %err, "shared write failed, local value kept");
            } else {
                error!(field = name, error = %err, "field write failed");
            }
        }
    }

    fn refresh(&mut self, name: &str) {
        let refreshed = self
            .field(name)
            .and_then(|field| field.refresh(&mut self.local, self.shared.as_deref()));
        if let Err(err) = refreshed {
            warn!(field = name, error = %err, "refresh failed, using local value");
        }
    }

    fn int(&mut self, name: &str) -> i32 {
        match self.value(name) {
            Some(FieldValue::Int(Some(n))) => n,
            other => {
                error!(field = name, value = ?other, "missing int value, answering 0");
                0
            }
        }
    }

    fn long(&mut self, name: &str) -> i64 {
        match self.value(name) {
            Some(FieldValue::Long(Some(n))) => n,
            other => {
                error!(field = name, value = ?other, "missing long value, answering 0");
                0
            }
        }
    }

    fn string(&mut self, name: &str) -> Option<String> {
        match self.value(name) {
            Some(FieldValue::Str(s)) => s,
            Some(other) => {
                error!(field = name, value = ?other, "not a string field");
                None
            }
            None => None,
        }
    }

    fn list(&mut self, name: &str) -> Vec<String> {
        match self.value(name) {
            Some(FieldValue::List(items)) => items.unwrap_or_default(),
            Some(other) => {
                error!(field = name, value = ?other, "not a list field");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    // --- typed accessors --------------------------------------------------

    pub fn name(&mut self) -> Option<String> {
        self.string(F_NAME)
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.write(F_NAME, FieldValue::Str(name), AccessMode::Default);
    }

    pub fn item_type(&mut self) -> ItemType {
        self.string(F_TYPE)
            .and_then(|name| name.parse().ok())
            .unwrap_or(self.local.data.item_type)
    }

    pub fn set_item_type(&mut self, item_type: ItemType) {
        self.write(F_TYPE, FieldValue::Str(Some(item_type.as_str().to_string())), AccessMode::Default);
    }

    pub fn uuid(&mut self) -> Option<String> {
        self.string(F_UUID)
    }

    pub fn set_uuid(&mut self, uuid: Option<String>) {
        self.write(F_UUID, FieldValue::Str(uuid), AccessMode::Default);
    }

    pub fn subject(&mut self) -> Option<String> {
        self.string(F_SUBJECT)
    }

    pub fn set_subject(&mut self, subject: Option<String>) {
        self.write(F_SUBJECT, FieldValue::Str(subject), AccessMode::Default);
    }

    pub fn parent_id(&mut self) -> i32 {
        self.int(F_PARENT_ID)
    }

    pub fn set_parent_id(&mut self, id: i32) {
        self.write(F_PARENT_ID, FieldValue::Int(Some(id)), AccessMode::Default);
    }

    pub fn folder_id(&mut self) -> i32 {
        self.int(F_FOLDER_ID)
    }

    pub fn set_folder_id(&mut self, id: i32) {
        self.write(F_FOLDER_ID, FieldValue::Int(Some(id)), AccessMode::Default);
    }

    pub fn index_id(&mut self) -> i32 {
        self.int(F_INDEX_ID)
    }

    pub fn set_index_id(&mut self, id: i32) {
        self.write(F_INDEX_ID, FieldValue::Int(Some(id)), AccessMode::Default);
    }

    pub fn imap_id(&mut self) -> i32 {
        self.int(F_IMAP_ID)
    }

    pub fn set_imap_id(&mut self, id: i32) {
        self.write(F_IMAP_ID, FieldValue::Int(Some(id)), AccessMode::Default);
    }

    pub fn prev_folders(&mut self) -> Option<String> {
        self.string(F_PREV_FOLDERS)
    }

    pub fn set_prev_folders(&mut self, prev_folders: Option<String>) {
        self.write(F_PREV_FOLDERS, FieldValue::Str(prev_folders), AccessMode::Default);
    }

    pub fn locator(&mut self) -> Option<String> {
        self.string(F_LOCATOR)
    }

    pub fn set_locator(&mut self, locator: Option<String>) {
        self.write(F_LOCATOR, FieldValue::Str(locator), AccessMode::Default);
    }

    pub fn blob_digest(&mut self) -> Option<String> {
        self.string(F_BLOB_DIGEST)
    }

    pub fn set_blob_digest(&mut self, digest: Option<String>) {
        self.write(F_BLOB_DIGEST, FieldValue::Str(digest), AccessMode::Default);
    }

    pub fn mod_metadata(&mut self) -> i32 {
        self.int(F_MOD_METADATA)
    }

    pub fn set_mod_metadata(&mut self, change_id: i32) {
        self.write(F_MOD_METADATA, FieldValue::Int(Some(change_id)), AccessMode::Default);
    }

    pub fn mod_content(&mut self) -> i32 {
        self.int(F_MOD_CONTENT)
    }

    pub fn set_mod_content(&mut self, change_id: i32) {
        self.write(F_MOD_CONTENT, FieldValue::Int(Some(change_id)), AccessMode::Default);
    }

    pub fn date(&mut self) -> i32 {
        self.int(F_DATE)
    }

    pub fn set_date(&mut self, date: i32) {
        self.write(F_DATE, FieldValue::Int(Some(date)), AccessMode::Default);
    }

    pub fn date_changed(&mut self) -> i32 {
        self.int(F_DATE_CHANGED)
    }

    pub fn set_date_changed(&mut self, date: i32) {
        self.write(F_DATE_CHANGED, FieldValue::Int(Some(date)), AccessMode::Default);
    }

    pub fn flags(&mut self) -> i32 {
        self.int(F_FLAGS)
    }

    pub fn set_flags(&mut self, flags: i32) {
        self.write(F_FLAGS, FieldValue::Int(Some(flags)), AccessMode::Default);
    }

    /// Whether `flag` is set, after reloading the bitmask from the mirror.
    pub fn is_set(&mut self, flag: Flag) -> bool {
        self.refresh(F_FLAGS);
        self.local.data.is_set(flag)
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.refresh(F_FLAGS);
        let flags = self.local.data.flags | flag.bitmask();
        self.set_flags(flags);
    }

    pub fn unset_flag(&mut self, flag: Flag) {
        self.refresh(F_FLAGS);
        let flags = self.local.data.flags & !flag.bitmask();
        self.set_flags(flags);
    }

    pub fn tags(&mut self) -> Vec<String> {
        self.list(F_TAGS)
    }

    /// Rejects elements that cannot be stored in the mirror's list
    /// encoding; nothing is written in that case.
    pub fn set_tags(&mut self, tags: Vec<String>) -> Result<(), StateError> {
        validate_list(F_TAGS, &tags)?;
        self.write(F_TAGS, FieldValue::List(Some(tags)), AccessMode::Default);
        Ok(())
    }

    pub fn smart_folders(&mut self) -> Vec<String> {
        self.list(F_SMART_FOLDERS)
    }

    pub fn set_smart_folders(&mut self, smart_folders: Vec<String>) -> Result<(), StateError> {
        validate_list(F_SMART_FOLDERS, &smart_folders)?;
        self.write(F_SMART_FOLDERS, FieldValue::List(Some(smart_folders)), AccessMode::Default);
        Ok(())
    }

    /// Replace tags and smart folders in the local data, then mirror both
    /// lists.
    pub fn set_normalized_tags(&mut self, tags: &NormalizedTags) -> Result<(), StateError> {
        validate_list(F_TAGS, tags.tags())?;
        validate_list(F_SMART_FOLDERS, tags.smart_folders())?;
        self.local.data.tags = tags.tags().to_vec();
        self.local.data.smart_folders = tags.smart_folders().to_vec();
        self.write(F_TAGS, FieldValue::List(Some(tags.tags().to_vec())), AccessMode::RemoteOnly);
        self.write(
            F_SMART_FOLDERS,
            FieldValue::List(Some(tags.smart_folders().to_vec())),
            AccessMode::RemoteOnly,
        );
        Ok(())
    }

    pub fn size(&mut self) -> i64 {
        self.long(F_SIZE)
    }

    pub fn set_size(&mut self, size: i64) {
        self.write(F_SIZE, FieldValue::Long(Some(size)), AccessMode::Default);
    }

    pub fn metadata(&mut self) -> Option<String> {
        self.string(F_METADATA)
    }

    pub fn set_metadata(&mut self, metadata: Option<String>) {
        self.write(F_METADATA, FieldValue::Str(metadata), AccessMode::Default);
    }

    /// Mirror a metadata blob that was just written to durable storage.
    pub fn record_saved_metadata(&mut self, metadata: &str) {
        if self.has_remote_mirror() {
            self.write(F_METADATA, FieldValue::Str(Some(metadata.to_string())), AccessMode::RemoteOnly);
        }
    }

    pub fn unread_count(&mut self) -> i32 {
        self.int(F_UNREAD_COUNT)
    }

    pub fn set_unread_count(&mut self, count: i32) {
        self.write(F_UNREAD_COUNT, FieldValue::Int(Some(count)), AccessMode::Default);
    }

    pub fn metadata_version(&mut self) -> i32 {
        self.int(F_METADATA_VERSION)
    }

    pub fn set_metadata_version(&mut self, version: i32) {
        self.set_metadata_version_with_mode(version, AccessMode::Default);
    }

    pub fn set_metadata_version_with_mode(&mut self, version: i32, mode: AccessMode) {
        self.write(F_METADATA_VERSION, FieldValue::Int(Some(version)), mode);
    }

    /// Read-then-write; callers serialize through the item lock.
    pub fn increment_metadata_version(&mut self) -> i32 {
        let next = self.metadata_version() + 1;
        self.set_metadata_version(next);
        next
    }

    pub fn version(&mut self) -> i32 {
        self.int(F_VERSION)
    }

    pub fn set_version(&mut self, version: i32) {
        self.set_version_with_mode(version, AccessMode::Default);
    }

    pub fn set_version_with_mode(&mut self, version: i32, mode: AccessMode) {
        self.write(F_VERSION, FieldValue::Int(Some(version)), mode);
    }

    pub fn increment_version(&mut self) -> i32 {
        let next = self.version() + 1;
        self.set_version(next);
        next
    }

    pub fn color(&mut self) -> Option<Color> {
        match self.value(F_COLOR) {
            Some(FieldValue::Color(color)) => color,
            _ => None,
        }
    }

    pub fn set_color(&mut self, color: Option<Color>) {
        self.set_color_with_mode(color, AccessMode::Default);
    }

    pub fn set_color_with_mode(&mut self, color: Option<Color>, mode: AccessMode) {
        self.write(F_COLOR, FieldValue::Color(color), mode);
    }

    pub fn rights(&mut self) -> Option<Acl> {
        match self.value(F_RIGHTS) {
            Some(FieldValue::Rights(acl)) => acl,
            _ => None,
        }
    }

    pub fn set_rights(&mut self, rights: Option<Acl>) {
        self.set_rights_with_mode(rights, AccessMode::Default);
    }

    pub fn set_rights_with_mode(&mut self, rights: Option<Acl>, mode: AccessMode) {
        self.write(F_RIGHTS, FieldValue::Rights(rights), mode);
    }

    pub fn retention_policy(&mut self) -> Option<RetentionPolicy> {
        match self.value(F_RETENTION_POLICY) {
            Some(FieldValue::Retention(policy)) => policy,
            _ => None,
        }
    }

    pub fn set_retention_policy(&mut self, policy: Option<RetentionPolicy>) {
        self.set_retention_policy_with_mode(policy, AccessMode::Default);
    }

    pub fn set_retention_policy_with_mode(&mut self, policy: Option<RetentionPolicy>, mode: AccessMode) {
        self.write(F_RETENTION_POLICY, FieldValue::Retention(policy), mode);
    }
}

impl fmt::Debug for MailItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailItemState")
            .field("version", &self.local.version)
            .field("metadata_version", &self.local.metadata_version)
            .field("data", &self.local.data)
            .field("color", &self.local.color)
            .field("retention_policy", &self.local.retention_policy)
            .field("mirror", &self.shared)
            .finish()
    }
}

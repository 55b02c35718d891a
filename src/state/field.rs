//! Field slots: one named attribute of an item with a local binding and an
//! optional shared mirror.
//!
//! A slot never owns the mirror. `MailItemState` keeps the single
//! `SharedStateAccessor` of the entity and lends it to whichever slot is
//! being operated on, so detaching once detaches every slot.

use tracing::{debug, error, warn};

use super::data::ItemData;
use super::types::{Acl, Color, RetentionPolicy};
use super::value::{validate_list, FieldType, FieldValue};
use super::{AccessMode, StateError};
use crate::store::SharedStateAccessor;

/// Everything a slot can bind to: the canonical item data plus the
/// attributes that only live on the state object.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemLocal {
    pub(crate) data: ItemData,
    pub(crate) version: i32,
    pub(crate) metadata_version: i32,
    pub(crate) color: Option<Color>,
    pub(crate) rights: Option<Acl>,
    pub(crate) retention_policy: Option<RetentionPolicy>,
}

impl ItemLocal {
    pub(crate) fn new(data: ItemData) -> Self {
        Self {
            data,
            version: 1,
            metadata_version: 1,
            color: None,
            rights: None,
            retention_policy: None,
        }
    }
}

/// Typed accessors into `ItemLocal`, tagged by value type.
#[derive(Clone, Copy)]
pub(crate) enum Binding {
    Str {
        get: fn(&ItemLocal) -> Option<String>,
        set: fn(&mut ItemLocal, Option<String>),
    },
    Int {
        get: fn(&ItemLocal) -> i32,
        set: fn(&mut ItemLocal, i32),
    },
    Long {
        get: fn(&ItemLocal) -> i64,
        set: fn(&mut ItemLocal, i64),
    },
    List {
        get: fn(&ItemLocal) -> Vec<String>,
        set: fn(&mut ItemLocal, Vec<String>),
    },
    Color {
        get: fn(&ItemLocal) -> Option<Color>,
        set: fn(&mut ItemLocal, Option<Color>),
    },
    Rights {
        get: fn(&ItemLocal) -> Option<Acl>,
        set: fn(&mut ItemLocal, Option<Acl>),
    },
    Retention {
        get: fn(&ItemLocal) -> Option<RetentionPolicy>,
        set: fn(&mut ItemLocal, Option<RetentionPolicy>),
    },
}

impl Binding {
    fn field_type(&self) -> FieldType {
        match self {
            Binding::Str { .. } => FieldType::Str,
            Binding::Int { .. } => FieldType::Int,
            Binding::Long { .. } => FieldType::Long,
            Binding::List { .. } => FieldType::List,
            Binding::Color { .. } => FieldType::Color,
            Binding::Rights { .. } => FieldType::Rights,
            Binding::Retention { .. } => FieldType::Retention,
        }
    }
}

/// One named, typed, dual-backed item attribute.
#[derive(Clone, Copy)]
pub struct ItemField {
    name: &'static str,
    binding: Binding,
    refreshes_local: bool,
}

impl ItemField {
    pub(crate) fn new(name: &'static str, binding: Binding) -> Self {
        Self {
            name,
            binding,
            refreshes_local: false,
        }
    }

    /// Mark the field as backing a derived local representation that must
    /// be reloaded from the shared tier before it is mutated.
    pub(crate) fn refreshing(mut self) -> Self {
        self.refreshes_local = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.binding.field_type()
    }

    pub fn refreshes_local(&self) -> bool {
        self.refreshes_local
    }

    pub(crate) fn get_local(&self, local: &ItemLocal) -> FieldValue {
        match self.binding {
            Binding::Str { get, .. } => FieldValue::Str(get(local)),
            Binding::Int { get, .. } => FieldValue::Int(Some(get(local))),
            Binding::Long { get, .. } => FieldValue::Long(Some(get(local))),
            Binding::List { get, .. } => FieldValue::List(Some(get(local))),
            Binding::Color { get, .. } => FieldValue::Color(get(local)),
            Binding::Rights { get, .. } => FieldValue::Rights(get(local)),
            Binding::Retention { get, .. } => FieldValue::Retention(get(local)),
        }
    }

    /// Write the local binding. A null offered to a primitive binding keeps
    /// the current value.
    pub(crate) fn set_local(&self, local: &mut ItemLocal, value: FieldValue) -> Result<(), StateError> {
        match (self.binding, value) {
            (Binding::Str { set, .. }, FieldValue::Str(v)) => set(local, v),
            (Binding::Int { set, get }, FieldValue::Int(v)) => {
                let current = get(local);
                set(local, self.keep_current(v, current));
            }
            (Binding::Long { set, get }, FieldValue::Long(v)) => {
                let current = get(local);
                set(local, self.keep_current(v, current));
            }
            (Binding::List { set, .. }, FieldValue::List(v)) => set(local, v.unwrap_or_default()),
            (Binding::Color { set, .. }, FieldValue::Color(v)) => set(local, v),
            (Binding::Rights { set, .. }, FieldValue::Rights(v)) => set(local, v),
            (Binding::Retention { set, .. }, FieldValue::Retention(v)) => set(local, v),
            (_, other) => {
                return Err(StateError::TypeMismatch {
                    field: self.name.to_string(),
                    expected: self.field_type().as_str(),
                    actual: other.field_type().as_str(),
                })
            }
        }
        Ok(())
    }

    fn keep_current<T: Copy + std::fmt::Debug>(&self, value: Option<T>, current: T) -> T {
        match value {
            Some(v) => v,
            None => {
                warn!(field = self.name, ?current, "null offered to primitive field, keeping current value");
                current
            }
        }
    }

    /// Write the value to the local binding and/or the shared mirror
    /// according to `mode`.
    ///
    /// The local write happens first; a failing remote write is returned
    /// but does not undo it.
    pub(crate) fn set(
        &self,
        local: &mut ItemLocal,
        shared: Option<&dyn SharedStateAccessor>,
        value: FieldValue,
        mode: AccessMode,
    ) -> Result<(), StateError> {
        self.field_type().check(self.name, &value)?;
        if let FieldValue::List(Some(items)) = &value {
            validate_list(self.name, items)?;
        }
        let remote = match shared {
            Some(shared) if mode.writes_remote() => Some((shared, self.field_type().encode(self.name, &value)?)),
            _ => None,
        };
        if mode.writes_local() {
            self.set_local(local, value)?;
        }
        if let Some((shared, encoded)) = remote {
            debug!(field = self.name, ?mode, "writing shared field");
            let written = match encoded {
                Some(raw) => shared.set(self.name, raw),
                None => shared.unset(self.name),
            };
            written.map_err(|e| StateError::backend(self.name, e))?;
        }
        Ok(())
    }

    /// Read the shared value, if it should win over the local one.
    ///
    /// `Ok(None)` means "use local": the key is absent and nobody holds the
    /// entity hot. A value that fails to decode counts as absent.
    pub(crate) fn read_shared(&self, shared: &dyn SharedStateAccessor) -> Result<Option<FieldValue>, StateError> {
        let raw = shared
            .get(self.name)
            .map_err(|e| StateError::backend(self.name, e))?;
        let decoded = match raw {
            None => None,
            Some(raw) => match self.field_type().decode(self.name, Some(&raw)) {
                Ok(value) => Some(value),
                Err(err) => {
                    error!(field = self.name, error = %err, "treating undecodable shared value as absent");
                    None
                }
            },
        };
        if decoded.is_some() {
            return Ok(decoded);
        }
        let in_use = shared
            .is_in_use()
            .map_err(|e| StateError::backend(self.name, e))?;
        Ok(in_use.then(|| self.field_type().empty()))
    }

    /// Current value. With a mirror attached the shared value wins and is
    /// cached locally; any failure falls back to the local value.
    pub(crate) fn get(&self, local: &mut ItemLocal, shared: Option<&dyn SharedStateAccessor>) -> FieldValue {
        let Some(shared) = shared else {
            return self.get_local(local);
        };
        match self.read_shared(shared) {
            Ok(Some(value)) => {
                if let Err(err) = self.set_local(local, value.clone()) {
                    error!(field = self.name, error = %err, "cannot cache shared value locally");
                }
                value
            }
            Ok(None) => self.get_local(local),
            Err(err) => {
                warn!(field = self.name, error = %err, "using local value");
                self.get_local(local)
            }
        }
    }

    /// Reload the local binding from the shared tier for fields that need
    /// it; a no-op for the rest. An absent shared value leaves local as is.
    pub(crate) fn refresh(&self, local: &mut ItemLocal, shared: Option<&dyn SharedStateAccessor>) -> Result<(), StateError> {
        let Some(shared) = shared.filter(|_| self.refreshes_local) else {
            return Ok(());
        };
        let raw = shared
            .get(self.name)
            .map_err(|e| StateError::backend(self.name, e))?;
        if raw.is_none() {
            return Ok(());
        }
        let value = self.field_type().decode(self.name, raw.as_ref())?;
        self.set_local(local, value)
    }

    /// Push a meaningful local value to the mirror. Returns whether it did.
    pub(crate) fn sync(&self, local: &mut ItemLocal, shared: Option<&dyn SharedStateAccessor>) -> Result<bool, StateError> {
        let value = self.get_local(local);
        match shared {
            Some(shared) if self.field_type().has_data(&value) => {
                self.set(local, Some(shared), value, AccessMode::RemoteOnly)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Clear the local value and remove the shared key.
    pub(crate) fn unset(&self, local: &mut ItemLocal, shared: Option<&dyn SharedStateAccessor>) -> Result<(), StateError> {
        self.set(local, None, self.field_type().empty_local(), AccessMode::LocalOnly)?;
        if let Some(shared) = shared {
            shared
                .unset(self.name)
                .map_err(|e| StateError::backend(self.name, e))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ItemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemField")
            .field("name", &self.name)
            .field("type", &self.field_type())
            .field("refreshes_local", &self.refreshes_local)
            .finish()
    }
}

impl FieldType {
    /// Value written locally by `unset`. Primitive bindings reset to zero
    /// rather than keeping their current value.
    fn empty_local(self) -> FieldValue {
        match self {
            FieldType::Int => FieldValue::Int(Some(0)),
            FieldType::Long => FieldValue::Long(Some(0)),
            FieldType::List => FieldValue::List(None),
            other => other.empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::ItemType;
    use crate::store::{DistributedSharedState, InMemoryKeyValueClient, StoreValue};
    use std::sync::Arc;

    fn subject_field() -> ItemField {
        ItemField::new(
            "subject",
            Binding::Str {
                get: |l| l.data.subject.clone(),
                set: |l, v| l.data.subject = v,
            },
        )
    }

    fn flags_field() -> ItemField {
        ItemField::new(
            "flags",
            Binding::Int {
                get: |l| l.data.flags,
                set: |l, v| l.data.flags = v,
            },
        )
        .refreshing()
    }

    fn local() -> ItemLocal {
        ItemLocal::new(ItemData::new(1, 100, ItemType::Message))
    }

    fn mirror(client: &InMemoryKeyValueClient) -> DistributedSharedState {
        DistributedSharedState::for_item(Arc::new(client.clone()), 1, 100)
    }

    #[test]
    fn unattached_slot_is_a_plain_variable() {
        let field = subject_field();
        let mut local = local();
        field
            .set(&mut local, None, FieldValue::Str(Some("hi".into())), AccessMode::Default)
            .unwrap();
        assert_eq!(field.get(&mut local, None), FieldValue::Str(Some("hi".into())));
    }

    #[test]
    fn remote_only_write_leaves_local_alone() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = subject_field();
        let mut local = local();

        field
            .set(&mut local, Some(&shared), FieldValue::Str(Some("remote".into())), AccessMode::RemoteOnly)
            .unwrap();
        assert_eq!(local.data.subject, None);
        assert_eq!(shared.get("subject").unwrap(), Some(StoreValue::from("remote")));
    }

    #[test]
    fn local_only_write_skips_mirror() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = subject_field();
        let mut local = local();

        field
            .set(&mut local, Some(&shared), FieldValue::Str(Some("local".into())), AccessMode::LocalOnly)
            .unwrap();
        assert_eq!(local.data.subject.as_deref(), Some("local"));
        assert!(!client.namespace_exists("mbox:1:item:100"));
    }

    #[test]
    fn in_use_mirror_wins_even_when_key_is_absent() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = subject_field();
        let mut local = local();
        local.data.subject = Some("stale".into());

        shared.set("flags", StoreValue::Int(1)).unwrap();
        assert_eq!(field.get(&mut local, Some(&shared)), FieldValue::Str(None));
        assert_eq!(local.data.subject, None);
    }

    #[test]
    fn failed_remote_write_keeps_local_write() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = subject_field();
        let mut local = local();
        client.set_available(false);

        let err = field
            .set(&mut local, Some(&shared), FieldValue::Str(Some("x".into())), AccessMode::Default)
            .unwrap_err();
        assert!(err.is_backend());
        assert_eq!(local.data.subject.as_deref(), Some("x"));
    }

    #[test]
    fn read_failure_falls_back_to_local() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = flags_field();
        let mut local = local();
        local.data.flags = 3;
        shared.set("flags", StoreValue::Int(9)).unwrap();
        client.set_available(false);

        assert!(field.read_shared(&shared).is_err());
        assert_eq!(field.get(&mut local, Some(&shared)), FieldValue::Int(Some(3)));
    }

    #[test]
    fn refresh_reloads_only_refreshing_fields() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let mut local = local();
        shared.set("flags", StoreValue::Int(6)).unwrap();
        shared.set("subject", StoreValue::from("remote")).unwrap();

        flags_field().refresh(&mut local, Some(&shared)).unwrap();
        subject_field().refresh(&mut local, Some(&shared)).unwrap();
        assert_eq!(local.data.flags, 6);
        assert_eq!(local.data.subject, None);
    }

    #[test]
    fn null_int_keeps_current_local() {
        let field = flags_field();
        let mut local = local();
        local.data.flags = 12;
        field.set_local(&mut local, FieldValue::Int(None)).unwrap();
        assert_eq!(local.data.flags, 12);
    }

    #[test]
    fn sync_requires_mirror_and_data() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = subject_field();
        let mut local = local();

        assert!(!field.sync(&mut local, Some(&shared)).unwrap());
        local.data.subject = Some("s".into());
        assert!(!field.sync(&mut local, None).unwrap());
        assert!(field.sync(&mut local, Some(&shared)).unwrap());
        assert_eq!(shared.get("subject").unwrap(), Some(StoreValue::from("s")));
    }

    #[test]
    fn unset_clears_both_tiers() {
        let client = InMemoryKeyValueClient::new();
        let shared = mirror(&client);
        let field = flags_field();
        let mut local = local();
        field
            .set(&mut local, Some(&shared), FieldValue::Int(Some(5)), AccessMode::Default)
            .unwrap();

        field.unset(&mut local, Some(&shared)).unwrap();
        assert_eq!(local.data.flags, 0);
        assert_eq!(shared.get("flags").unwrap(), None);
    }

    #[test]
    fn wrong_type_is_rejected_before_any_write() {
        let field = flags_field();
        let mut local = local();
        let err = field
            .set(&mut local, None, FieldValue::Str(Some("x".into())), AccessMode::Default)
            .unwrap_err();
        assert!(matches!(err, StateError::TypeMismatch { .. }));
    }
}

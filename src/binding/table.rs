//! Binding table: the arena of field bindings and its key index.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::coerce::{Coerce, CoercionError};

/// Callback invoked after a field update with `(config, local_key, value)`.
pub type Handler<T> = Arc<dyn Fn(&T, &str, &str) + Send + Sync>;

/// Coerces text and swaps the result into the shared configuration.
pub(crate) type FieldSetter<T> =
    Box<dyn Fn(&ArcSwap<T>, &str) -> Result<Arc<T>, CoercionError> + Send + Sync>;

/// Build a setter for the field reached through `accessor`.
///
/// The configuration is cloned, the field replaced, and the clone swapped in,
/// so readers never observe a partially written structure.
pub(crate) fn field_setter<T, F, A>(accessor: A) -> FieldSetter<T>
where
    T: Clone + Send + Sync + 'static,
    F: Coerce + Clone,
    A: Fn(&mut T) -> &mut F + Send + Sync + 'static,
{
    Box::new(move |state: &ArcSwap<T>, text: &str| {
        let value = F::coerce(text)?;
        let mut installed = None;
        state.rcu(|current| {
            let mut next = (**current).clone();
            *accessor(&mut next) = value.clone();
            let next = Arc::new(next);
            installed = Some(Arc::clone(&next));
            next
        });
        Ok(installed.unwrap_or_else(|| state.load_full()))
    })
}

/// Schema construction failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("key {0:?} is bound more than once")]
    DuplicateKey(String),
}

/// Index of a binding inside its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(usize);

/// One configuration field bound to one remote key.
pub struct Binding<T> {
    pub(crate) key: String,
    pub(crate) local_key: String,
    pub(crate) default: Option<String>,
    pub(crate) auto_watch: bool,
    pub(crate) handlers: Vec<Handler<T>>,
    pub(crate) kind: &'static str,
    pub(crate) setter: FieldSetter<T>,
}

impl<T> Binding<T> {
    /// Fully-qualified key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key as declared, before namespace joining.
    pub fn local_key(&self) -> &str {
        &self.local_key
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Whether a watcher runs for this key.
    pub fn auto_watch(&self) -> bool {
        self.auto_watch
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Semantic kind of the bound field.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl<T> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("local_key", &self.local_key)
            .field("default", &self.default)
            .field("auto_watch", &self.auto_watch)
            .field("handlers", &self.handlers.len())
            .field("kind", &self.kind)
            .finish()
    }
}

/// All bindings of a configuration structure, in declaration order.
pub struct BindingTable<T> {
    bindings: Vec<Binding<T>>,
    index: HashMap<String, BindingId>,
}

impl<T> BindingTable<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, binding: Binding<T>) -> Result<BindingId, SchemaError> {
        if self.index.contains_key(&binding.key) {
            return Err(SchemaError::DuplicateKey(binding.key));
        }
        let id = BindingId(self.bindings.len());
        self.index.insert(binding.key.clone(), id);
        self.bindings.push(binding);
        Ok(id)
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding<T>> {
        self.bindings.get(id.0)
    }

    /// Look up a binding by fully-qualified key.
    pub fn lookup(&self, key: &str) -> Option<&Binding<T>> {
        self.index.get(key).and_then(|id| self.get(*id))
    }

    pub fn id_of(&self, key: &str) -> Option<BindingId> {
        self.index.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding<T>)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, binding)| (BindingId(i), binding))
    }

    /// Ids of the bindings that need a watcher.
    pub fn watched(&self) -> impl Iterator<Item = BindingId> + '_ {
        self.iter()
            .filter(|(_, binding)| binding.auto_watch)
            .map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<T> fmt::Debug for BindingTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.bindings.iter()).finish()
    }
}

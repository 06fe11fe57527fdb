//! Process-wide table of message types.
//!
//! Generated code registers a type's `DescriptorArgs` up front; the descriptor itself is decoded on
//! first lookup and reused afterwards. Readers see an `ArcSwap` snapshot of the table, so lookups
//! never block registration.

use std::sync::Arc;

use arc_swap::ArcSwap;
use improto_core::DescriptorError;
use metrics::counter;
use once_cell::sync::{Lazy, OnceCell};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::message::{DescriptorArgs, MessageDescriptor};

/// Resolves a type id to its descriptor.
///
/// Submessage references cache only a weak handle to what `lookup` returns. Implementations
/// must keep each returned `Arc` alive for as long as descriptors referencing it are in use;
/// otherwise every resolution goes back to `lookup`. `DescriptorRegistry` holds its
/// descriptors for its whole lifetime.
pub trait DescriptorLookup: Send + Sync {
    fn lookup(&self, type_id: &str) -> Result<Arc<MessageDescriptor>, DescriptorError>;
}

struct Entry {
    args: DescriptorArgs,
    decoded: OnceCell<Arc<MessageDescriptor>>,
}

type Table = FxHashMap<Arc<str>, Arc<Entry>>;

#[derive(Default)]
pub struct DescriptorRegistry {
    table: ArcSwap<Table>,
}

static GLOBAL: Lazy<DescriptorRegistry> = Lazy::new(DescriptorRegistry::new);

impl DescriptorRegistry {
    pub fn new() -> Self { Self::default() }

    /// The registry shared by the whole process.
    pub fn global() -> &'static DescriptorRegistry { &GLOBAL }

    /// Register `type_id`. Registering the same id twice with identical arguments is a no-op.
    pub fn register(&self, type_id: &str, args: DescriptorArgs) -> Result<(), DescriptorError> {
        let mut outcome = Ok(());
        self.table.rcu(|current| {
            outcome = Ok(());
            if let Some(existing) = current.get(type_id) {
                if existing.args != args {
                    outcome = Err(DescriptorError::DuplicateType(type_id.to_string()));
                }
                return Arc::clone(current);
            }
            let mut next: Table = (**current).clone();
            next.insert(type_id.into(), Arc::new(Entry { args: args.clone(), decoded: OnceCell::new() }));
            Arc::new(next)
        });
        if outcome.is_ok() {
            debug!(type_id, "registered message type");
        }
        outcome
    }

    /// Decode every registered type now, surfacing the first malformed descriptor.
    pub fn decode_all(&self) -> Result<usize, DescriptorError> {
        let table = self.table.load_full();
        let mut ids: Vec<&Arc<str>> = table.keys().collect();
        ids.sort();
        for id in &ids {
            self.lookup(id)?;
        }
        Ok(ids.len())
    }

    pub fn contains(&self, type_id: &str) -> bool { self.table.load().contains_key(type_id) }

    pub fn len(&self) -> usize { self.table.load().len() }

    pub fn is_empty(&self) -> bool { self.table.load().is_empty() }

    /// Registered ids, sorted.
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.table.load().keys().map(|k| k.to_string()).collect();
        ids.sort();
        ids
    }

    pub fn get(&self, type_id: &str) -> Result<Arc<MessageDescriptor>, DescriptorError> { self.lookup(type_id) }
}

impl DescriptorLookup for DescriptorRegistry {
    fn lookup(&self, type_id: &str) -> Result<Arc<MessageDescriptor>, DescriptorError> {
        let entry = self
            .table
            .load()
            .get(type_id)
            .cloned()
            .ok_or_else(|| DescriptorError::UnknownType(type_id.to_string()))?;
        entry
            .decoded
            .get_or_try_init(|| {
                counter!("descriptor_decode_total", 1u64);
                match MessageDescriptor::decode(type_id, &entry.args) {
                    Ok(d) => Ok(Arc::new(d)),
                    Err(e) => {
                        counter!("descriptor_decode_errors_total", 1u64);
                        warn!(type_id, error = %e, "descriptor decode failed");
                        Err(e)
                    }
                }
            })
            .cloned()
    }
}

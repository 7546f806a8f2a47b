use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use tracing::debug;

/// Opaque identity of a caller-owned source buffer (texture name, surface
/// handle, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Encoder-side state registered once per source buffer and reused for every
/// later frame from it. Entries live until the cache is drained.
#[derive(Debug)]
pub struct ResourceCache<R> {
    entries: HashMap<SourceId, R>,
}

impl<R> Default for ResourceCache<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<R> ResourceCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Returns the cached resource for `id`, calling `register` on a miss.
    /// A failed registration leaves nothing behind, so the same id may be
    /// retried later.
    pub fn get_or_register<E>(
        &mut self,
        id: SourceId,
        register: impl FnOnce(SourceId) -> Result<R, E>,
    ) -> Result<&mut R, E> {
        match self.entries.entry(id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let resource = register(id)?;
                debug!(source = %id, "source buffer registered");
                Ok(entry.insert(resource))
            }
        }
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (SourceId, R)> + '_ {
        self.entries.drain()
    }
}

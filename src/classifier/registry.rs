// Ordered list of known symbols of one partition
use crate::state::{ModelStore, Partition, StoreResult, SymbolEntry};

#[derive(Debug, Clone)]
pub struct SymbolRegistry {
    partition: Partition,
    entries: Vec<SymbolEntry>,
}

impl SymbolRegistry {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            entries: Vec::new(),
        }
    }

    pub fn load(store: &dyn ModelStore, partition: Partition) -> StoreResult<Self> {
        let mut registry = Self::new(partition);
        for entry in store.load_registry(partition)? {
            if registry.contains(&entry.name) {
                log::warn!("Duplicate symbol '{}' in {} registry", entry.name, partition);
                continue;
            }
            registry.entries.push(entry);
        }
        Ok(registry)
    }

    pub fn save(&self, store: &dyn ModelStore) -> StoreResult<()> {
        store.save_registry(self.partition, &self.entries)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Add a symbol at the end, or reactivate it if already known.
    /// Returns true if the registry changed.
    pub fn register(&mut self, name: &str) -> bool {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) if entry.active => false,
            Some(entry) => {
                entry.active = true;
                true
            }
            None => {
                self.entries.push(SymbolEntry::new(name));
                true
            }
        }
    }

    /// Returns false if the symbol was not registered
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name != name);
        self.entries.len() != before
    }

    /// `None` if the symbol is unknown, otherwise whether the flag changed
    pub fn set_active(&mut self, name: &str, active: bool) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|entry| entry.name == name)?;
        let changed = entry.active != active;
        entry.active = active;
        Some(changed)
    }

    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.active)
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

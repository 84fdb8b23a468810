//! Database registry
//!
//! The fixed set of databases a server exposes. Built once at startup and
//! shared by handle; databases are never added or removed afterwards.

use std::sync::Arc;

use super::Database;

#[derive(Debug)]
pub struct Registry {
    databases: Vec<Arc<Database>>,
}

impl Registry {
    /// Create `count` empty databases indexed `0..count`
    ///
    /// Indexes travel as `u16`, so at most 65536 databases are addressable.
    pub fn new(count: usize) -> Self {
        let count = count.min(u16::MAX as usize + 1);
        let databases = (0..count)
            .map(|index| Arc::new(Database::new(index as u16)))
            .collect();
        Self { databases }
    }

    /// Look up a database by index
    pub fn get(&self, index: u16) -> Option<&Arc<Database>> {
        self.databases.get(index as usize)
    }

    /// Number of databases
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Database>> {
        self.databases.iter()
    }
}

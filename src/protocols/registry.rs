//! Protocol registry for discovering and creating training protocols

use std::collections::HashMap;

use super::{ProtocolFactory, ProtocolInfo};

/// Registry of named training protocols
pub struct ProtocolRegistry {
    factories: HashMap<String, Box<dyn ProtocolFactory>>,
}

impl ProtocolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a protocol factory under its display name.
    /// A later registration with the same name replaces the earlier one.
    pub fn register(&mut self, factory: Box<dyn ProtocolFactory>) {
        let name = factory.info().name;
        if self.factories.insert(name.clone(), factory).is_some() {
            log::warn!("Training protocol '{}' registered twice, keeping the latest", name);
        }
    }

    /// Register all built-in protocols
    pub fn register_builtin(&mut self) {
        use super::ScoreTrackerFactory;

        log::info!("Registering built-in training protocols");

        self.register(Box::new(ScoreTrackerFactory));

        log::info!("Registered {} built-in training protocols", self.factories.len());
    }

    /// Check if a protocol is registered
    pub fn has_protocol(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Look up a protocol factory by name
    pub fn get(&self, name: &str) -> Option<&dyn ProtocolFactory> {
        self.factories.get(name).map(|f| f.as_ref())
    }

    /// All registered protocol names, sorted
    pub fn protocol_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Info for every registered protocol, sorted by name
    pub fn infos(&self) -> Vec<ProtocolInfo> {
        let mut infos: Vec<ProtocolInfo> = self.factories.values().map(|f| f.info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

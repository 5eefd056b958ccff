use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use super::backend::DepthBackend;

/// Named collection of depth backends.
///
/// The pipeline owns exactly one backend, so the registry hands backends out
/// by value (`take`) rather than sharing them.
pub struct BackendRegistry {
    backends: BTreeMap<String, Box<dyn DepthBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: BTreeMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DepthBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Box::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            ));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// List registered backends, sorted by name.
    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    /// Remove and return a backend by name.
    pub fn take(&mut self, name: &str) -> Result<Box<dyn DepthBackend>> {
        self.backends
            .remove(name)
            .ok_or_else(|| anyhow!("backend '{}' not registered", name))
    }

    /// Remove and return the default backend.
    pub fn take_default(&mut self) -> Result<Box<dyn DepthBackend>> {
        let name = self
            .default_name
            .clone()
            .ok_or_else(|| anyhow!("no backends registered"))?;
        self.take(&name)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

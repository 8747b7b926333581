//! Named metric registry.
//!
//! Passed around as `Arc<Registry>`; there is no process-wide instance.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::Metric;
use crate::error::RegistryError;

#[derive(Debug, Default)]
pub struct Registry {
    metrics: RwLock<HashMap<String, Metric>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `metric` under `name`. Names are unique.
    pub fn register(
        &self,
        name: impl Into<String>,
        metric: impl Into<Metric>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut metrics = self.metrics.write();
        if metrics.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        metrics.insert(name, metric.into());
        Ok(())
    }

    /// Return the metric under `name`, registering `make()` first if absent.
    pub fn get_or_register<F>(&self, name: &str, make: F) -> Metric
    where
        F: FnOnce() -> Metric,
    {
        if let Some(m) = self.metrics.read().get(name) {
            return m.clone();
        }
        self.metrics
            .write()
            .entry(name.to_owned())
            .or_insert_with(make)
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    pub fn unregister(&self, name: &str) -> Option<Metric> {
        self.metrics.write().remove(name)
    }

    pub fn unregister_all(&self) {
        self.metrics.write().clear();
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// Call `f` for every registered metric, in unspecified order.
    ///
    /// The entry list is copied before iterating, so `f` may touch the
    /// registry (or run arbitrary health-check code) without deadlocking.
    pub fn each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &Metric),
    {
        let entries: Vec<(String, Metric)> = self
            .metrics
            .read()
            .iter()
            .map(|(name, m)| (name.clone(), m.clone()))
            .collect();

        for (name, metric) in &entries {
            f(name, metric);
        }
    }

    /// Run every registered health check.
    pub fn run_healthchecks(&self) {
        self.each(|_, metric| {
            if let Metric::Healthcheck(hc) = metric {
                hc.check();
            }
        });
    }
}

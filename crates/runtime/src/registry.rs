// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver registry
//!
//! Maps component names to driver factories. Populated from every loaded
//! component spec that declares `x-runtime.driver`; a driver string the
//! host cannot resolve is logged (`driver_registration_failed`) but not
//! fatal; the failure surfaces only when a step actually requires that
//! component.

use crate::driver::Driver;
use crate::fs_drivers::{CsvExtractorDriver, CsvWriterDriver};
use osiris_core::Event;
use osiris_oml::ComponentRegistry;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Produces a driver instance on first use.
pub type DriverFactory = Arc<dyn Fn() -> Arc<dyn Driver> + Send + Sync>;

/// Host-supplied factories, keyed by `x-runtime.driver` string.
pub type FactoryTable = BTreeMap<String, DriverFactory>;

/// Resolve a driver string to a factory this crate ships.
pub fn builtin_factory(driver: &str) -> Option<DriverFactory> {
    match driver {
        "filesystem.csv_writer" => Some(Arc::new(|| Arc::new(CsvWriterDriver) as Arc<dyn Driver>)),
        "filesystem.csv_extractor" => {
            Some(Arc::new(|| Arc::new(CsvExtractorDriver) as Arc<dyn Driver>))
        }
        _ => None,
    }
}

/// Component name → lazily instantiated driver.
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
    instances: Mutex<BTreeMap<String, Arc<dyn Driver>>>,
}

impl DriverRegistry {
    /// Populate from component specs, resolving each `x-runtime.driver`
    /// against the host table first and the built-ins second.
    ///
    /// Unresolvable drivers emit `driver_registration_failed` and are
    /// skipped.
    pub fn from_components(components: &ComponentRegistry, host: &FactoryTable) -> Self {
        let mut factories = BTreeMap::new();
        for (name, spec) in components.iter() {
            let Some(driver) = spec.driver() else {
                continue;
            };
            let factory = host.get(driver).cloned().or_else(|| builtin_factory(driver));
            match factory {
                Some(factory) => {
                    factories.insert(name.clone(), factory);
                }
                None => {
                    tracing::warn!(component = %name, driver, "no factory for driver");
                    osiris_session::log_event(&Event::DriverRegistrationFailed {
                        component: name.clone(),
                        driver: driver.to_string(),
                        error: "no factory for driver".to_string(),
                    });
                }
            }
        }
        Self {
            factories,
            instances: Mutex::new(BTreeMap::new()),
        }
    }

    /// Registered component names, sorted.
    pub fn registered(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, component: &str) -> bool {
        self.factories.contains_key(component)
    }

    /// The driver for a component, instantiating and caching on first use.
    pub fn get(&self, component: &str) -> Option<Arc<dyn Driver>> {
        let mut instances = self.instances.lock();
        if let Some(driver) = instances.get(component) {
            return Some(driver.clone());
        }
        let factory = self.factories.get(component)?;
        let driver = factory();
        instances.insert(component.to_string(), driver.clone());
        Some(driver)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

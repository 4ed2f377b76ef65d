//! Name-keyed table of available integration algorithms.
//!
//! The registry is an ordinary value owned by the host, not ambient global
//! state. Register an algorithm before creating any problem with it, and
//! unregister it only after every problem and solver created from it has
//! been destroyed.

use std::collections::BTreeMap;

use crate::{
    error::Error,
    methods::{heun::Heun, rkf45::Rkf45},
    solver::{CreateSolver, Properties, Solver},
    utilities::Utilities,
};

/// Property record plus constructor of one algorithm.
#[derive(Clone)]
pub struct Registration {
    pub properties: Properties,
    pub create: CreateSolver,
}

impl Registration {
    pub fn new(properties: Properties, create: CreateSolver) -> Self {
        Self { properties, create }
    }

    /// Creates a solver instance; `None` when the host allocator refuses it.
    pub fn create(&self, utilities: Utilities) -> Option<Box<dyn Solver>> {
        (self.create)(utilities)
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Case-insensitive registry of algorithms.
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the algorithms shipped with this crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtins(&mut registry);
        registry
    }

    /// Adds an algorithm.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateName`] if the name (ignoring case) is taken.
    pub fn register(&mut self, registration: Registration) -> Result<(), Error> {
        let key = registration.properties.name.to_lowercase();
        if self.entries.contains_key(&key) {
            return Err(Error::DuplicateName(registration.properties.name));
        }
        log::debug!("registered integration algorithm {}", registration.properties);
        self.entries.insert(key, registration);
        Ok(())
    }

    /// Removes an algorithm. Returns `false` if it was not registered.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.entries.remove(&name.to_lowercase()).is_some();
        if removed {
            log::debug!("unregistered integration algorithm {name}");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Creates a solver instance of the algorithm called `name`.
    ///
    /// `None` if no such algorithm exists or its constructor failed.
    pub fn create_solver(&self, name: &str, utilities: Utilities) -> Option<Box<dyn Solver>> {
        self.get(name)?.create(utilities)
    }

    /// Registered names, as given at registration, in lowercase order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(|r| r.properties.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Registers the built-in algorithms (`rkf45`, `heun`).
///
/// Algorithms already present under the same names are left in place.
pub fn register_builtins(registry: &mut Registry) {
    for registration in [Rkf45::registration(), Heun::registration()] {
        if let Err(err) = registry.register(registration) {
            log::warn!("skipping built-in algorithm: {err}");
        }
    }
}

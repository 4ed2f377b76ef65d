//! Utility table handed to solver instances by the host

use std::rc::Rc;

use crate::{
    alloc::{Allocator, SystemAllocator},
    status::Status,
};

/// Log sink supplied by the host.
///
/// Invoked only on abnormal conditions. `origin` names the operation that
/// failed (for example `"rkf45::solve"`).
pub trait Logger {
    fn log(&self, status: Status, origin: &str, message: &str);
}

/// Forwards host log records to the [`log`] facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl Logger for LogFacade {
    fn log(&self, status: Status, origin: &str, message: &str) {
        if status.is_ok() {
            log::warn!("{origin}: [{} {status}] {message}", status.code());
        } else {
            log::error!("{origin}: [{} {status}] {message}", status.code());
        }
    }
}

/// Allocation and logging utilities shared by a solver and its problems.
#[derive(Clone)]
pub struct Utilities {
    allocator: Rc<dyn Allocator>,
    logger: Rc<dyn Logger>,
}

impl Utilities {
    pub fn new(allocator: Rc<dyn Allocator>, logger: Rc<dyn Logger>) -> Self {
        Self { allocator, logger }
    }

    /// Replaces the allocator, keeping the logger.
    pub fn with_allocator(self, allocator: Rc<dyn Allocator>) -> Self {
        Self { allocator, ..self }
    }

    /// Replaces the logger, keeping the allocator.
    pub fn with_logger(self, logger: Rc<dyn Logger>) -> Self {
        Self { logger, ..self }
    }

    pub fn allocator(&self) -> &Rc<dyn Allocator> {
        &self.allocator
    }

    pub fn logger(&self) -> &Rc<dyn Logger> {
        &self.logger
    }

    pub(crate) fn report(&self, origin: &str, err: &crate::Error) {
        self.logger.log(err.status(), origin, &err.to_string());
    }
}

impl Default for Utilities {
    fn default() -> Self {
        Self::new(Rc::new(SystemAllocator), Rc::new(LogFacade))
    }
}

impl std::fmt::Debug for Utilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Utilities").finish_non_exhaustive()
    }
}

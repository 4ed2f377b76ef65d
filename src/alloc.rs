//! Host allocation strategy and scoped leases

use std::{
    alloc::Layout,
    fmt,
    ops::{Deref, DerefMut},
    rc::Rc,
};

use crate::{Float, error::Error};

/// Allocation pools offered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    /// Small, short-lived control structures (solver and problem records).
    Control,
    /// Larger per-problem data (state and stage vectors).
    Data,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pool::Control => f.write_str("control"),
            Pool::Data => f.write_str("data"),
        }
    }
}

/// Allocation strategy injected by the host.
///
/// `allocate` decides whether a request for `layout` bytes from `pool` is
/// granted. Every granted request is later returned through exactly one
/// `release` call with the same pool and layout; a refused request is never
/// released. The crate only talks to the allocator through [`Lease`], which
/// guarantees that pairing.
pub trait Allocator {
    fn allocate(&self, pool: Pool, layout: Layout) -> bool;
    fn release(&self, pool: Pool, layout: Layout);
}

/// Allocator that grants every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, _pool: Pool, _layout: Layout) -> bool {
        true
    }

    fn release(&self, _pool: Pool, _layout: Layout) {}
}

/// A granted allocation. Released back to its allocator on drop.
pub struct Lease {
    allocator: Rc<dyn Allocator>,
    pool: Pool,
    layout: Layout,
}

impl Lease {
    /// Requests `layout` from `pool`.
    pub fn acquire(
        allocator: &Rc<dyn Allocator>,
        pool: Pool,
        layout: Layout,
    ) -> Result<Self, Error> {
        if !allocator.allocate(pool, layout) {
            log::debug!("{pool} pool refused {} bytes", layout.size());
            return Err(Error::OutOfMemory {
                pool,
                bytes: layout.size(),
            });
        }
        Ok(Self {
            allocator: Rc::clone(allocator),
            pool,
            layout,
        })
    }

    /// Requests room for one `T` from `pool`.
    pub fn of<T>(allocator: &Rc<dyn Allocator>, pool: Pool) -> Result<Self, Error> {
        Self::acquire(allocator, pool, Layout::new::<T>())
    }

    pub fn pool(&self) -> Pool {
        self.pool
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.allocator.release(self.pool, self.layout);
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("pool", &self.pool)
            .field("bytes", &self.layout.size())
            .finish()
    }
}

/// Zero-initialized vector of `Float` backed by a [`Lease`].
pub struct Buffer {
    data: Vec<Float>,
    _lease: Lease,
}

impl Buffer {
    /// Leases and zero-fills `len` values from `pool`.
    pub fn zeroed(allocator: &Rc<dyn Allocator>, pool: Pool, len: usize) -> Result<Self, Error> {
        let layout = Layout::array::<Float>(len).map_err(|_| Error::OutOfMemory {
            pool,
            bytes: len.saturating_mul(size_of::<Float>()),
        })?;
        let lease = Lease::acquire(allocator, pool, layout)?;
        Ok(Self {
            data: vec![0.0; len],
            _lease: lease,
        })
    }
}

impl Deref for Buffer {
    type Target = [Float];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

//! Heap object allocation and live-object accounting
//!
//! Strings and vectors are reference counted. Every object carries an
//! [`Allocation`] token tied to the [`Heap`] that created it; dropping the
//! last reference to the object drops the token and the heap's live count
//! goes down by one. `live_objects() == 0` after a failed parse is how tests
//! check that nothing leaked.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kelp_vm_bytecode::TypeIndex;

use crate::value::{StringObj, Value, VectorObj};

#[derive(Debug, Default)]
struct Counters {
    live: AtomicUsize,
    allocated: AtomicUsize,
    released: AtomicUsize,
}

/// Accounting token owned by every heap object
#[derive(Debug)]
pub(crate) struct Allocation {
    counters: Arc<Counters>,
}

impl Drop for Allocation {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::Relaxed);
        self.counters.released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Allocator for reference-counted heap objects.
///
/// Cloning a `Heap` yields a handle to the same counters.
#[derive(Debug, Clone, Default)]
pub struct Heap {
    counters: Arc<Counters>,
}

impl Heap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    fn track(&self) -> Allocation {
        self.counters.live.fetch_add(1, Ordering::Relaxed);
        self.counters.allocated.fetch_add(1, Ordering::Relaxed);
        Allocation {
            counters: Arc::clone(&self.counters),
        }
    }

    /// Allocate a string object
    pub fn new_string(&self, text: impl Into<Box<str>>) -> Value {
        Value::String(Arc::new(StringObj::new(text.into(), self.track())))
    }

    /// Allocate a vector (or struct, when `ty` is a struct type) holding `elems`
    pub fn new_vector(&self, ty: TypeIndex, elems: Vec<Value>) -> Value {
        Value::Vector(Arc::new(VectorObj::new(ty, elems, self.track())))
    }

    /// Number of objects allocated by this heap that are still alive
    pub fn live_objects(&self) -> usize {
        self.counters.live.load(Ordering::Relaxed)
    }

    /// Get allocation statistics
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            live_objects: self.live_objects(),
            total_allocated: self.counters.allocated.load(Ordering::Relaxed),
            total_released: self.counters.released.load(Ordering::Relaxed),
        }
    }
}

/// Statistics from a [`Heap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Objects currently alive
    pub live_objects: usize,
    /// Objects ever allocated
    pub total_allocated: usize,
    /// Objects released
    pub total_released: usize,
}

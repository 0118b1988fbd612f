// SPDX-License-Identifier: MIT OR Apache-2.0
//! Fixed-capacity typed value pools and the handles that reference them.
//!
//! Every transient value the operand stack owns lives in one of these
//! pools. Handle misuse (freed slot, foreign pool, kind mismatch) and
//! capacity exhaustion are programming/deployment errors and fail fast
//! with a panic; they are never silently recovered.

use crate::variable::{ColorRgba, ObjectRef, Quat, Value, VariableType, VariableValue, Vec3};
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of one pool instance, used for handle ownership checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolId(u32);

impl PoolId {
    fn next() -> Self {
        Self(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Reference to an allocated slot in a [`VarPools`] pool.
///
/// A handle is valid only while its slot remains allocated in the pool that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarHandle {
    kind: VariableType,
    pool: PoolId,
    index: i32,
}

impl VarHandle {
    /// The handle that references no slot.
    pub const INVALID: VarHandle = VarHandle {
        kind: VariableType::Bool,
        pool: PoolId(0),
        index: -1,
    };

    /// The kind of value this handle references.
    pub fn kind(&self) -> VariableType {
        self.kind
    }

    /// Whether this handle references a slot at all.
    pub fn is_valid(&self) -> bool {
        self.index >= 0 && self.pool != PoolId(0)
    }
}

/// Fixed-capacity slot allocator for values of one kind.
#[derive(Debug)]
pub struct Pool<T> {
    id: PoolId,
    kind: VariableType,
    slots: Vec<T>,
    allocated: Vec<bool>,
    live: usize,
}

impl<T: PoolValue> Pool<T> {
    fn new(capacity: usize) -> Self {
        Self {
            id: PoolId::next(),
            kind: T::KIND,
            slots: vec![T::default(); capacity],
            allocated: vec![false; capacity],
            live: 0,
        }
    }

    /// Total slot capacity.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of currently allocated slots.
    pub fn allocated(&self) -> usize {
        self.live
    }

    /// Allocate a fresh slot holding the default value.
    ///
    /// Panics when the pool is full: capacity is a deployment-time
    /// decision and running out is not recoverable at runtime.
    pub fn alloc(&mut self) -> VarHandle {
        for index in 0..self.allocated.len() {
            if self.allocated[index] {
                continue;
            }
            self.allocated[index] = true;
            self.live += 1;
            return VarHandle {
                kind: self.kind,
                pool: self.id,
                index: index as i32,
            };
        }
        panic!(
            "variable pool for {:?} is out of space (capacity {})",
            self.kind,
            self.capacity()
        );
    }

    /// Release a slot and invalidate the handle.
    pub fn free(&mut self, handle: &mut VarHandle) {
        self.validate(*handle);
        let index = handle.index as usize;
        self.allocated[index] = false;
        self.slots[index] = T::default();
        self.live -= 1;
        *handle = VarHandle::INVALID;
    }

    /// Read the value behind a handle.
    pub fn get(&self, handle: VarHandle) -> T {
        self.validate(handle);
        self.slots[handle.index as usize].clone()
    }

    /// Store a value behind a handle.
    pub fn set(&mut self, handle: VarHandle, value: T) {
        self.validate(handle);
        self.slots[handle.index as usize] = value;
    }

    /// Allocate a fresh slot holding a copy of the value behind `source`.
    pub fn alloc_copy(&mut self, source: VarHandle) -> VarHandle {
        let value = self.get(source);
        let handle = self.alloc();
        self.set(handle, value);
        handle
    }

    /// Assert that a handle was issued by this pool and is still allocated.
    ///
    /// Panics on any violation; using a freed or foreign handle must fail
    /// immediately rather than corrupt a slot.
    pub fn validate(&self, handle: VarHandle) {
        assert_eq!(
            handle.pool, self.id,
            "handle is not from this {:?} pool",
            self.kind
        );
        assert!(
            handle.index >= 0 && (handle.index as usize) < self.capacity(),
            "{:?} pool handle index is out of range: {}",
            self.kind,
            handle.index
        );
        assert!(
            self.allocated[handle.index as usize],
            "{:?} pool handle is not allocated: {}",
            self.kind,
            handle.index
        );
    }
}

/// Rust types that have a backing pool in [`VarPools`].
pub trait PoolValue: VariableValue + Clone + Default {
    /// The pool storing values of this type.
    fn pool(pools: &VarPools) -> &Pool<Self>;

    /// Mutable access to the pool storing values of this type.
    fn pool_mut(pools: &mut VarPools) -> &mut Pool<Self>;
}

macro_rules! pool_value {
    ($ty:ty, $field:ident) => {
        impl PoolValue for $ty {
            fn pool(pools: &VarPools) -> &Pool<Self> {
                &pools.$field
            }

            fn pool_mut(pools: &mut VarPools) -> &mut Pool<Self> {
                &mut pools.$field
            }
        }
    };
}

pool_value!(bool, bools);
pool_value!(i32, ints);
pool_value!(f32, floats);
pool_value!(String, strings);
pool_value!(Vec3, vectors);
pool_value!(ObjectRef, objects);
pool_value!(Uuid, guids);
pool_value!(Quat, quaternions);
pool_value!(ColorRgba, colors);

/// One value pool per supported kind, all sharing one capacity.
///
/// Not safe for concurrent use; callers sharing pools across threads must
/// synchronize externally. The runtime assumes a single logical update
/// thread.
#[derive(Debug)]
pub struct VarPools {
    bools: Pool<bool>,
    ints: Pool<i32>,
    floats: Pool<f32>,
    strings: Pool<String>,
    vectors: Pool<Vec3>,
    objects: Pool<ObjectRef>,
    guids: Pool<Uuid>,
    quaternions: Pool<Quat>,
    colors: Pool<ColorRgba>,
}

impl VarPools {
    /// Default per-kind slot capacity.
    pub const DEFAULT_CAPACITY: usize = 512;

    /// Create pools with the given per-kind capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            bools: Pool::new(capacity),
            ints: Pool::new(capacity),
            floats: Pool::new(capacity),
            strings: Pool::new(capacity),
            vectors: Pool::new(capacity),
            objects: Pool::new(capacity),
            guids: Pool::new(capacity),
            quaternions: Pool::new(capacity),
            colors: Pool::new(capacity),
        }
    }

    /// Read a typed value behind a handle.
    pub fn get<T: PoolValue>(&self, handle: VarHandle) -> T {
        T::pool(self).get(handle)
    }

    /// Store a typed value behind a handle.
    pub fn set<T: PoolValue>(&mut self, handle: VarHandle, value: T) {
        T::pool_mut(self).set(handle, value);
    }

    /// Allocate a slot and store `value` in it.
    pub fn alloc<T: PoolValue>(&mut self, value: T) -> VarHandle {
        let pool = T::pool_mut(self);
        let handle = pool.alloc();
        pool.set(handle, value);
        handle
    }

    /// Allocate a slot for a dynamically typed value.
    pub fn alloc_value(&mut self, value: &Value) -> VarHandle {
        match value {
            Value::Bool(v) => self.alloc(*v),
            Value::Int(v) => self.alloc(*v),
            Value::Float(v) => self.alloc(*v),
            Value::String(v) => self.alloc(v.clone()),
            Value::Vector3(v) => self.alloc(*v),
            Value::Object(v) => self.alloc(*v),
            Value::Guid(v) => self.alloc(*v),
            Value::Quaternion(v) => self.alloc(*v),
            Value::Color(v) => self.alloc(*v),
        }
    }

    /// Read the value behind a handle as a dynamically typed [`Value`].
    pub fn read_value(&self, handle: VarHandle) -> Value {
        match handle.kind() {
            VariableType::Bool => Value::Bool(self.get(handle)),
            VariableType::Int => Value::Int(self.get(handle)),
            VariableType::Float => Value::Float(self.get(handle)),
            VariableType::String => Value::String(self.get(handle)),
            VariableType::Vector3 => Value::Vector3(self.get(handle)),
            VariableType::Object => Value::Object(self.get(handle)),
            VariableType::Guid => Value::Guid(self.get(handle)),
            VariableType::Quaternion => Value::Quaternion(self.get(handle)),
            VariableType::Color => Value::Color(self.get(handle)),
        }
    }

    /// Release the slot behind a handle and invalidate it.
    pub fn free(&mut self, handle: &mut VarHandle) {
        match handle.kind() {
            VariableType::Bool => self.bools.free(handle),
            VariableType::Int => self.ints.free(handle),
            VariableType::Float => self.floats.free(handle),
            VariableType::String => self.strings.free(handle),
            VariableType::Vector3 => self.vectors.free(handle),
            VariableType::Object => self.objects.free(handle),
            VariableType::Guid => self.guids.free(handle),
            VariableType::Quaternion => self.quaternions.free(handle),
            VariableType::Color => self.colors.free(handle),
        }
    }

    /// Duplicate the value behind `source` into a fresh slot of the same
    /// pool.
    pub fn alloc_copy(&mut self, source: VarHandle) -> VarHandle {
        match source.kind() {
            VariableType::Bool => self.bools.alloc_copy(source),
            VariableType::Int => self.ints.alloc_copy(source),
            VariableType::Float => self.floats.alloc_copy(source),
            VariableType::String => self.strings.alloc_copy(source),
            VariableType::Vector3 => self.vectors.alloc_copy(source),
            VariableType::Object => self.objects.alloc_copy(source),
            VariableType::Guid => self.guids.alloc_copy(source),
            VariableType::Quaternion => self.quaternions.alloc_copy(source),
            VariableType::Color => self.colors.alloc_copy(source),
        }
    }

    /// Assert that a handle belongs to these pools and is allocated.
    pub fn validate(&self, handle: VarHandle) {
        match handle.kind() {
            VariableType::Bool => self.bools.validate(handle),
            VariableType::Int => self.ints.validate(handle),
            VariableType::Float => self.floats.validate(handle),
            VariableType::String => self.strings.validate(handle),
            VariableType::Vector3 => self.vectors.validate(handle),
            VariableType::Object => self.objects.validate(handle),
            VariableType::Guid => self.guids.validate(handle),
            VariableType::Quaternion => self.quaternions.validate(handle),
            VariableType::Color => self.colors.validate(handle),
        }
    }

    /// Number of allocated slots for one kind.
    pub fn allocated(&self, kind: VariableType) -> usize {
        match kind {
            VariableType::Bool => self.bools.allocated(),
            VariableType::Int => self.ints.allocated(),
            VariableType::Float => self.floats.allocated(),
            VariableType::String => self.strings.allocated(),
            VariableType::Vector3 => self.vectors.allocated(),
            VariableType::Object => self.objects.allocated(),
            VariableType::Guid => self.guids.allocated(),
            VariableType::Quaternion => self.quaternions.allocated(),
            VariableType::Color => self.colors.allocated(),
        }
    }

    /// Number of allocated slots across all kinds.
    pub fn total_allocated(&self) -> usize {
        self.bools.allocated()
            + self.ints.allocated()
            + self.floats.allocated()
            + self.strings.allocated()
            + self.vectors.allocated()
            + self.objects.allocated()
            + self.guids.allocated()
            + self.quaternions.allocated()
            + self.colors.allocated()
    }
}

impl Default for VarPools {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_free_conservation() {
        let mut pools = VarPools::new(8);
        assert_eq!(pools.total_allocated(), 0);

        let mut a = pools.alloc(3);
        let mut b = pools.alloc("hi".to_string());
        assert_eq!(pools.total_allocated(), 2);
        assert_eq!(pools.get::<i32>(a), 3);
        assert_eq!(pools.get::<String>(b), "hi");

        pools.free(&mut a);
        pools.free(&mut b);
        assert_eq!(pools.total_allocated(), 0);
        assert!(!a.is_valid());
        assert!(!b.is_valid());
    }

    #[test]
    fn test_alloc_copy_is_independent() {
        let mut pools = VarPools::new(8);
        let original = pools.alloc(5);
        let mut copy = pools.alloc_copy(original);
        assert_eq!(pools.get::<i32>(copy), 5);

        pools.set(original, 9);
        assert_eq!(pools.get::<i32>(copy), 5);

        pools.free(&mut copy);
        assert_eq!(pools.get::<i32>(original), 9);
    }

    #[test]
    fn test_read_value_matches_kind() {
        let mut pools = VarPools::new(8);
        let handle = pools.alloc(Vec3([1.0, 2.0, 3.0]));
        assert_eq!(handle.kind(), VariableType::Vector3);
        assert_eq!(pools.read_value(handle), Value::Vector3(Vec3([1.0, 2.0, 3.0])));
    }

    #[test]
    #[should_panic(expected = "is not allocated")]
    fn test_use_after_free_panics() {
        let mut pools = VarPools::new(8);
        let handle = pools.alloc(true);
        let mut doomed = handle;
        pools.free(&mut doomed);
        let _ = pools.get::<bool>(handle);
    }

    #[test]
    #[should_panic(expected = "handle is not from this")]
    fn test_foreign_handle_panics() {
        let mut lhs = VarPools::new(8);
        let rhs = VarPools::new(8);
        let handle = lhs.alloc(1.0f32);
        rhs.validate(handle);
    }

    #[test]
    #[should_panic(expected = "out of space")]
    fn test_capacity_exhaustion_panics() {
        let mut pools = VarPools::new(2);
        let _a = pools.alloc(1);
        let _b = pools.alloc(2);
        let _c = pools.alloc(3);
    }

    #[test]
    fn test_invalid_handle() {
        assert!(!VarHandle::INVALID.is_valid());
    }
}

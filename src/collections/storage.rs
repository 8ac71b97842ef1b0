//! Storage utilities.
//!
//! This module provides [BaseArena], an append-only arena used to hold the
//! nodes of the control flow graph. Nodes reference each other by
//! [BaseArenaPtr], so cycles in the graph (loops) never become ownership
//! cycles, and splitting a node never invalidates the handles already stored
//! in adjacency lists.
//!
//! - [ArenaPtr]: The trait for the pointer in the arena.
//! - [ArenaDeref]: The trait for dereferencing the arena pointer.
//! - [ArenaAlloc]: The trait for allocating memory in the arena.
//!
//! Nothing is ever freed: the index of a slot doubles as the identity of the
//! node stored in it, and indices are handed out in increasing order by each
//! arena instance.
//!
//! # Examples
//!
//! ```rust
//! use reginterval::impl_arena;
//! use reginterval::collections::storage::*;
//!
//! struct Node { this: NodePtr, succs: Vec<NodePtr> }
//!
//! #[derive(Clone, Copy, PartialEq, Eq)]
//! struct NodePtr(BaseArenaPtr<Node>);
//!
//! #[derive(Default)]
//! struct Graph { nodes: BaseArena<Node> }
//!
//! impl_arena!(Graph, Node, NodePtr, nodes);
//!
//! let mut graph = Graph::default();
//! let a = graph.alloc_with(|this| Node { this, succs: Vec::new() });
//! let b = graph.alloc_with(|this| Node { this, succs: vec![a] });
//! a.deref_mut(&mut graph).succs.push(b);
//!
//! assert!(a.deref(&graph).this == a);
//! assert!(b.deref(&graph).succs[0] == a);
//! assert_eq!(a.0.id(), 0);
//! assert_eq!(b.0.id(), 1);
//! ```

use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Indicates that the type can be used to dereference an arena pointer.
pub trait ArenaDeref<T, Ptr>
where
    Ptr: ArenaPtr<T = T, A = Self>,
{
    /// Try to dereference a pointer and get a value in the arena.
    ///
    /// # Returns
    ///
    /// - `Some(&T)` if the pointer is in bounds.
    /// - `None` if the pointer is out of bounds.
    fn try_deref(&self, ptr: Ptr) -> Option<&T>;

    /// Try to dereference a pointer and get a mutable value in the arena.
    fn try_deref_mut(&mut self, ptr: Ptr) -> Option<&mut T>;
}

/// Indicates that the type can be used to allocate values in the arena.
pub trait ArenaAlloc<T, Ptr>: ArenaDeref<T, Ptr>
where
    Ptr: ArenaPtr<T = T, A = Self>,
{
    /// Allocate a value with a closure accepting the future pointer.
    ///
    /// This is useful when the value needs to know its own identity, e.g., a
    /// block deriving its name from its id.
    fn alloc_with<F>(&mut self, f: F) -> Ptr
    where
        F: FnOnce(Ptr) -> T;

    /// Allocate a value in the arena.
    fn alloc(&mut self, val: T) -> Ptr { self.alloc_with(|_| val) }
}

/// The pointer-like trait that can be used to deref and get the value from the
/// corresponding [ArenaDeref] type.
pub trait ArenaPtr: Copy + Sized + Eq {
    /// The type of dereferenced value.
    type T;

    /// The type of the corresponding arena.
    type A: ArenaDeref<Self::T, Self>;

    /// Try to dereference the pointer.
    fn try_deref(self, arena: &Self::A) -> Option<&Self::T>;

    /// Try to dereference the pointer mutably.
    fn try_deref_mut(self, arena: &mut Self::A) -> Option<&mut Self::T>;

    /// Dereference the pointer.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not belong to the arena.
    fn deref(self, arena: &Self::A) -> &Self::T {
        self.try_deref(arena).expect("the arena pointer is invalid")
    }

    /// Dereference the pointer mutably.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not belong to the arena.
    fn deref_mut(self, arena: &mut Self::A) -> &mut Self::T {
        self.try_deref_mut(arena)
            .expect("the arena pointer is invalid")
    }
}

/// [BaseArenaPtr] is a handle to an object in the [BaseArena].
pub struct BaseArenaPtr<T> {
    id: usize,
    _marker: PhantomData<T>,
}

impl<T> fmt::Debug for BaseArenaPtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseArenaPtr({})", self.id)
    }
}

impl<T> PartialEq for BaseArenaPtr<T> {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl<T> Eq for BaseArenaPtr<T> {}

impl<T> PartialOrd for BaseArenaPtr<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl<T> Ord for BaseArenaPtr<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.id.cmp(&other.id) }
}

impl<T> Hash for BaseArenaPtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state); }
}

#[allow(clippy::non_canonical_clone_impl)]
impl<T> Clone for BaseArenaPtr<T> {
    fn clone(&self) -> Self {
        // `T` is not required to be `Clone`.
        BaseArenaPtr {
            id: self.id,
            _marker: PhantomData,
        }
    }
}

impl<T> Copy for BaseArenaPtr<T> {}

impl<T> BaseArenaPtr<T> {
    fn new(id: usize) -> Self {
        BaseArenaPtr {
            id,
            _marker: PhantomData,
        }
    }

    /// Get the inner index, which is also the identity of the object.
    pub fn id(self) -> usize { self.id }
}

impl<T> ArenaPtr for BaseArenaPtr<T> {
    type A = BaseArena<T>;
    type T = T;

    fn try_deref(self, arena: &BaseArena<T>) -> Option<&T> { arena.try_deref(self) }

    fn try_deref_mut(self, arena: &mut BaseArena<T>) -> Option<&mut T> { arena.try_deref_mut(self) }
}

/// An append-only arena implemented with a vector.
///
/// The next index is the current length of the pool, so the arena acts as a
/// monotonically increasing id generator for the objects it stores.
pub struct BaseArena<T> {
    pool: Vec<T>,
}

impl<T> Default for BaseArena<T> {
    fn default() -> Self { BaseArena { pool: Vec::new() } }
}

impl<T> ArenaAlloc<T, BaseArenaPtr<T>> for BaseArena<T> {
    fn alloc_with<F>(&mut self, f: F) -> BaseArenaPtr<T>
    where
        F: FnOnce(BaseArenaPtr<T>) -> T,
    {
        let ptr = BaseArenaPtr::new(self.pool.len());
        let val = f(ptr);
        self.pool.push(val);
        ptr
    }
}

impl<T> ArenaDeref<T, BaseArenaPtr<T>> for BaseArena<T> {
    fn try_deref(&self, ptr: BaseArenaPtr<T>) -> Option<&T> { self.pool.get(ptr.id()) }

    fn try_deref_mut(&mut self, ptr: BaseArenaPtr<T>) -> Option<&mut T> {
        self.pool.get_mut(ptr.id())
    }
}

impl<T> BaseArena<T> {
    /// The number of objects allocated so far.
    pub fn len(&self) -> usize { self.pool.len() }

    pub fn is_empty(&self) -> bool { self.pool.is_empty() }

    /// Iterate over the arena in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (BaseArenaPtr<T>, &T)> {
        self.pool
            .iter()
            .enumerate()
            .map(|(index, val)| (BaseArenaPtr::new(index), val))
    }
}

/// Implement the arena traits for a pointer wrapper stored in a container.
#[macro_export]
macro_rules! impl_arena {
    ($arena:ty, $value:ty, $ptr:path, $field:ident) => {
        impl $crate::collections::storage::ArenaPtr for $ptr {
            type A = $arena;
            type T = $value;

            fn try_deref(self, arena: &Self::A) -> Option<&Self::T> {
                $crate::collections::storage::ArenaDeref::try_deref(arena, self)
            }

            fn try_deref_mut(self, arena: &mut Self::A) -> Option<&mut Self::T> {
                $crate::collections::storage::ArenaDeref::try_deref_mut(arena, self)
            }
        }

        impl $crate::collections::storage::ArenaAlloc<$value, $ptr> for $arena {
            fn alloc_with<F>(&mut self, f: F) -> $ptr
            where
                F: FnOnce($ptr) -> $value,
            {
                $ptr($crate::collections::storage::ArenaAlloc::alloc_with(
                    &mut self.$field,
                    |ptr| f($ptr(ptr)),
                ))
            }
        }

        impl $crate::collections::storage::ArenaDeref<$value, $ptr> for $arena {
            fn try_deref(&self, ptr: $ptr) -> Option<&$value> {
                $crate::collections::storage::ArenaDeref::try_deref(&self.$field, ptr.0)
            }

            fn try_deref_mut(&mut self, ptr: $ptr) -> Option<&mut $value> {
                $crate::collections::storage::ArenaDeref::try_deref_mut(&mut self.$field, ptr.0)
            }
        }
    };
}

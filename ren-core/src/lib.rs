//! Virtual-memory primitives and the arena family that everything else in
//! `ren` allocates out of.
//!
//! Layered bottom to top: [`vm`] reserves/commits/frees raw address ranges,
//! [`arena::Arena`] bump-allocates out of a reservation, [`arena::Scratch`]
//! is a scope-bounded lease on a thread-local arena, and [`tlsf`] builds a
//! bounded-fragmentation suballocator on top of one dedicated arena.

pub mod arena;
pub mod tlsf;
pub mod vm;

pub use arena::{Arena, ArenaKind, Scratch};
pub use tlsf::{TlsfAllocation, TlsfPool};

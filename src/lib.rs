//! # btalloc - A Boundary-Tag Memory Allocator
//!
//! This crate provides a `malloc`-style heap that lives entirely inside one
//! growable byte arena. Blocks carry their size at both ends (boundary tags)
//! and free blocks are threaded onto an explicit free list through their own
//! payload space.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌─────┬───────────┬──────────┬──────────┬──────────┬─────────────┬──────────┐
//!   │ pad │ prologue  │ block A  │ block B  │ block C  │   block D   │ epilogue │
//!   │     │ (16:a)    │ (alloc)  │ (free)   │ (alloc)  │   (free)    │  (0:a)   │
//!   └─────┴───────────┴──────────┴────┬─────┴──────────┴──────┬──────┴──────────┘
//!                                     │                       │
//!                        free list:  head ───────────────────► tail
//!
//!   The arena only grows, at its end, like a program break.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   btalloc
//!   ├── align      - Checked align_up to the alignment unit
//!   ├── arena      - Arena trait, MemArena over any byte buffer
//!   ├── mmap       - MmapArena reserved with mmap(2) (unix)
//!   ├── tag        - Boundary tag codec and block address math
//!   ├── free_list  - Explicit doubly linked free list (internal)
//!   ├── fit        - First-fit search and splitting (internal)
//!   ├── coalesce   - Boundary-tag coalescing (internal)
//!   ├── check      - Heap walks, statistics and consistency checker
//!   ├── config     - HeapConfig
//!   ├── error      - ArenaError, HeapError
//!   └── heap       - Heap: allocate, release, resize, zero_allocate
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use btalloc::{Heap, MemArena};
//!
//! let mut heap = Heap::new(MemArena::with_capacity(64 * 1024)).unwrap();
//!
//! // Allocate 100 bytes and write into them
//! let p = heap.allocate(100).unwrap().unwrap();
//! heap.payload_mut(p).unwrap()[..5].copy_from_slice(b"hello");
//!
//! // Grow it; the first bytes come along
//! let q = heap.resize(Some(p), 1000).unwrap().unwrap();
//! assert_eq!(&heap.payload(q).unwrap()[..5], b"hello");
//!
//! heap.release(Some(q)).unwrap();
//! heap.check().unwrap();
//! ```
//!
//! ## How It Works
//!
//! Every block is bracketed by a header and a footer word holding
//! `size | allocated`:
//!
//! ```text
//!   Allocated block:                    Free block:
//!   ┌──────────────┐                    ┌──────────────┐
//!   │ hdr (size:1) │                    │ hdr (size:0) │
//!   ├──────────────┤ ◄── Ptr            ├──────────────┤
//!   │              │                    │ prev_free    │
//!   │   payload    │                    │ next_free    │
//!   │              │                    │ (unused)     │
//!   ├──────────────┤                    ├──────────────┤
//!   │ ftr (size:1) │                    │ ftr (size:0) │
//!   └──────────────┘                    └──────────────┘
//! ```
//!
//! - **Allocation** rounds the request up to a block size, takes the first
//!   free block large enough, and splits off the tail when it can stand on
//!   its own. When nothing fits, the arena grows by at least one chunk.
//! - **Release** clears the allocated bit and merges the block with free
//!   physical neighbors in O(1), found through the neighboring tags. The
//!   always-allocated prologue and epilogue mean there is no edge case.
//!
//! ## Features
//!
//! - **Runs in caller memory**: any `AsMut<[u8]>` buffer can back a heap
//! - **No raw pointers in the API**: blocks are offsets ([`Ptr`]) and every
//!   metadata access is bounds-checked
//! - **Misuse detection**: double releases and foreign pointers are
//!   reported as errors
//! - **Self-check**: [`Heap::check`] verifies every heap invariant
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap the heap in a `Mutex` to share it
//! - **No shrinking**: neither the arena nor a block shrinks in place
//! - **First fit over one list**: no size classes

pub mod align;
pub mod arena;
mod block;
mod check;
mod coalesce;
pub mod config;
pub mod error;
mod fit;
mod free_list;
mod heap;
#[cfg(unix)]
pub mod mmap;
pub mod tag;

pub use arena::{Arena, MemArena};
pub use block::{Block, Ptr};
pub use check::{Blocks, HeapStats};
pub use config::HeapConfig;
pub use error::{ArenaError, HeapError};
pub use heap::Heap;
#[cfg(unix)]
pub use mmap::MmapArena;

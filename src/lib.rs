//! rc-dict: A single-threaded, insertion-ordered map with shared
//! reference semantics and an explicit deep copy.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build Dict in safe, verifiable layers so each piece can be
//!   reasoned about independently.
//! - Layers:
//!   - OrderedHashMap<K, V, S>: structural map that keeps insertion
//!     order through intrusive links and returns stable, generational
//!     entry ids for O(1) average access without re-hashing.
//!   - Dict<K, V, S>: public API; a cheap handle over one shared store.
//!     `clone` aliases the store, `copy` deep-copies it, `take` detaches
//!     a handle while other aliases keep the old entries.
//!   - Iter/IterMut: cursors that pin one entry by id and own their own
//!     alias handle, so they survive unrelated mutation and can outlive
//!     the handle that made them.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` by design (`Rc` + `RefCell`, no
//!   atomics).
//! - Insertion order is observable: iteration, `keys`, `values` and
//!   cursor stepping all follow it. Overwrites keep an entry's position;
//!   remove-then-reinsert moves the key to the back.
//! - Duplicate inserts leave the stored entry untouched; `insert` and
//!   `insert_or_assign` both report whether an insert happened.
//! - Stable, generational ids behind small `EntryId` wrappers; a removed
//!   entry's id never resolves again, even if its slot is reused.
//!
//! Why this split?
//! - Localize invariants: the order list and the hash index live behind
//!   one small structural contract; sharing is purely the outer layer.
//! - No unsafe anywhere: structural indexing uses safe slot-map and
//!   hash-table APIs, and sharing uses `Rc<RefCell<..>>`.
//! - Clear failure boundaries: OrderedHashMap never calls into user code
//!   once the structure is consistent.
//!
//! Sharing and borrow discipline
//! - All aliases of one dict go through a single `RefCell`. Methods take
//!   short-lived borrows internally, so ordinary call patterns never
//!   conflict; only holding a guard (`KeyRef`, `ValueRef`, `ValueMut`)
//!   across a conflicting call on any alias panics.
//! - Guards are taken on demand: two shared guards may coexist while a
//!   `ValueMut` excludes everything else.
//!
//! Cursor invalidation semantics
//! - A cursor is pinned to its entry, not to a position: inserts and
//!   removals elsewhere never disturb it, and stepping continues from
//!   the pinned entry in insertion order.
//! - Once the pinned entry is removed (directly, via `clear`, or through
//!   any alias), every use of the cursor panics. Stale access is a
//!   checked contract violation, never undefined behavior.
//! - The end cursor is a plain sentinel; reading or stepping it panics.
//! - Cursor equality requires the same store: cursors of a deep copy
//!   never compare equal to cursors of the original.
//!
//! Hasher and rehashing invariants
//! - Each entry stores a precomputed `u64` hash and indexing always uses
//!   the stored hash; `K: Hash` is never invoked after insertion. This
//!   avoids rehash-time calls into user code.
//!
//! Notes and non-goals
//! - Still single-threaded; a thread-safe variant would need a different
//!   sharing layer, not a different structural map.
//! - Keys are immutable post-insert; there is no `key_mut`.
//! - Dict deliberately has no content equality: `ptr_eq` answers the
//!   aliasing question, iteration answers the content one.
//! - Public API surface is `Dict`, its cursors and guards; the ordered
//!   structural map is also public for callers that want plain owned
//!   semantics without sharing.

mod dict;
mod iter;
pub mod ordered_hash_map;
mod ordered_hash_map_proptest;

// Public surface
pub use dict::{Dict, KeyRef, NotFoundError, ValueMut, ValueRef};
pub use iter::{EntryMut, EntryRef, Iter, IterMut};

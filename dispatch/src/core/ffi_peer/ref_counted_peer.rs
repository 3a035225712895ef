// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Manually reference-counted objects that are exposed across a foreign-function
//! boundary through an embedded plain-data peer. See [`RefCountedPeer`].
//!
//! Use this only at the FFI seam, where the other side can hold nothing but a raw
//! pointer. Everywhere else, ordinary ownership ([`Box`], [`Arc`]) applies.
//!
//! [`Arc`]: std::sync::Arc

use std::{any::type_name, cell::Cell, ptr::NonNull};

/// The plain-data block handed to foreign code.
///
/// `#[repr(C)]` with `data` first, so foreign code sees a pointer to `P` at offset zero.
/// The back-pointer to the owning [`RefCountedPeer`] is private; only
/// [`RefCountedPeer::from_peer()`] reads it.
#[repr(C)]
#[derive(Debug)]
pub struct PeerBlock<P> {
    pub data: P,
    owner: *mut (),
}

/// Result of [`RefCountedPeer::release()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Retained { remaining: usize },
    /// The count reached zero and the allocation (object and peer block) is gone.
    Destroyed,
}

/// A heap allocation holding an object `T` and its [`PeerBlock<P>`] together, with an
/// explicit reference count that starts at 1.
///
/// ```text
/// NonNull<RefCountedPeer<T, P>> ──────────────┐
///   ┌─────────────────────────────────────────▼──┐
///   │ peer: PeerBlock<P> { data, owner ──────────┼──► (this allocation)
///   │ ref_count: Cell<usize>                     │
///   │ object: T                                  │
///   └────────────────────────────────────────────┘
///      ▲
///      └── peer_ptr() (offset zero) ──► foreign code ──► from_peer() ──► back here
/// ```
///
/// [`retain()`] and [`release()`] are the only mutations. The count is a plain
/// [`Cell`], so the type is neither [`Send`] nor [`Sync`]: every retain, release and
/// lookup for one allocation must happen on the same thread.
///
/// ```
/// # use r3bl_dispatch::{RefCountedPeer, ReleaseOutcome};
/// let peer = RefCountedPeer::create(String::from("surface"), 42_u32);
/// unsafe {
///     RefCountedPeer::retain(peer);
///     assert_eq!(peer.as_ref().ref_count(), 2);
///     assert_eq!(
///         RefCountedPeer::release(peer),
///         ReleaseOutcome::Retained { remaining: 1 }
///     );
///     assert_eq!(RefCountedPeer::release(peer), ReleaseOutcome::Destroyed);
/// }
/// ```
///
/// [`release()`]: RefCountedPeer::release
/// [`retain()`]: RefCountedPeer::retain
#[repr(C)]
#[derive(Debug)]
pub struct RefCountedPeer<T, P> {
    /// Must stay the first field; [`RefCountedPeer::peer_ptr()`] relies on it.
    peer: PeerBlock<P>,
    ref_count: Cell<usize>,
    object: T,
}

impl<T, P> RefCountedPeer<T, P> {
    /// Allocates the object and its peer block together, with a count of 1. The caller
    /// owns that one reference and must eventually pass it to [`release()`].
    ///
    /// [`release()`]: RefCountedPeer::release
    #[must_use]
    pub fn create(object: T, data: P) -> NonNull<Self> {
        let boxed = Box::new(Self {
            peer: PeerBlock {
                data,
                owner: std::ptr::null_mut(),
            },
            ref_count: Cell::new(1),
            object,
        });
        let raw = Box::into_raw(boxed);
        // SAFETY: `raw` comes from `Box::into_raw`, so it is non-null, aligned, and
        // nothing else refers to it yet.
        unsafe {
            (*raw).peer.owner = raw.cast();
            NonNull::new_unchecked(raw)
        }
    }

    /// Adds one reference.
    ///
    /// # Safety
    ///
    /// `this` must come from [`create()`] and must not have been destroyed.
    ///
    /// [`create()`]: RefCountedPeer::create
    pub unsafe fn retain(this: NonNull<Self>) {
        // SAFETY: the caller guarantees `this` is live.
        let it = unsafe { this.as_ref() };
        it.ref_count.set(it.ref_count.get() + 1);
    }

    /// Drops one reference, destroying the allocation when the count reaches zero.
    ///
    /// # Safety
    ///
    /// `this` must come from [`create()`] and must not have been destroyed. After this
    /// returns [`ReleaseOutcome::Destroyed`], `this` and every pointer derived from it
    /// (including [`peer_ptr()`]) dangle.
    ///
    /// [`create()`]: RefCountedPeer::create
    /// [`peer_ptr()`]: RefCountedPeer::peer_ptr
    pub unsafe fn release(this: NonNull<Self>) -> ReleaseOutcome {
        // SAFETY: the caller guarantees `this` is live.
        let remaining = {
            let it = unsafe { this.as_ref() };
            let remaining = it.ref_count.get() - 1;
            it.ref_count.set(remaining);
            remaining
        };

        if remaining > 0 {
            return ReleaseOutcome::Retained { remaining };
        }

        // SAFETY: the count hit zero, so this was the last reference to an allocation
        // that came from `Box::into_raw` in `create()`.
        drop(unsafe { Box::from_raw(this.as_ptr()) });
        tracing::debug!(
            message = "RefCountedPeer destroyed",
            object_type = type_name::<T>()
        );
        ReleaseOutcome::Destroyed
    }

    /// The peer block to hand to foreign code. Valid as long as `this` is.
    #[must_use]
    pub fn peer_ptr(this: NonNull<Self>) -> NonNull<PeerBlock<P>> {
        // `peer` is the first field of a `#[repr(C)]` struct.
        this.cast()
    }

    /// Maps a peer block pointer that came back from foreign code to its owner.
    ///
    /// # Safety
    ///
    /// `peer` must have been returned by [`peer_ptr()`] for an allocation that has not
    /// been destroyed.
    ///
    /// [`peer_ptr()`]: RefCountedPeer::peer_ptr
    #[must_use]
    pub unsafe fn from_peer(peer: NonNull<PeerBlock<P>>) -> NonNull<Self> {
        // SAFETY: the caller guarantees the block is live, so its back-pointer is too.
        let owner = unsafe { peer.as_ref() }.owner;
        // SAFETY: `owner` was set from a non-null `Box::into_raw` result in `create()`.
        unsafe { NonNull::new_unchecked(owner.cast()) }
    }

    #[must_use]
    pub fn ref_count(&self) -> usize { self.ref_count.get() }

    #[must_use]
    pub fn object(&self) -> &T { &self.object }

    #[must_use]
    pub fn peer(&self) -> &PeerBlock<P> { &self.peer }
}

// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Weak references that may only be resolved on the thread that created them. See
//! [`WeakPtrFactory`] and [`ThreadAffineWeak`].

// Attach sources.
mod control_block;
mod thread_affine_weak;
mod weak_ptr_factory;

// Re-export.
pub use control_block::*;
pub use thread_affine_weak::*;
pub use weak_ptr_factory::*;

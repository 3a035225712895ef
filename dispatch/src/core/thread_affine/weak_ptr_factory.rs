// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{ControlBlock, ThreadAffineWeak};
use std::{marker::PhantomData, sync::Arc};

/// Owns a target object and hands out [`ThreadAffineWeak`] references to it that are
/// only valid on the thread that created the factory.
///
/// The factory is `!Send`, so it is always dropped on its creating thread. Its [`Drop`]
/// invalidates the [`ControlBlock`] *before* the target is released, so no weak
/// reference can ever observe a half-destroyed object:
///
/// ```text
/// drop(factory)
///   1. control_block.invalidate()   every ThreadAffineWeak now reports invalid
///   2. drop target (Arc<T>)         the object goes away
///   3. drop control_block           weak references keep their own Arc to it
/// ```
///
/// ```
/// # use r3bl_dispatch::WeakPtrFactory;
/// # use std::sync::Arc;
/// let factory = WeakPtrFactory::new(Arc::new(String::from("texture cache")));
/// let weak = factory.get_weak_ptr();
/// assert_eq!(weak.with(|it| it.len()), Some(13));
///
/// drop(factory);
/// assert!(!weak.is_valid());
/// assert_eq!(weak.with(|it| it.len()), None);
/// ```
#[derive(Debug)]
pub struct WeakPtrFactory<T> {
    control_block: Arc<ControlBlock>,
    target: Arc<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> WeakPtrFactory<T> {
    #[must_use]
    pub fn new(target: Arc<T>) -> Self {
        Self {
            control_block: Arc::new(ControlBlock::new_for_current_thread()),
            target,
            _not_send: PhantomData,
        }
    }

    /// A weak reference sharing this factory's current [`ControlBlock`].
    #[must_use]
    pub fn get_weak_ptr(&self) -> ThreadAffineWeak<T> {
        ThreadAffineWeak::new(Arc::clone(&self.control_block), Arc::downgrade(&self.target))
    }

    /// Invalidates every weak reference handed out so far. References handed out after
    /// this call are valid again, since they get a fresh [`ControlBlock`].
    pub fn invalidate_weak_ptrs(&mut self) {
        self.control_block.invalidate();
        self.control_block = Arc::new(ControlBlock::new_for_current_thread());
    }

    /// Whether any weak reference to the current [`ControlBlock`] is alive.
    #[must_use]
    pub fn has_weak_ptrs(&self) -> bool { Arc::strong_count(&self.control_block) > 1 }

    #[must_use]
    pub fn target(&self) -> &Arc<T> { &self.target }
}

impl<T> Drop for WeakPtrFactory<T> {
    fn drop(&mut self) {
        // Must happen before `target` is dropped, which is right after this returns.
        self.control_block.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_weak_ptr_valid_while_factory_alive() {
        let factory = WeakPtrFactory::new(Arc::new(7_u32));
        let weak = factory.get_weak_ptr();
        assert!(weak.is_valid());
        assert_eq!(weak.upgrade().as_deref(), Some(&7));
        assert!(factory.has_weak_ptrs());
        drop(weak);
        assert!(!factory.has_weak_ptrs());
    }

    #[test]
    fn test_weak_ptr_invalid_after_factory_dropped() {
        let factory = WeakPtrFactory::new(Arc::new(String::from("mesh")));
        let weak = factory.get_weak_ptr();
        let cloned = weak.clone();
        drop(factory);

        assert!(!weak.is_valid());
        assert!(weak.upgrade().is_none());
        assert!(cloned.with(String::len).is_none());
    }

    #[test]
    fn test_invalidate_weak_ptrs_only_affects_existing_references() {
        let mut factory = WeakPtrFactory::new(Arc::new(1_u8));
        let before = factory.get_weak_ptr();
        factory.invalidate_weak_ptrs();
        let after = factory.get_weak_ptr();

        assert!(!before.is_valid());
        assert!(after.is_valid());
        assert_eq!(after.with(|it| *it + 1), Some(2));
    }

    #[test]
    fn test_target_outlives_factory_if_shared_elsewhere() {
        let target = Arc::new(vec![1, 2, 3]);
        let factory = WeakPtrFactory::new(Arc::clone(&target));
        let weak = factory.get_weak_ptr();
        assert!(Arc::ptr_eq(factory.target(), &target));
        drop(factory);

        // The object is alive, but the weak reference still refuses to resolve.
        assert_eq!(target.len(), 3);
        assert!(weak.upgrade().is_none());
    }
}

//! Specialized collection types

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle of a scene owned by the scene manager
    pub struct SceneKey;
}

/// Handle-based map of scenes
pub type HandleMap<T> = SlotMap<SceneKey, T>;

/// Registry shared between the scene manager and every scene it creates
pub type Shared<T> = Arc<RwLock<T>>;

/// Wrap a value for sharing
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Read access that survives a writer panicking elsewhere
pub fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Write access that survives a writer panicking elsewhere
pub fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_map_keys_are_stable() {
        let mut map: HandleMap<&str> = HandleMap::with_key();
        let a = map.insert("a");
        let b = map.insert("b");
        map.remove(a);
        let c = map.insert("c");
        assert_ne!(a, c);
        assert_eq!(map.get(b), Some(&"b"));
        assert!(map.get(a).is_none());
    }

    #[test]
    fn test_shared_read_write() {
        let value = shared(1);
        *write(&value) += 1;
        assert_eq!(*read(&value), 2);
    }
}

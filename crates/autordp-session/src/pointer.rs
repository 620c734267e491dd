//! The pointer cache and the current pointer state.

use std::sync::Arc;

use autordp_graphics::pointer::DecodedPointer;

use crate::SessionResult;

/// Fixed arena of decoded pointers, indexed by the wire `cacheIndex`.
///
/// A new-pointer update at an occupied slot replaces the entry; entries are
/// never evicted otherwise. Referencing an empty slot is a protocol
/// violation.
pub struct PointerCache {
    entries: Vec<Option<Arc<DecodedPointer>>>,
}

impl PointerCache {
    pub fn new(capacity: u16) -> Self {
        Self {
            entries: vec![None; usize::from(capacity)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, cache_index: u16, pointer: Arc<DecodedPointer>) -> SessionResult<()> {
        let slot = self
            .entries
            .get_mut(usize::from(cache_index))
            .ok_or_else(|| reason_err!("PointerCache", "cache index {cache_index} out of bounds"))?;

        *slot = Some(pointer);

        Ok(())
    }

    pub fn get(&self, cache_index: u16) -> SessionResult<Arc<DecodedPointer>> {
        self.entries
            .get(usize::from(cache_index))
            .ok_or_else(|| reason_err!("PointerCache", "cache index {cache_index} out of bounds"))?
            .clone()
            .ok_or_else(|| reason_err!("PointerCache", "cache index {cache_index} was never filled"))
    }
}

/// Current pointer presentation: position, visibility and the active cache
/// slot. Mutated only by the receive path.
pub struct PointerState {
    cache: PointerCache,
    position: (u16, u16),
    visible: bool,
    current_index: Option<u16>,
}

impl PointerState {
    pub fn new(cache_capacity: u16) -> Self {
        Self {
            cache: PointerCache::new(cache_capacity),
            position: (0, 0),
            visible: true,
            current_index: None,
        }
    }

    pub fn position(&self) -> (u16, u16) {
        self.position
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn current_index(&self) -> Option<u16> {
        self.current_index
    }

    /// The pointer image currently shown, when one was transmitted.
    pub fn current_pointer(&self) -> Option<Arc<DecodedPointer>> {
        self.current_index.and_then(|index| self.cache.get(index).ok())
    }

    pub fn set_position(&mut self, x: u16, y: u16) {
        self.position = (x, y);
    }

    pub fn set_hidden(&mut self) {
        self.visible = false;
    }

    /// The operating system default pointer: visible, no cached image.
    pub fn set_default(&mut self) {
        self.visible = true;
        self.current_index = None;
    }

    pub fn install(&mut self, cache_index: u16, pointer: Arc<DecodedPointer>) -> SessionResult<()> {
        self.cache.insert(cache_index, pointer)?;
        self.current_index = Some(cache_index);
        self.visible = true;
        Ok(())
    }

    /// Activates a previously transmitted pointer.
    ///
    /// Fails without mutating any state when the slot was never filled.
    pub fn activate_cached(&mut self, cache_index: u16) -> SessionResult<()> {
        let _ = self.cache.get(cache_index)?;
        self.current_index = Some(cache_index);
        self.visible = true;
        Ok(())
    }

    pub fn cache(&self) -> &PointerCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(width: usize) -> Arc<DecodedPointer> {
        Arc::new(DecodedPointer {
            width,
            height: width,
            hotspot_x: 0,
            hotspot_y: 0,
            rgba_data: vec![0; width * width * 4],
        })
    }

    #[test]
    fn new_entries_replace_slots_and_activate() {
        let mut state = PointerState::new(25);

        state.install(3, pointer(16)).unwrap();
        assert_eq!(state.current_index(), Some(3));

        state.install(5, pointer(32)).unwrap();
        assert_eq!(state.current_index(), Some(5));

        state.activate_cached(3).unwrap();
        assert_eq!(state.current_index(), Some(3));
        assert_eq!(state.current_pointer().unwrap().width, 16);

        // Overwrite by index.
        state.install(3, pointer(48)).unwrap();
        assert_eq!(state.current_pointer().unwrap().width, 48);
    }

    #[test]
    fn activating_an_empty_slot_fails_without_mutation() {
        let mut state = PointerState::new(25);
        state.install(3, pointer(16)).unwrap();

        let error = state.activate_cached(7).unwrap_err();
        assert!(error.to_string().contains("never filled"));
        assert_eq!(state.current_index(), Some(3));
    }

    #[test]
    fn out_of_bounds_index_fails() {
        let mut state = PointerState::new(4);
        assert!(state.install(25, pointer(8)).is_err());
        assert!(state.activate_cached(25).is_err());
    }

    #[test]
    fn hidden_and_default_pointers() {
        let mut state = PointerState::new(4);
        assert!(state.visible());

        state.set_hidden();
        assert!(!state.visible());

        state.set_default();
        assert!(state.visible());
        assert_eq!(state.current_index(), None);
    }
}

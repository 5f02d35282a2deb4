//! Focus Driver
//!
//! Observer-side steering of the LOD controller: move the focus point,
//! temporarily promote tiles worth watching, release them.

use world_core::lod::LodController;

/// Tracks where the observer is looking and drives the LOD focus.
#[derive(Debug, Clone, Default)]
pub struct FocusDriver {
    current: (i64, i64),
    history: Vec<(i64, i64)>,
}

impl FocusDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the focus, remembering where it was.
    pub fn focus_on(&mut self, lod: &mut LodController, x: i64, y: i64) {
        if (x, y) != self.current {
            self.history.push(self.current);
        }
        self.current = (x, y);
        lod.set_focus(x, y);
    }

    /// Returns to the previous focus point, if any.
    pub fn focus_back(&mut self, lod: &mut LodController) -> bool {
        match self.history.pop() {
            Some((x, y)) => {
                self.current = (x, y);
                lod.set_focus(x, y);
                true
            }
            None => false,
        }
    }

    /// Promotes a tile to full detail for a bounded number of ticks.
    pub fn watch(&self, lod: &mut LodController, x: i64, y: i64, ticks: u64) {
        lod.promote_to_full_detail(x, y, ticks);
    }

    /// Releases a watched tile early.
    pub fn release(&self, lod: &mut LodController, x: i64, y: i64) -> bool {
        lod.remove_override(x, y)
    }

    pub fn current(&self) -> (i64, i64) {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_core::lod::DetailLevel;

    #[test]
    fn test_focus_moves_lod() {
        let mut lod = LodController::new();
        let mut driver = FocusDriver::new();
        driver.focus_on(&mut lod, 300, 300);
        assert_eq!(lod.focus(), (300, 300));
        assert_eq!(lod.get_detail_level(300, 300), DetailLevel::Full);
    }

    #[test]
    fn test_focus_back() {
        let mut lod = LodController::new();
        let mut driver = FocusDriver::new();
        driver.focus_on(&mut lod, 100, 0);
        driver.focus_on(&mut lod, 200, 0);
        assert!(driver.focus_back(&mut lod));
        assert_eq!(lod.focus(), (100, 0));
        assert!(driver.focus_back(&mut lod));
        assert_eq!(lod.focus(), (0, 0));
        assert!(!driver.focus_back(&mut lod));
    }

    #[test]
    fn test_watch_and_release() {
        let mut lod = LodController::new();
        let driver = FocusDriver::new();
        driver.watch(&mut lod, 500, 0, 10);
        assert_eq!(lod.get_detail_level(500, 0), DetailLevel::Full);
        assert!(driver.release(&mut lod, 500, 0));
        assert_eq!(lod.get_detail_level(500, 0), DetailLevel::Abstract);
    }
}

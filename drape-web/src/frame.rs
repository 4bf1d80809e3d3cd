use drape_gpu_shared::math;

use crate::error::HostError;
use crate::module::SimulationModule;

/// Delta reported for the first frame, before a previous timestamp exists.
pub const NOMINAL_FRAME_SECONDS: f64 = 1.0 / 60.0;

/// Turns `requestAnimationFrame` timestamps (milliseconds) into frame deltas.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    previous: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the last committed timestamp. Timestamps that go
    /// backwards yield zero.
    pub fn delta(&self, timestamp_ms: f64) -> f64 {
        match self.previous {
            Some(previous) => ((timestamp_ms - previous) * 0.001).max(0.0),
            None => NOMINAL_FRAME_SECONDS,
        }
    }

    pub fn commit(&mut self, timestamp_ms: f64) {
        self.previous = Some(timestamp_ms);
    }
}

/// Per-frame step: advance the module, then report the frame rate.
#[derive(Debug, Default)]
pub struct FrameDriver {
    clock: FrameClock,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame and return the frame-rate readout text.
    ///
    /// The module's callbacks into the host all happen inside `update`.
    pub fn frame<M: SimulationModule + ?Sized>(&mut self, module: &M, timestamp_ms: f64) -> Result<String, HostError> {
        let delta = self.clock.delta(timestamp_ms);
        module.update(delta as f32)?;
        self.clock.commit(timestamp_ms);
        Ok(math::fps_readout(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct UpdateLog {
        deltas: RefCell<Vec<f32>>,
        fail: bool,
    }

    impl SimulationModule for UpdateLog {
        fn setup(&self) -> Result<(), HostError> {
            Ok(())
        }
        fn update(&self, delta_seconds: f32) -> Result<(), HostError> {
            if self.fail {
                return Err(HostError::Js("trap".to_string()));
            }
            self.deltas.borrow_mut().push(delta_seconds);
            Ok(())
        }
        fn pointer_down(&self) -> Result<(), HostError> {
            Ok(())
        }
        fn pointer_up(&self) -> Result<(), HostError> {
            Ok(())
        }
        fn pointer_move(&self, _x: f64, _y: f64) -> Result<(), HostError> {
            Ok(())
        }
        fn key_down(&self, _code: u32) -> Result<(), HostError> {
            Ok(())
        }
    }

    // ── FrameClock ──

    #[test]
    fn test_first_frame_is_nominal() {
        let clock = FrameClock::new();
        assert_eq!(clock.delta(123_456.0), NOMINAL_FRAME_SECONDS);
    }

    #[test]
    fn test_delta_in_seconds() {
        let mut clock = FrameClock::new();
        clock.commit(1000.0);
        assert!((clock.delta(1016.0) - 0.016).abs() < 1e-9);
        assert_eq!(clock.delta(900.0), 0.0);
    }

    // ── FrameDriver ──

    #[test]
    fn test_driver_feeds_module_and_reports_fps() {
        let module = UpdateLog::default();
        let mut driver = FrameDriver::new();

        assert_eq!(driver.frame(&module, 5000.0).unwrap(), "FPS: 60.0");
        assert_eq!(driver.frame(&module, 5020.0).unwrap(), "FPS: 50.0");
        assert_eq!(driver.frame(&module, 5020.0).unwrap(), "FPS: --");

        let deltas = module.deltas.borrow();
        assert_eq!(deltas.len(), 3);
        assert!((deltas[1] - 0.02).abs() < 1e-6);
        assert_eq!(deltas[2], 0.0);
    }

    #[test]
    fn test_failed_update_does_not_advance_clock() {
        let module = UpdateLog { fail: true, ..Default::default() };
        let mut driver = FrameDriver::new();
        assert!(driver.frame(&module, 100.0).is_err());
        assert_eq!(driver.clock.delta(100.0), NOMINAL_FRAME_SECONDS);
    }
}

//! Panel power rail sequencing
//!
//! Powering the panel up is slow, so it happens lazily before the first draw
//! and then stays on across a burst of draws. Power-off only happens when the
//! application asks for it or the device is torn down.

use log::info;

/// Native power primitives of a panel library
pub trait PowerRail {
    fn power_on(&mut self);

    fn power_off(&mut self);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PowerState {
    #[default]
    Off,
    On,
}

/// Tracks the panel power state and only calls into the rail on transitions
#[derive(Debug, Default)]
pub struct PowerSequencer {
    state: PowerState,
}

impl PowerSequencer {
    /// A sequencer that assumes the rail starts off
    pub const fn new() -> Self {
        Self {
            state: PowerState::Off,
        }
    }

    /// Last state driven onto the rail
    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == PowerState::On
    }

    /// Power the rail on if it is off
    pub fn ensure_on<R: PowerRail + ?Sized>(&mut self, rail: &mut R) {
        if self.state == PowerState::Off {
            rail.power_on();
            self.state = PowerState::On;
            info!("[EPD] power on");
        }
    }

    /// Switch the rail to the requested state; no-op if already there
    pub fn set_power_on<R: PowerRail + ?Sized>(&mut self, rail: &mut R, on: bool) {
        if on {
            self.ensure_on(rail);
        } else if self.state == PowerState::On {
            rail.power_off();
            self.state = PowerState::Off;
            info!("[EPD] power off");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingRail {
        on: usize,
        off: usize,
    }

    impl PowerRail for CountingRail {
        fn power_on(&mut self) {
            self.on += 1;
        }

        fn power_off(&mut self) {
            self.off += 1;
        }
    }

    #[test]
    fn ensure_on_twice_powers_once() {
        let mut rail = CountingRail::default();
        let mut power = PowerSequencer::new();
        power.ensure_on(&mut rail);
        power.ensure_on(&mut rail);
        assert_eq!(rail.on, 1);
        assert!(power.is_on());
    }

    #[test]
    fn power_off_when_off_is_a_no_op() {
        let mut rail = CountingRail::default();
        let mut power = PowerSequencer::new();
        power.set_power_on(&mut rail, false);
        assert_eq!(rail.off, 0);
        assert_eq!(power.state(), PowerState::Off);
    }

    #[test]
    fn explicit_cycle_hits_both_primitives() {
        let mut rail = CountingRail::default();
        let mut power = PowerSequencer::new();
        power.set_power_on(&mut rail, true);
        power.set_power_on(&mut rail, true);
        power.set_power_on(&mut rail, false);
        power.set_power_on(&mut rail, false);
        assert_eq!((rail.on, rail.off), (1, 1));
        assert!(!power.is_on());
    }
}

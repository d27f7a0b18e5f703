/// Master clocks between timer decrements: 1024 cycles of the 7.16 MHz clock.
pub const TIMER_CLOCK_DIVIDER: u32 = 1024 * 3;

/// HuC6280 7-bit interval timer.
#[derive(Clone, Debug, Default, bincode::Encode, bincode::Decode)]
pub struct Timer {
    reload: u8,
    counter: u8,
    enabled: bool,
    prescaler: u32,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.prescaler >= TIMER_CLOCK_DIVIDER {
            return Err("timer prescaler out of range");
        }
        Ok(())
    }

    pub fn counter(&self) -> u8 {
        self.counter & 0x7F
    }

    pub fn reload(&self) -> u8 {
        self.reload
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn write_reload(&mut self, value: u8) {
        self.reload = value & 0x7F;
    }

    pub fn write_control(&mut self, value: u8) {
        let enable = value & 0x01 != 0;
        if enable && !self.enabled {
            self.counter = self.reload;
            self.prescaler = 0;
        }
        self.enabled = enable;
    }

    /// Advance by `master_clocks`. Returns true when the counter underflowed.
    pub fn tick(&mut self, master_clocks: u32) -> bool {
        if !self.enabled {
            return false;
        }
        self.prescaler += master_clocks;
        let mut fired = false;
        while self.prescaler >= TIMER_CLOCK_DIVIDER {
            self.prescaler -= TIMER_CLOCK_DIVIDER;
            if self.counter == 0 {
                self.counter = self.reload;
                fired = true;
            } else {
                self.counter -= 1;
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_timer_never_fires() {
        let mut timer = Timer::new();
        timer.write_reload(0);
        assert!(!timer.tick(TIMER_CLOCK_DIVIDER * 10));
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn enabling_loads_counter_from_reload() {
        let mut timer = Timer::new();
        timer.write_reload(0x85);
        timer.write_control(0x01);
        assert_eq!(timer.counter(), 0x05);
    }

    #[test]
    fn underflow_reloads_and_fires() {
        let mut timer = Timer::new();
        timer.write_reload(2);
        timer.write_control(0x01);
        assert!(!timer.tick(TIMER_CLOCK_DIVIDER));
        assert_eq!(timer.counter(), 1);
        assert!(!timer.tick(TIMER_CLOCK_DIVIDER - 1));
        assert!(!timer.tick(1));
        assert_eq!(timer.counter(), 0);
        assert!(timer.tick(TIMER_CLOCK_DIVIDER));
        assert_eq!(timer.counter(), 2);
    }
}

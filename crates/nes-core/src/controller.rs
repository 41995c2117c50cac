//! Controller shift latches
//!
//! Each controller port is an 8-bit parallel-in, serial-out shift register.
//! Writing $4016 with bit 0 set enters strobe mode; dropping the bit latches
//! the live button state. Reads return bit 7 and shift left, so button A
//! comes out first.

use bitflags::bitflags;
use log::trace;

bitflags! {
    /// Button state in latch order: A shifts out first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Buttons: u8 {
        const A      = 0b1000_0000;
        const B      = 0b0100_0000;
        const SELECT = 0b0010_0000;
        const START  = 0b0001_0000;
        const UP     = 0b0000_1000;
        const DOWN   = 0b0000_0100;
        const LEFT   = 0b0000_0010;
        const RIGHT  = 0b0000_0001;
    }
}

/// One standard NES controller.
#[derive(Debug, Clone, Default)]
pub struct Controller {
    state: Buttons,
    shift: u8,
    strobe: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live button state; sampled by the front end once per frame.
    pub fn set_buttons(&mut self, buttons: Buttons) {
        self.state = buttons;
    }

    /// Port write. The 1→0 strobe transition latches the live state into the
    /// shift register.
    pub fn write(&mut self, data: u8) {
        let strobe = data & 0x01 != 0;
        if self.strobe && !strobe {
            self.shift = self.state.bits();
            trace!("controller latch: {:08b}", self.shift);
        }
        self.strobe = strobe;
    }

    /// Port read: bit 7 out, shift left. While strobed the register tracks
    /// the live state, so reads keep returning button A.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.shift = self.state.bits();
        }
        let bit = self.shift >> 7;
        self.shift <<= 1;
        bit
    }

    /// Side-effect-free read for bus peeks.
    pub fn peek(&self) -> u8 {
        if self.strobe {
            self.state.bits() >> 7
        } else {
            self.shift >> 7
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_then_shift_out_in_canonical_order() {
        let mut pad = Controller::new();
        pad.set_buttons(Buttons::A | Buttons::START);

        pad.write(1);
        pad.write(0);

        // A, B, Select, Start, Up, Down, Left, Right
        let bits: Vec<u8> = (0..8).map(|_| pad.read()).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn strobed_reads_track_button_a() {
        let mut pad = Controller::new();
        pad.set_buttons(Buttons::A);
        pad.write(1);
        assert_eq!(pad.read(), 1);
        assert_eq!(pad.read(), 1);

        pad.set_buttons(Buttons::empty());
        assert_eq!(pad.read(), 0);
    }

    #[test]
    fn relatch_requires_strobe_edge() {
        let mut pad = Controller::new();
        pad.set_buttons(Buttons::B);
        pad.write(1);
        pad.write(0);
        assert_eq!(pad.read(), 0); // A
        assert_eq!(pad.read(), 1); // B

        // Button state changed, but without a strobe edge the register
        // keeps draining the old latch.
        pad.set_buttons(Buttons::A);
        assert_eq!(pad.read(), 0); // Select slot of the old latch
    }

    #[test]
    fn register_drains_to_zero() {
        let mut pad = Controller::new();
        pad.set_buttons(Buttons::all());
        pad.write(1);
        pad.write(0);
        for _ in 0..8 {
            assert_eq!(pad.read(), 1);
        }
        assert_eq!(pad.read(), 0);
    }
}

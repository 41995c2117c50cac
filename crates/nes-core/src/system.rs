//! Integration module for the complete NES system
//!
//! [`Nes`] owns the CPU and the bus (which in turn owns the PPU, cartridge,
//! controllers and DMA engine) and drives them from a single master clock:
//! the PPU steps every master tick, the CPU every third tick unless an OAM
//! DMA transfer has it halted. The machine is deterministic; given the same
//! ROM and the same per-frame button samples it produces bit-identical
//! frames.

use crate::bus::Bus;
use crate::cartridge::Cartridge;
use crate::controller::Buttons;
use crate::cpu::{Bus as CpuBus, Cpu};
use crate::palette::Palette;
use crate::ppu::{Frame, Ppu};

/// The complete console.
#[derive(Debug, Clone)]
pub struct Nes {
    cpu: Cpu,
    bus: Bus,
    master_clock: u64,
    frame_count: u64,
}

impl Nes {
    pub fn new(palette: Palette) -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(palette),
            master_clock: 0,
            frame_count: 0,
        }
    }

    /// Connect a cartridge. The reset vector only becomes meaningful after
    /// this, so callers normally [`reset`](Self::reset) next.
    pub fn insert_cartridge(&mut self, cart: Cartridge) {
        self.bus.insert_cartridge(cart);
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        self.master_clock = 0;
        self.frame_count = 0;
    }

    /// Advance one master tick: PPU always, CPU every third tick unless
    /// DMA-stalled, then forward the PPU's NMI edge.
    pub fn clock(&mut self) {
        self.bus.tick_ppu();

        if self.master_clock % 3 == 0 {
            if self.bus.dma_active() && self.cpu.complete() {
                self.bus.dma_tick(self.cpu.cycle_count());
                self.cpu.stall_tick();
            } else {
                self.cpu.tick(&mut self.bus);
            }
            self.bus.tick_apu();
        }

        if self.bus.ppu_mut().take_nmi() {
            self.cpu.nmi();
        }

        self.master_clock += 1;
    }

    /// Run to the next CPU instruction boundary. A DMA stall in the way is
    /// driven to completion, so the boundary is a real one.
    pub fn step_instruction(&mut self) {
        while self.bus.dma_active() {
            self.clock();
        }
        let start = self.cpu.cycle_count();
        while self.cpu.cycle_count() == start {
            self.clock();
        }
        while !self.cpu.complete() || self.bus.dma_active() {
            self.clock();
        }
    }

    /// Consume the latched frame-completion edge; true once per frame.
    pub fn frame_ready(&mut self) -> bool {
        if self.bus.ppu_mut().take_frame_complete() {
            self.frame_count += 1;
            true
        } else {
            false
        }
    }

    /// Run until the PPU finishes the current frame.
    pub fn step_frame(&mut self) {
        loop {
            self.clock();
            if self.frame_ready() {
                break;
            }
        }
    }

    /// Frames completed since reset.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The frame most recently rendered (or in progress).
    pub fn frame(&self) -> &Frame {
        self.bus.ppu().frame()
    }

    /// Replace the live button state for one controller port; sampled by
    /// the front end between frames.
    pub fn set_buttons(&mut self, port: usize, buttons: Buttons) {
        self.bus.set_buttons(port, buttons);
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        self.bus.ppu()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.bus.cartridge()
    }

    /// Side-effect-free memory read, for tracing and tests.
    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Memory write through the bus, with full side effects.
    pub fn poke(&mut self, addr: u16, data: u8) {
        self.bus.write(addr, data);
    }

    /// The nestest-style trace line for the next instruction. Valid at an
    /// instruction boundary, which `step_instruction` always leaves us at.
    pub fn trace_line(&self) -> String {
        self.cpu.trace_line(&self.bus)
    }

    /// Render a pattern table for the debug panel.
    pub fn pattern_table(&self, table: u8, palette: u8) -> Option<Vec<u8>> {
        let cart = self.bus.cartridge()?;
        Some(self.bus.ppu().pattern_table(cart, table, palette))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::INES_MAGIC;

    /// Minimal NROM image: reset vector at $8000, body of NOPs.
    fn nop_cartridge() -> Cartridge {
        let mut prg = vec![0xEA; 16 * 1024];
        prg[0x3FFC] = 0x00;
        prg[0x3FFD] = 0x80;
        let mut rom = Vec::new();
        rom.extend_from_slice(&INES_MAGIC);
        rom.push(1);
        rom.push(1);
        rom.push(0);
        rom.push(0);
        rom.extend_from_slice(&[0u8; 8]);
        rom.extend_from_slice(&prg);
        rom.extend_from_slice(&[0u8; 8 * 1024]);
        Cartridge::from_bytes(&rom).unwrap()
    }

    #[test]
    fn reset_loads_pc_from_vector() {
        let mut nes = Nes::new(Palette::ntsc());
        nes.insert_cartridge(nop_cartridge());
        nes.reset();
        assert_eq!(nes.cpu().pc, 0x8000);
    }

    #[test]
    fn cpu_runs_at_a_third_of_the_master_clock() {
        let mut nes = Nes::new(Palette::ntsc());
        nes.insert_cartridge(nop_cartridge());
        nes.reset();

        for _ in 0..300 {
            nes.clock();
        }
        assert_eq!(nes.cpu().cycle_count(), 100);
    }

    #[test]
    fn step_instruction_lands_on_a_boundary() {
        let mut nes = Nes::new(Palette::ntsc());
        nes.insert_cartridge(nop_cartridge());
        nes.reset();

        nes.step_instruction(); // burns the reset sequence
        let pc = nes.cpu().pc;
        nes.step_instruction();
        assert_eq!(nes.cpu().pc, pc.wrapping_add(1)); // NOP is one byte
        assert!(nes.cpu().complete());
    }
}

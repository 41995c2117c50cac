//! Address-range disassembler
//!
//! Walks a span of the address space and renders each instruction as a
//! printable line keyed by its address. Reads go through [`Bus::peek`], so
//! disassembly is a pure function of memory at the moment it runs; it
//! exists for the debug panel and never feeds back into execution.

use std::collections::BTreeMap;

use crate::cpu::{AddrMode, Bus, OPCODE_TABLE};

/// Disassemble `[start, end]` into address → text. Operand bytes that run
/// past `end` are still consumed, matching how the CPU would fetch them.
pub fn disassemble(bus: &impl Bus, start: u16, end: u16) -> BTreeMap<u16, String> {
    let mut lines = BTreeMap::new();
    // Wider than u16 so the loop can detect running off the end.
    let mut addr = start as u32;

    while addr <= end as u32 {
        let line_addr = addr as u16;
        let opcode = bus.peek(addr as u16);
        addr += 1;
        let inst = OPCODE_TABLE[opcode as usize];

        let operand = match inst.mode {
            AddrMode::Imp => "{IMP}".to_string(),
            AddrMode::Imm => {
                let value = bus.peek(addr as u16);
                addr += 1;
                format!("#${:02X} {{IMM}}", value)
            }
            AddrMode::Zp0 => {
                let lo = bus.peek(addr as u16);
                addr += 1;
                format!("${:02X} {{ZP0}}", lo)
            }
            AddrMode::Zpx => {
                let lo = bus.peek(addr as u16);
                addr += 1;
                format!("${:02X},X {{ZPX}}", lo)
            }
            AddrMode::Zpy => {
                let lo = bus.peek(addr as u16);
                addr += 1;
                format!("${:02X},Y {{ZPY}}", lo)
            }
            AddrMode::Rel => {
                let value = bus.peek(addr as u16);
                addr += 1;
                let target = (addr as u16).wrapping_add(value as i8 as i16 as u16);
                format!("${:02X} [${:04X}] {{REL}}", value, target)
            }
            AddrMode::Abs => {
                let word = peek_word(bus, &mut addr);
                format!("${:04X} {{ABS}}", word)
            }
            AddrMode::Abx => {
                let word = peek_word(bus, &mut addr);
                format!("${:04X},X {{ABX}}", word)
            }
            AddrMode::Aby => {
                let word = peek_word(bus, &mut addr);
                format!("${:04X},Y {{ABY}}", word)
            }
            AddrMode::Ind => {
                let word = peek_word(bus, &mut addr);
                format!("(${:04X}) {{IND}}", word)
            }
            AddrMode::Izx => {
                let lo = bus.peek(addr as u16);
                addr += 1;
                format!("(${:02X},X) {{IZX}}", lo)
            }
            AddrMode::Izy => {
                let lo = bus.peek(addr as u16);
                addr += 1;
                format!("(${:02X}),Y {{IZY}}", lo)
            }
        };

        lines.insert(
            line_addr,
            format!("${:04X}: {} {}", line_addr, inst.mnemonic, operand),
        );
    }

    lines
}

fn peek_word(bus: &impl Bus, addr: &mut u32) -> u16 {
    let lo = bus.peek(*addr as u16) as u16;
    *addr += 1;
    let hi = bus.peek(*addr as u16) as u16;
    *addr += 1;
    (hi << 8) | lo
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlatBus(Vec<u8>);

    impl Bus for FlatBus {
        fn read(&mut self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
        fn write(&mut self, addr: u16, data: u8) {
            self.0[addr as usize] = data;
        }
        fn peek(&self, addr: u16) -> u8 {
            self.0[addr as usize]
        }
    }

    #[test]
    fn renders_common_modes() {
        let mut mem = vec![0u8; 0x10000];
        mem[0x8000..0x8007].copy_from_slice(&[0xA9, 0x44, 0x8D, 0x00, 0x20, 0xD0, 0xFE]);
        let bus = FlatBus(mem);

        let lines = disassemble(&bus, 0x8000, 0x8006);
        assert_eq!(lines[&0x8000], "$8000: LDA #$44 {IMM}");
        assert_eq!(lines[&0x8002], "$8002: STA $2000 {ABS}");
        assert_eq!(lines[&0x8005], "$8005: BNE $FE [$8005] {REL}");
    }

    #[test]
    fn keys_are_instruction_starts() {
        let mut mem = vec![0u8; 0x10000];
        mem[0x8000..0x8004].copy_from_slice(&[0x4C, 0x00, 0x90, 0xEA]);
        let bus = FlatBus(mem);

        let lines = disassemble(&bus, 0x8000, 0x8003);
        let keys: Vec<u16> = lines.keys().copied().collect();
        assert_eq!(keys, vec![0x8000, 0x8003]);
    }

    #[test]
    fn does_not_mutate_memory() {
        let mem = vec![0xEAu8; 0x10000];
        let bus = FlatBus(mem.clone());
        let _ = disassemble(&bus, 0x0000, 0x00FF);
        assert_eq!(bus.0, mem);
    }
}

//! CPU module - 2A03 (6502 variant) implementation
//!
//! The NES CPU is a 6502 without decimal mode. The interpreter executes one
//! complete instruction at the first cycle of its timing window and then
//! counts the remaining cycles down, which matches observed per-instruction
//! timing without micro-op decomposition: the CPU only touches visible
//! state at instruction boundaries, so intermediate cycles exist purely to
//! keep the PPU interleave honest.

use std::fmt;

use bitflags::bitflags;
use log::warn;

/// Bottom of the hardware stack page.
pub const STACK_BASE: u16 = 0x0100;

/// Reset vector location.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// NMI vector location.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// IRQ/BRK vector location.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Address space the CPU executes against. Implemented by the system bus
/// and by flat test memories.
pub trait Bus {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
    /// Side-effect-free read, used by tracing and disassembly. Must not
    /// disturb latched hardware state the way `read` may.
    fn peek(&self, addr: u16) -> u8;
}

bitflags! {
    /// CPU status register (P).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const CARRY     = 0b0000_0001;
        const ZERO      = 0b0000_0010;
        const INTERRUPT = 0b0000_0100;
        const DECIMAL   = 0b0000_1000;
        const BREAK     = 0b0001_0000;
        const UNUSED    = 0b0010_0000;
        const OVERFLOW  = 0b0100_0000;
        const NEGATIVE  = 0b1000_0000;
    }
}

/// Addressing modes of the 6502.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Implied / accumulator
    Imp,
    /// Immediate operand at PC
    Imm,
    /// Zero page
    Zp0,
    /// Zero page indexed by X
    Zpx,
    /// Zero page indexed by Y
    Zpy,
    /// Signed 8-bit branch displacement
    Rel,
    /// 16-bit absolute
    Abs,
    /// Absolute indexed by X
    Abx,
    /// Absolute indexed by Y
    Aby,
    /// Indirect (JMP only, with the page-wrap bug)
    Ind,
    /// Indexed indirect: (zp + X)
    Izx,
    /// Indirect indexed: (zp) + Y
    Izy,
}

/// Instruction mnemonics. `Xxx` stands in for the 105 illegal encodings,
/// which execute as timed no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
    Xxx,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mnemonic::Adc => "ADC", Mnemonic::And => "AND", Mnemonic::Asl => "ASL",
            Mnemonic::Bcc => "BCC", Mnemonic::Bcs => "BCS", Mnemonic::Beq => "BEQ",
            Mnemonic::Bit => "BIT", Mnemonic::Bmi => "BMI", Mnemonic::Bne => "BNE",
            Mnemonic::Bpl => "BPL", Mnemonic::Brk => "BRK", Mnemonic::Bvc => "BVC",
            Mnemonic::Bvs => "BVS", Mnemonic::Clc => "CLC", Mnemonic::Cld => "CLD",
            Mnemonic::Cli => "CLI", Mnemonic::Clv => "CLV", Mnemonic::Cmp => "CMP",
            Mnemonic::Cpx => "CPX", Mnemonic::Cpy => "CPY", Mnemonic::Dec => "DEC",
            Mnemonic::Dex => "DEX", Mnemonic::Dey => "DEY", Mnemonic::Eor => "EOR",
            Mnemonic::Inc => "INC", Mnemonic::Inx => "INX", Mnemonic::Iny => "INY",
            Mnemonic::Jmp => "JMP", Mnemonic::Jsr => "JSR", Mnemonic::Lda => "LDA",
            Mnemonic::Ldx => "LDX", Mnemonic::Ldy => "LDY", Mnemonic::Lsr => "LSR",
            Mnemonic::Nop => "NOP", Mnemonic::Ora => "ORA", Mnemonic::Pha => "PHA",
            Mnemonic::Php => "PHP", Mnemonic::Pla => "PLA", Mnemonic::Plp => "PLP",
            Mnemonic::Rol => "ROL", Mnemonic::Ror => "ROR", Mnemonic::Rti => "RTI",
            Mnemonic::Rts => "RTS", Mnemonic::Sbc => "SBC", Mnemonic::Sec => "SEC",
            Mnemonic::Sed => "SED", Mnemonic::Sei => "SEI", Mnemonic::Sta => "STA",
            Mnemonic::Stx => "STX", Mnemonic::Sty => "STY", Mnemonic::Tax => "TAX",
            Mnemonic::Tay => "TAY", Mnemonic::Tsx => "TSX", Mnemonic::Txa => "TXA",
            Mnemonic::Txs => "TXS", Mnemonic::Tya => "TYA", Mnemonic::Xxx => "???",
        };
        f.write_str(name)
    }
}

/// One decode table entry: mnemonic, addressing mode, base cycle count.
#[derive(Debug, Clone, Copy)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub mode: AddrMode,
    pub cycles: u8,
}

const fn op(mnemonic: Mnemonic, mode: AddrMode, cycles: u8) -> Instruction {
    Instruction { mnemonic, mode, cycles }
}

/// The 256-entry decode table, one row per high nibble. Illegal encodings
/// keep the addressing mode and cycle count of the common unofficial
/// tables so that programs hitting them stay in sync with the PPU.
///
/// Reference: http://archive.6502.org/datasheets/rockwell_r650x_r651x.pdf
#[rustfmt::skip]
pub const OPCODE_TABLE: [Instruction; 256] = {
    use AddrMode::*;
    use Mnemonic::*;
    [
        op(Brk,Imp,7), op(Ora,Izx,6), op(Xxx,Imp,2), op(Xxx,Izx,8), op(Xxx,Zp0,3), op(Ora,Zp0,3), op(Asl,Zp0,5), op(Xxx,Zp0,5),
        op(Php,Imp,3), op(Ora,Imm,2), op(Asl,Imp,2), op(Xxx,Imm,2), op(Xxx,Abs,4), op(Ora,Abs,4), op(Asl,Abs,6), op(Xxx,Abs,6),
        op(Bpl,Rel,2), op(Ora,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,8), op(Xxx,Zpx,4), op(Ora,Zpx,4), op(Asl,Zpx,6), op(Xxx,Zpx,6),
        op(Clc,Imp,2), op(Ora,Aby,4), op(Xxx,Imp,2), op(Xxx,Aby,7), op(Xxx,Abx,4), op(Ora,Abx,4), op(Asl,Abx,7), op(Xxx,Abx,7),
        op(Jsr,Abs,6), op(And,Izx,6), op(Xxx,Imp,2), op(Xxx,Izx,8), op(Bit,Zp0,3), op(And,Zp0,3), op(Rol,Zp0,5), op(Xxx,Zp0,5),
        op(Plp,Imp,4), op(And,Imm,2), op(Rol,Imp,2), op(Xxx,Imm,2), op(Bit,Abs,4), op(And,Abs,4), op(Rol,Abs,6), op(Xxx,Abs,6),
        op(Bmi,Rel,2), op(And,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,8), op(Xxx,Zpx,4), op(And,Zpx,4), op(Rol,Zpx,6), op(Xxx,Zpx,6),
        op(Sec,Imp,2), op(And,Aby,4), op(Xxx,Imp,2), op(Xxx,Aby,7), op(Xxx,Abx,4), op(And,Abx,4), op(Rol,Abx,7), op(Xxx,Abx,7),
        op(Rti,Imp,6), op(Eor,Izx,6), op(Xxx,Imp,2), op(Xxx,Izx,8), op(Xxx,Zp0,3), op(Eor,Zp0,3), op(Lsr,Zp0,5), op(Xxx,Zp0,5),
        op(Pha,Imp,3), op(Eor,Imm,2), op(Lsr,Imp,2), op(Xxx,Imm,2), op(Jmp,Abs,3), op(Eor,Abs,4), op(Lsr,Abs,6), op(Xxx,Abs,6),
        op(Bvc,Rel,2), op(Eor,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,8), op(Xxx,Zpx,4), op(Eor,Zpx,4), op(Lsr,Zpx,6), op(Xxx,Zpx,6),
        op(Cli,Imp,2), op(Eor,Aby,4), op(Xxx,Imp,2), op(Xxx,Aby,7), op(Xxx,Abx,4), op(Eor,Abx,4), op(Lsr,Abx,7), op(Xxx,Abx,7),
        op(Rts,Imp,6), op(Adc,Izx,6), op(Xxx,Imp,2), op(Xxx,Izx,8), op(Xxx,Zp0,3), op(Adc,Zp0,3), op(Ror,Zp0,5), op(Xxx,Zp0,5),
        op(Pla,Imp,4), op(Adc,Imm,2), op(Ror,Imp,2), op(Xxx,Imm,2), op(Jmp,Ind,5), op(Adc,Abs,4), op(Ror,Abs,6), op(Xxx,Abs,6),
        op(Bvs,Rel,2), op(Adc,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,8), op(Xxx,Zpx,4), op(Adc,Zpx,4), op(Ror,Zpx,6), op(Xxx,Zpx,6),
        op(Sei,Imp,2), op(Adc,Aby,4), op(Xxx,Imp,2), op(Xxx,Aby,7), op(Xxx,Abx,4), op(Adc,Abx,4), op(Ror,Abx,7), op(Xxx,Abx,7),
        op(Xxx,Imm,2), op(Sta,Izx,6), op(Xxx,Imm,2), op(Xxx,Izx,6), op(Sty,Zp0,3), op(Sta,Zp0,3), op(Stx,Zp0,3), op(Xxx,Zp0,3),
        op(Dey,Imp,2), op(Xxx,Imm,2), op(Txa,Imp,2), op(Xxx,Imm,2), op(Sty,Abs,4), op(Sta,Abs,4), op(Stx,Abs,4), op(Xxx,Abs,4),
        op(Bcc,Rel,2), op(Sta,Izy,6), op(Xxx,Imp,2), op(Xxx,Izy,6), op(Sty,Zpx,4), op(Sta,Zpx,4), op(Stx,Zpy,4), op(Xxx,Zpy,4),
        op(Tya,Imp,2), op(Sta,Aby,5), op(Txs,Imp,2), op(Xxx,Aby,5), op(Xxx,Abx,5), op(Sta,Abx,5), op(Xxx,Aby,5), op(Xxx,Aby,5),
        op(Ldy,Imm,2), op(Lda,Izx,6), op(Ldx,Imm,2), op(Xxx,Izx,6), op(Ldy,Zp0,3), op(Lda,Zp0,3), op(Ldx,Zp0,3), op(Xxx,Zp0,3),
        op(Tay,Imp,2), op(Lda,Imm,2), op(Tax,Imp,2), op(Xxx,Imm,2), op(Ldy,Abs,4), op(Lda,Abs,4), op(Ldx,Abs,4), op(Xxx,Abs,4),
        op(Bcs,Rel,2), op(Lda,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,5), op(Ldy,Zpx,4), op(Lda,Zpx,4), op(Ldx,Zpy,4), op(Xxx,Zpy,4),
        op(Clv,Imp,2), op(Lda,Aby,4), op(Tsx,Imp,2), op(Xxx,Aby,4), op(Ldy,Abx,4), op(Lda,Abx,4), op(Ldx,Aby,4), op(Xxx,Aby,4),
        op(Cpy,Imm,2), op(Cmp,Izx,6), op(Xxx,Imm,2), op(Xxx,Izx,8), op(Cpy,Zp0,3), op(Cmp,Zp0,3), op(Dec,Zp0,5), op(Xxx,Zp0,5),
        op(Iny,Imp,2), op(Cmp,Imm,2), op(Dex,Imp,2), op(Xxx,Imm,2), op(Cpy,Abs,4), op(Cmp,Abs,4), op(Dec,Abs,6), op(Xxx,Abs,6),
        op(Bne,Rel,2), op(Cmp,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,8), op(Xxx,Zpx,4), op(Cmp,Zpx,4), op(Dec,Zpx,6), op(Xxx,Zpx,6),
        op(Cld,Imp,2), op(Cmp,Aby,4), op(Xxx,Imp,2), op(Xxx,Aby,7), op(Xxx,Abx,4), op(Cmp,Abx,4), op(Dec,Abx,7), op(Xxx,Abx,7),
        op(Cpx,Imm,2), op(Sbc,Izx,6), op(Xxx,Imm,2), op(Xxx,Izx,8), op(Cpx,Zp0,3), op(Sbc,Zp0,3), op(Inc,Zp0,5), op(Xxx,Zp0,5),
        op(Inx,Imp,2), op(Sbc,Imm,2), op(Nop,Imp,2), op(Xxx,Imm,2), op(Cpx,Abs,4), op(Sbc,Abs,4), op(Inc,Abs,6), op(Xxx,Abs,6),
        op(Beq,Rel,2), op(Sbc,Izy,5), op(Xxx,Imp,2), op(Xxx,Izy,8), op(Xxx,Zpx,4), op(Sbc,Zpx,4), op(Inc,Zpx,6), op(Xxx,Zpx,6),
        op(Sed,Imp,2), op(Sbc,Aby,4), op(Xxx,Imp,2), op(Xxx,Aby,7), op(Xxx,Abx,4), op(Sbc,Abx,4), op(Inc,Abx,7), op(Xxx,Abx,7),
    ]
};

/// 6502 interpreter state.
#[derive(Debug, Clone)]
pub struct Cpu {
    /// Program counter
    pub pc: u16,
    /// Stack pointer: low 8 bits of the next free stack slot
    pub sp: u8,
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Processor status flags
    pub status: Status,

    // Internal working state
    cycles: u8,
    opcode: u8,
    addr_abs: u16,
    addr_rel: u16,
    fetched: u8,
    implied: bool,
    cycle_count: u64,
    nmi_pending: bool,
    irq_pending: bool,
    illegal_logged: [u64; 4],
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            pc: 0,
            sp: 0xFD,
            a: 0,
            x: 0,
            y: 0,
            status: Status::UNUSED | Status::INTERRUPT,
            cycles: 0,
            opcode: 0,
            addr_abs: 0,
            addr_rel: 0,
            fetched: 0,
            implied: false,
            cycle_count: 0,
            nmi_pending: false,
            irq_pending: false,
            illegal_logged: [0; 4],
        }
    }

    /// Reset: clear registers, load PC from the reset vector, spend 7 cycles.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFD;
        self.status = Status::UNUSED | Status::INTERRUPT;
        self.pc = self.read_word(bus, RESET_VECTOR);

        self.addr_abs = 0;
        self.addr_rel = 0;
        self.fetched = 0;
        self.implied = false;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.cycle_count = 0;
        self.cycles = 7;
    }

    /// Raise the non-maskable interrupt edge. Sampled at the next
    /// instruction boundary.
    pub fn nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Raise a maskable interrupt request. Honoured at the next boundary
    /// when the interrupt-disable flag is clear.
    pub fn irq(&mut self) {
        self.irq_pending = true;
    }

    /// True at an instruction boundary.
    pub fn complete(&self) -> bool {
        self.cycles == 0
    }

    /// Total cycles executed since reset.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Opcode of the most recently fetched instruction.
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Force the program counter, bypassing the reset vector. Used by the
    /// nestest automation entry point.
    pub fn force_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    /// Advance one CPU cycle. At a boundary this executes one complete
    /// instruction (or services a pending interrupt) and reloads the
    /// countdown; other cycles only burn time.
    pub fn tick(&mut self, bus: &mut impl Bus) {
        if self.cycles == 0 {
            if self.nmi_pending {
                self.nmi_pending = false;
                self.interrupt(bus, NMI_VECTOR);
            } else if self.irq_pending && !self.status.contains(Status::INTERRUPT) {
                self.irq_pending = false;
                self.interrupt(bus, IRQ_VECTOR);
            } else {
                self.opcode = bus.read(self.pc);
                let inst = OPCODE_TABLE[self.opcode as usize];
                self.pc = self.pc.wrapping_add(1);
                self.cycles = inst.cycles;

                let extra_addr = self.resolve_operand(bus, inst.mode);
                let extra_op = self.execute(bus, inst.mnemonic);
                self.cycles += extra_addr & extra_op;
            }
        }

        self.cycle_count += 1;
        self.cycles -= 1;
    }

    /// Burn one cycle with the core halted; used while OAM DMA owns the bus.
    pub fn stall_tick(&mut self) {
        self.cycle_count += 1;
    }

    /// Format the nestest-style trace line for the instruction about to
    /// execute. Valid at an instruction boundary.
    pub fn trace_line(&self, bus: &impl Bus) -> String {
        let opcode = bus.peek(self.pc);
        let inst = OPCODE_TABLE[opcode as usize];
        format!(
            "{:04X}  {:02X} - {}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc,
            opcode,
            inst.mnemonic,
            self.a,
            self.x,
            self.y,
            self.status.bits(),
            self.sp,
            self.cycle_count
        )
    }

    fn read_word(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let lo = bus.read(addr) as u16;
        let hi = bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    fn push(&mut self, bus: &mut impl Bus, data: u8) {
        bus.write(STACK_BASE | self.sp as u16, data);
        self.sp = self.sp.wrapping_sub(1);
    }

    fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(STACK_BASE | self.sp as u16)
    }

    /// Hardware interrupt entry: push PC and status, disable interrupts,
    /// load the vector. Seven cycles.
    fn interrupt(&mut self, bus: &mut impl Bus, vector: u16) {
        self.push(bus, (self.pc >> 8) as u8);
        self.push(bus, self.pc as u8);
        let pushed = (self.status | Status::UNUSED) - Status::BREAK;
        self.push(bus, pushed.bits());
        self.status.insert(Status::INTERRUPT);
        self.pc = self.read_word(bus, vector);
        self.cycles = 7;
    }

    /// Compute the effective address (and operand, where the mode implies
    /// one) for the current instruction. Returns 1 when an indexed mode
    /// crossed a page and the instruction may pay for it.
    fn resolve_operand(&mut self, bus: &mut impl Bus, mode: AddrMode) -> u8 {
        self.implied = false;
        match mode {
            AddrMode::Imp => {
                self.implied = true;
                self.fetched = self.a;
                0
            }
            AddrMode::Imm => {
                self.addr_abs = self.pc;
                self.pc = self.pc.wrapping_add(1);
                0
            }
            AddrMode::Zp0 => {
                self.addr_abs = bus.read(self.pc) as u16;
                self.pc = self.pc.wrapping_add(1);
                0
            }
            AddrMode::Zpx => {
                self.addr_abs = bus.read(self.pc).wrapping_add(self.x) as u16;
                self.pc = self.pc.wrapping_add(1);
                0
            }
            AddrMode::Zpy => {
                self.addr_abs = bus.read(self.pc).wrapping_add(self.y) as u16;
                self.pc = self.pc.wrapping_add(1);
                0
            }
            AddrMode::Rel => {
                // Sign-extend the displacement so the later add wraps right.
                self.addr_rel = bus.read(self.pc) as i8 as i16 as u16;
                self.pc = self.pc.wrapping_add(1);
                0
            }
            AddrMode::Abs => {
                self.addr_abs = self.read_word(bus, self.pc);
                self.pc = self.pc.wrapping_add(2);
                0
            }
            AddrMode::Abx => {
                let base = self.read_word(bus, self.pc);
                self.pc = self.pc.wrapping_add(2);
                self.addr_abs = base.wrapping_add(self.x as u16);
                (self.addr_abs & 0xFF00 != base & 0xFF00) as u8
            }
            AddrMode::Aby => {
                let base = self.read_word(bus, self.pc);
                self.pc = self.pc.wrapping_add(2);
                self.addr_abs = base.wrapping_add(self.y as u16);
                (self.addr_abs & 0xFF00 != base & 0xFF00) as u8
            }
            AddrMode::Ind => {
                let ptr = self.read_word(bus, self.pc);
                self.pc = self.pc.wrapping_add(2);
                let lo = bus.read(ptr) as u16;
                // Hardware bug: the high byte read wraps within the page
                // when the pointer sits at a page boundary.
                let hi_addr = if ptr & 0x00FF == 0x00FF {
                    ptr & 0xFF00
                } else {
                    ptr.wrapping_add(1)
                };
                let hi = bus.read(hi_addr) as u16;
                self.addr_abs = (hi << 8) | lo;
                0
            }
            AddrMode::Izx => {
                let base = bus.read(self.pc).wrapping_add(self.x);
                self.pc = self.pc.wrapping_add(1);
                let lo = bus.read(base as u16) as u16;
                let hi = bus.read(base.wrapping_add(1) as u16) as u16;
                self.addr_abs = (hi << 8) | lo;
                0
            }
            AddrMode::Izy => {
                let zp = bus.read(self.pc);
                self.pc = self.pc.wrapping_add(1);
                let lo = bus.read(zp as u16) as u16;
                let hi = bus.read(zp.wrapping_add(1) as u16) as u16;
                let base = (hi << 8) | lo;
                self.addr_abs = base.wrapping_add(self.y as u16);
                (self.addr_abs & 0xFF00 != base & 0xFF00) as u8
            }
        }
    }

    /// Read the operand for the current instruction. Implied mode already
    /// routed the accumulator into the data latch.
    fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        if !self.implied {
            self.fetched = bus.read(self.addr_abs);
        }
        self.fetched
    }

    fn set_zn(&mut self, value: u8) {
        self.status.set(Status::ZERO, value == 0);
        self.status.set(Status::NEGATIVE, value & 0x80 != 0);
    }

    /// Conditional branch: one extra cycle when taken, another when the
    /// target sits on a different page.
    fn branch(&mut self, taken: bool) {
        if taken {
            self.cycles += 1;
            self.addr_abs = self.pc.wrapping_add(self.addr_rel);
            if self.addr_abs & 0xFF00 != self.pc & 0xFF00 {
                self.cycles += 1;
            }
            self.pc = self.addr_abs;
        }
    }

    /// ADC core, shared with SBC via operand inversion.
    fn add_with_carry(&mut self, value: u8) {
        let sum = self.a as u16 + value as u16 + self.status.contains(Status::CARRY) as u16;
        let result = sum as u8;
        self.status.set(Status::CARRY, sum > 0xFF);
        self.status
            .set(Status::OVERFLOW, (self.a ^ result) & (value ^ result) & 0x80 != 0);
        self.a = result;
        self.set_zn(self.a);
    }

    fn compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.status.set(Status::CARRY, register >= value);
        self.set_zn(result);
    }

    /// Write back a read-modify-write result to the accumulator or memory
    /// depending on the addressing mode.
    fn store_rmw(&mut self, bus: &mut impl Bus, value: u8) {
        if self.implied {
            self.a = value;
        } else {
            bus.write(self.addr_abs, value);
        }
    }

    fn log_illegal_once(&mut self) {
        let idx = (self.opcode / 64) as usize;
        let bit = 1u64 << (self.opcode % 64);
        if self.illegal_logged[idx] & bit == 0 {
            self.illegal_logged[idx] |= bit;
            warn!(
                "illegal opcode {:02X} at {:04X}, executing as NOP",
                self.opcode,
                self.pc.wrapping_sub(1)
            );
        }
    }

    /// Execute the decoded instruction. Returns 1 when the instruction
    /// pays the page-cross penalty its addressing mode may have reported.
    fn execute(&mut self, bus: &mut impl Bus, mnemonic: Mnemonic) -> u8 {
        match mnemonic {
            Mnemonic::Adc => {
                let value = self.fetch(bus);
                self.add_with_carry(value);
                1
            }
            Mnemonic::Sbc => {
                // Subtraction is addition of the one's complement.
                let value = self.fetch(bus) ^ 0xFF;
                self.add_with_carry(value);
                1
            }
            Mnemonic::And => {
                self.a &= self.fetch(bus);
                self.set_zn(self.a);
                1
            }
            Mnemonic::Ora => {
                self.a |= self.fetch(bus);
                self.set_zn(self.a);
                1
            }
            Mnemonic::Eor => {
                self.a ^= self.fetch(bus);
                self.set_zn(self.a);
                1
            }
            Mnemonic::Asl => {
                let value = self.fetch(bus);
                self.status.set(Status::CARRY, value & 0x80 != 0);
                let result = value << 1;
                self.set_zn(result);
                self.store_rmw(bus, result);
                0
            }
            Mnemonic::Lsr => {
                let value = self.fetch(bus);
                self.status.set(Status::CARRY, value & 0x01 != 0);
                let result = value >> 1;
                self.set_zn(result);
                self.store_rmw(bus, result);
                0
            }
            Mnemonic::Rol => {
                let value = self.fetch(bus);
                let carry_in = self.status.contains(Status::CARRY) as u8;
                self.status.set(Status::CARRY, value & 0x80 != 0);
                let result = (value << 1) | carry_in;
                self.set_zn(result);
                self.store_rmw(bus, result);
                0
            }
            Mnemonic::Ror => {
                let value = self.fetch(bus);
                let carry_in = self.status.contains(Status::CARRY) as u8;
                self.status.set(Status::CARRY, value & 0x01 != 0);
                let result = (value >> 1) | (carry_in << 7);
                self.set_zn(result);
                self.store_rmw(bus, result);
                0
            }
            Mnemonic::Lda => {
                self.a = self.fetch(bus);
                self.set_zn(self.a);
                1
            }
            Mnemonic::Ldx => {
                self.x = self.fetch(bus);
                self.set_zn(self.x);
                1
            }
            Mnemonic::Ldy => {
                self.y = self.fetch(bus);
                self.set_zn(self.y);
                1
            }
            Mnemonic::Sta => {
                bus.write(self.addr_abs, self.a);
                0
            }
            Mnemonic::Stx => {
                bus.write(self.addr_abs, self.x);
                0
            }
            Mnemonic::Sty => {
                bus.write(self.addr_abs, self.y);
                0
            }
            Mnemonic::Inc => {
                let result = self.fetch(bus).wrapping_add(1);
                bus.write(self.addr_abs, result);
                self.set_zn(result);
                0
            }
            Mnemonic::Dec => {
                let result = self.fetch(bus).wrapping_sub(1);
                bus.write(self.addr_abs, result);
                self.set_zn(result);
                0
            }
            Mnemonic::Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
                0
            }
            Mnemonic::Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
                0
            }
            Mnemonic::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
                0
            }
            Mnemonic::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
                0
            }
            Mnemonic::Cmp => {
                let value = self.fetch(bus);
                self.compare(self.a, value);
                1
            }
            Mnemonic::Cpx => {
                let value = self.fetch(bus);
                self.compare(self.x, value);
                0
            }
            Mnemonic::Cpy => {
                let value = self.fetch(bus);
                self.compare(self.y, value);
                0
            }
            Mnemonic::Bit => {
                let value = self.fetch(bus);
                self.status.set(Status::ZERO, self.a & value == 0);
                self.status.set(Status::NEGATIVE, value & 0x80 != 0);
                self.status.set(Status::OVERFLOW, value & 0x40 != 0);
                0
            }
            Mnemonic::Bcc => {
                self.branch(!self.status.contains(Status::CARRY));
                0
            }
            Mnemonic::Bcs => {
                self.branch(self.status.contains(Status::CARRY));
                0
            }
            Mnemonic::Beq => {
                self.branch(self.status.contains(Status::ZERO));
                0
            }
            Mnemonic::Bne => {
                self.branch(!self.status.contains(Status::ZERO));
                0
            }
            Mnemonic::Bmi => {
                self.branch(self.status.contains(Status::NEGATIVE));
                0
            }
            Mnemonic::Bpl => {
                self.branch(!self.status.contains(Status::NEGATIVE));
                0
            }
            Mnemonic::Bvc => {
                self.branch(!self.status.contains(Status::OVERFLOW));
                0
            }
            Mnemonic::Bvs => {
                self.branch(self.status.contains(Status::OVERFLOW));
                0
            }
            Mnemonic::Jmp => {
                self.pc = self.addr_abs;
                0
            }
            Mnemonic::Jsr => {
                // Push the address of the last byte of this instruction.
                let ret = self.pc.wrapping_sub(1);
                self.push(bus, (ret >> 8) as u8);
                self.push(bus, ret as u8);
                self.pc = self.addr_abs;
                0
            }
            Mnemonic::Rts => {
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.pc = ((hi << 8) | lo).wrapping_add(1);
                0
            }
            Mnemonic::Brk => {
                // BRK skips a padding byte before the pushed return address.
                self.pc = self.pc.wrapping_add(1);
                self.push(bus, (self.pc >> 8) as u8);
                self.push(bus, self.pc as u8);
                self.push(bus, (self.status | Status::BREAK | Status::UNUSED).bits());
                self.status.insert(Status::INTERRUPT);
                self.pc = self.read_word(bus, IRQ_VECTOR);
                0
            }
            Mnemonic::Rti => {
                let pulled = self.pull(bus);
                self.status = Status::from_bits_truncate(pulled);
                self.status.remove(Status::BREAK);
                self.status.insert(Status::UNUSED);
                let lo = self.pull(bus) as u16;
                let hi = self.pull(bus) as u16;
                self.pc = (hi << 8) | lo;
                0
            }
            Mnemonic::Pha => {
                self.push(bus, self.a);
                0
            }
            Mnemonic::Pla => {
                self.a = self.pull(bus);
                self.set_zn(self.a);
                0
            }
            Mnemonic::Php => {
                self.push(bus, (self.status | Status::BREAK | Status::UNUSED).bits());
                0
            }
            Mnemonic::Plp => {
                let pulled = self.pull(bus);
                self.status = Status::from_bits_truncate(pulled);
                self.status.remove(Status::BREAK);
                self.status.insert(Status::UNUSED);
                0
            }
            Mnemonic::Tax => {
                self.x = self.a;
                self.set_zn(self.x);
                0
            }
            Mnemonic::Tay => {
                self.y = self.a;
                self.set_zn(self.y);
                0
            }
            Mnemonic::Tsx => {
                self.x = self.sp;
                self.set_zn(self.x);
                0
            }
            Mnemonic::Txa => {
                self.a = self.x;
                self.set_zn(self.a);
                0
            }
            Mnemonic::Tya => {
                self.a = self.y;
                self.set_zn(self.a);
                0
            }
            Mnemonic::Txs => {
                self.sp = self.x;
                0
            }
            Mnemonic::Clc => {
                self.status.remove(Status::CARRY);
                0
            }
            Mnemonic::Sec => {
                self.status.insert(Status::CARRY);
                0
            }
            Mnemonic::Cli => {
                self.status.remove(Status::INTERRUPT);
                0
            }
            Mnemonic::Sei => {
                self.status.insert(Status::INTERRUPT);
                0
            }
            Mnemonic::Cld => {
                self.status.remove(Status::DECIMAL);
                0
            }
            Mnemonic::Sed => {
                self.status.insert(Status::DECIMAL);
                0
            }
            Mnemonic::Clv => {
                self.status.remove(Status::OVERFLOW);
                0
            }
            Mnemonic::Nop => 1,
            Mnemonic::Xxx => {
                self.log_illegal_once();
                1
            }
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

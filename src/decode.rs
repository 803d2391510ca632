use std::fmt;

use crate::registers::Register;

/// The 4-bit operation code in bits [15:12].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::St,
        Opcode::Jsr,
        Opcode::And,
        Opcode::Ldr,
        Opcode::Str,
        Opcode::Rti,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Sti,
        Opcode::Jmp,
        Opcode::Res,
        Opcode::Lea,
        Opcode::Trap,
    ];

    #[inline]
    pub fn of(instr: u16) -> Opcode {
        Self::TABLE[(instr >> 12) as usize]
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Br => "BR",
            Opcode::Add => "ADD",
            Opcode::Ld => "LD",
            Opcode::St => "ST",
            Opcode::Jsr => "JSR",
            Opcode::And => "AND",
            Opcode::Ldr => "LDR",
            Opcode::Str => "STR",
            Opcode::Rti => "RTI",
            Opcode::Not => "NOT",
            Opcode::Ldi => "LDI",
            Opcode::Sti => "STI",
            Opcode::Jmp => "JMP",
            Opcode::Res => "RES",
            Opcode::Lea => "LEA",
            Opcode::Trap => "TRAP",
        };
        f.write_str(name)
    }
}

/// Second operand of `ADD` and `AND`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    Reg(Register),
    /// Sign-extended imm5.
    Imm(u16),
}

/// A decoded instruction word.
///
/// Every offset and immediate is already sign-extended to 16 bits, so executing one is a
/// matter of `wrapping_add`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instr {
    /// Branch by `offset9` if any of the `nzp` bits match the condition code
    Br { nzp: u16, offset9: u16 },
    Add { dr: Register, sr1: Register, op2: Operand },
    Ld { dr: Register, offset9: u16 },
    St { sr: Register, offset9: u16 },
    /// PC-relative subroutine call
    Jsr { offset11: u16 },
    /// Subroutine call through a base register
    Jsrr { base: Register },
    And { dr: Register, sr1: Register, op2: Operand },
    Ldr { dr: Register, base: Register, offset6: u16 },
    Str { sr: Register, base: Register, offset6: u16 },
    Rti,
    Not { dr: Register, sr: Register },
    Ldi { dr: Register, offset9: u16 },
    Sti { sr: Register, offset9: u16 },
    /// `RET` is `JMP R7`
    Jmp { base: Register },
    Res,
    Lea { dr: Register, offset9: u16 },
    Trap { vect: u8 },
}

/// Sign extend the low `bits` bits of `val` to a full word.
///
/// Bits above the field are ignored, so a raw instruction word can be passed directly.
#[inline]
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < 16);
    let field = val & ((1u16 << bits) - 1);
    if field & (1u16 << (bits - 1)) != 0 {
        // Negative: fill everything from the sign bit up
        field | (u16::MAX << bits)
    } else {
        field
    }
}

/// Split an instruction word into its opcode and operand fields.
pub fn decode(instr: u16) -> Instr {
    let dr = Register::from_field(instr, 9);
    let sr1 = Register::from_field(instr, 6);
    let op2 = || {
        if instr & 0b10_0000 == 0 {
            Operand::Reg(Register::from_field(instr, 0))
        } else {
            Operand::Imm(sign_extend(instr, 5))
        }
    };
    let offset9 = sign_extend(instr, 9);

    match Opcode::of(instr) {
        Opcode::Br => Instr::Br {
            nzp: (instr >> 9) & 0b111,
            offset9,
        },
        Opcode::Add => Instr::Add { dr, sr1, op2: op2() },
        Opcode::Ld => Instr::Ld { dr, offset9 },
        Opcode::St => Instr::St { sr: dr, offset9 },
        Opcode::Jsr => {
            if instr & 0x0800 != 0 {
                Instr::Jsr {
                    offset11: sign_extend(instr, 11),
                }
            } else {
                Instr::Jsrr { base: sr1 }
            }
        }
        Opcode::And => Instr::And { dr, sr1, op2: op2() },
        Opcode::Ldr => Instr::Ldr {
            dr,
            base: sr1,
            offset6: sign_extend(instr, 6),
        },
        Opcode::Str => Instr::Str {
            sr: dr,
            base: sr1,
            offset6: sign_extend(instr, 6),
        },
        Opcode::Rti => Instr::Rti,
        Opcode::Not => Instr::Not { dr, sr: sr1 },
        Opcode::Ldi => Instr::Ldi { dr, offset9 },
        Opcode::Sti => Instr::Sti { sr: dr, offset9 },
        Opcode::Jmp => Instr::Jmp { base: sr1 },
        Opcode::Res => Instr::Res,
        Opcode::Lea => Instr::Lea { dr, offset9 },
        Opcode::Trap => Instr::Trap {
            vect: (instr & 0xFF) as u8,
        },
    }
}

impl Instr {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instr::Br { .. } => Opcode::Br,
            Instr::Add { .. } => Opcode::Add,
            Instr::Ld { .. } => Opcode::Ld,
            Instr::St { .. } => Opcode::St,
            Instr::Jsr { .. } | Instr::Jsrr { .. } => Opcode::Jsr,
            Instr::And { .. } => Opcode::And,
            Instr::Ldr { .. } => Opcode::Ldr,
            Instr::Str { .. } => Opcode::Str,
            Instr::Rti => Opcode::Rti,
            Instr::Not { .. } => Opcode::Not,
            Instr::Ldi { .. } => Opcode::Ldi,
            Instr::Sti { .. } => Opcode::Sti,
            Instr::Jmp { .. } => Opcode::Jmp,
            Instr::Res => Opcode::Res,
            Instr::Lea { .. } => Opcode::Lea,
            Instr::Trap { .. } => Opcode::Trap,
        }
    }

    /// Assemble back into an instruction word. Out-of-range offsets are truncated to
    /// their field width.
    pub fn encode(&self) -> u16 {
        let op = (self.opcode() as u16) << 12;
        let r = |reg: Register, shift: u32| (reg as u16) << shift;
        let op2 = |operand: &Operand| match *operand {
            Operand::Reg(sr2) => r(sr2, 0),
            Operand::Imm(imm5) => 0b10_0000 | (imm5 & 0x1F),
        };
        let rest = match self {
            Instr::Br { nzp, offset9 } => ((nzp & 0b111) << 9) | (offset9 & 0x1FF),
            Instr::Add { dr, sr1, op2: o } | Instr::And { dr, sr1, op2: o } => {
                r(*dr, 9) | r(*sr1, 6) | op2(o)
            }
            Instr::Ld { dr, offset9 } | Instr::Ldi { dr, offset9 } | Instr::Lea { dr, offset9 } => {
                r(*dr, 9) | (offset9 & 0x1FF)
            }
            Instr::St { sr, offset9 } | Instr::Sti { sr, offset9 } => {
                r(*sr, 9) | (offset9 & 0x1FF)
            }
            Instr::Jsr { offset11 } => 0x0800 | (offset11 & 0x7FF),
            Instr::Jsrr { base } | Instr::Jmp { base } => r(*base, 6),
            Instr::Ldr { dr, base, offset6 } => r(*dr, 9) | r(*base, 6) | (offset6 & 0x3F),
            Instr::Str { sr, base, offset6 } => r(*sr, 9) | r(*base, 6) | (offset6 & 0x3F),
            // Unused bits are all ones
            Instr::Not { dr, sr } => r(*dr, 9) | r(*sr, 6) | 0x3F,
            Instr::Rti | Instr::Res => 0,
            Instr::Trap { vect } => *vect as u16,
        };
        op | rest
    }
}

/// Assembly-style rendering, e.g. `ADD R0, R1, #-3` or `TRAP x25`.
impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op2 = |operand: &Operand| match *operand {
            Operand::Reg(reg) => reg.to_string(),
            Operand::Imm(imm) => format!("#{}", imm as i16),
        };
        match self {
            Instr::Br { nzp, offset9 } => {
                if *nzp == 0 {
                    return write!(f, "NOP");
                }
                let mut cc = String::new();
                for (bit, ch) in [(0b100u16, 'n'), (0b010, 'z'), (0b001, 'p')] {
                    if *nzp & bit != 0 {
                        cc.push(ch);
                    }
                }
                write!(f, "BR{} #{}", cc, *offset9 as i16)
            }
            Instr::Add { dr, sr1, op2: o } => write!(f, "ADD {}, {}, {}", dr, sr1, op2(o)),
            Instr::And { dr, sr1, op2: o } => write!(f, "AND {}, {}, {}", dr, sr1, op2(o)),
            Instr::Ld { dr, offset9 } => write!(f, "LD {}, #{}", dr, *offset9 as i16),
            Instr::Ldi { dr, offset9 } => write!(f, "LDI {}, #{}", dr, *offset9 as i16),
            Instr::Lea { dr, offset9 } => write!(f, "LEA {}, #{}", dr, *offset9 as i16),
            Instr::St { sr, offset9 } => write!(f, "ST {}, #{}", sr, *offset9 as i16),
            Instr::Sti { sr, offset9 } => write!(f, "STI {}, #{}", sr, *offset9 as i16),
            Instr::Ldr { dr, base, offset6 } => {
                write!(f, "LDR {}, {}, #{}", dr, base, *offset6 as i16)
            }
            Instr::Str { sr, base, offset6 } => {
                write!(f, "STR {}, {}, #{}", sr, base, *offset6 as i16)
            }
            Instr::Jsr { offset11 } => write!(f, "JSR #{}", *offset11 as i16),
            Instr::Jsrr { base } => write!(f, "JSRR {}", base),
            Instr::Jmp { base: Register::R7 } => write!(f, "RET"),
            Instr::Jmp { base } => write!(f, "JMP {}", base),
            Instr::Not { dr, sr } => write!(f, "NOT {}, {}", dr, sr),
            Instr::Rti => write!(f, "RTI"),
            Instr::Res => write!(f, "RES"),
            Instr::Trap { vect } => write!(f, "TRAP x{:02X}", vect),
        }
    }
}

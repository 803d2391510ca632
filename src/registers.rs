use std::cmp::Ordering;
use std::fmt;

/// One of the eight general purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    /// Link register, written by `JSR`, `JSRR` and `TRAP`.
    R7,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::R0,
        Register::R1,
        Register::R2,
        Register::R3,
        Register::R4,
        Register::R5,
        Register::R6,
        Register::R7,
    ];

    /// Register named by the 3-bit field starting at bit `shift` of `instr`.
    #[inline]
    pub fn from_field(instr: u16, shift: u32) -> Register {
        Self::ALL[((instr >> shift) & 0b111) as usize]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u16> for Register {
    type Error = ();
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL.get(value as usize).copied().ok_or(())
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", *self as u8)
    }
}

/// Condition code, set from the result of the last register-writing instruction.
///
/// Discriminants match the `nzp` bit layout used by `BR`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flag {
    N = 0b100,
    Z = 0b010,
    P = 0b001,
}

impl Flag {
    pub fn from_value(val: u16) -> Flag {
        match (val as i16).cmp(&0) {
            Ordering::Less => Flag::N,
            Ordering::Equal => Flag::Z,
            Ordering::Greater => Flag::P,
        }
    }

    #[inline]
    pub fn bits(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flag::N => "NEGATIVE",
            Flag::Z => "ZERO",
            Flag::P => "POSITIVE",
        };
        f.write_str(name)
    }
}

/// Register file: 8x 16-bit registers, program counter and condition code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    reg: [u16; 8],
    pc: u16,
    flag: Flag,
}

impl Registers {
    pub fn new(pc: u16) -> Self {
        Registers {
            reg: [0; 8],
            pc,
            flag: Flag::Z,
        }
    }

    #[inline]
    pub fn get(&self, r: Register) -> u16 {
        self.reg[r.index()]
    }

    /// Writes a register without touching the condition code.
    ///
    /// Instructions that set the condition code go through [`Registers::set_with_flags`].
    #[inline]
    pub fn set(&mut self, r: Register, val: u16) {
        self.reg[r.index()] = val;
    }

    #[inline]
    pub fn set_with_flags(&mut self, r: Register, val: u16) {
        self.set(r, val);
        self.update_flags(r);
    }

    pub fn update_flags(&mut self, r: Register) {
        self.flag = Flag::from_value(self.get(r));
    }

    #[inline]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    #[inline]
    pub fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
    }

    #[inline]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn set_flag(&mut self, flag: Flag) {
        self.flag = flag;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Register, u16)> + '_ {
        Register::ALL.iter().map(|&r| (r, self.get(r)))
    }
}

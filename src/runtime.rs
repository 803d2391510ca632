use miette::Result;

use crate::console::Console;
use crate::decode::{decode, Instr, Operand};
use crate::error::VmError;
use crate::image::Image;
use crate::memory::Memory;
use crate::registers::{Flag, Register, Registers};

/// Conventional start of user programs.
pub const PC_START: u16 = 0x3000;

/// Instructions between calls to [`Console::check_interrupt`].
pub const INTERRUPT_INTERVAL: u64 = 0x1000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Running,
    Halted,
}

/// Represents complete program state during runtime.
///
/// The console is passed into each step rather than owned, so a state can be cloned,
/// inspected and reset freely.
#[derive(Clone, Debug)]
pub struct RunState {
    mem: Memory,
    regs: Registers,
    status: Status,
    /// Instructions executed since load or reset
    steps: u64,
    /// State at load time, restored by `reset`
    initial: Box<(Memory, Registers)>,
}

impl RunState {
    /// Fresh machine with zeroed memory and PC at `0x3000`.
    pub fn new() -> Self {
        Self::with_program(PC_START, &[])
    }

    /// Load `words` at `origin` and point PC at it.
    pub fn with_program(origin: u16, words: &[u16]) -> Self {
        let mut mem = Memory::new();
        mem.load_image(origin, words);
        let regs = Registers::new(origin);
        RunState {
            initial: Box::new((mem.clone(), regs.clone())),
            mem,
            regs,
            status: Status::Running,
            steps: 0,
        }
    }

    pub fn from_image(image: &Image) -> Self {
        Self::with_program(image.orig(), image.words())
    }

    /// Raw image words: origin followed by the program.
    pub fn from_raw(raw: &[u16]) -> Result<RunState> {
        Ok(Self::from_image(&Image::from_words(raw)?))
    }

    /// Restore memory and registers to how they were at load time.
    pub fn reset(&mut self) {
        let (mem, regs) = &*self.initial;
        self.mem = mem.clone();
        self.regs = regs.clone();
        self.status = Status::Running;
        self.steps = 0;
    }

    /// Run until `HALT` or a fatal error.
    pub fn run(&mut self, console: &mut impl Console) -> Result<(), VmError> {
        while self.step(console)? == Status::Running {}
        Ok(())
    }

    /// Run at most `limit` instructions. Returns [`Status::Running`] if the budget ran
    /// out first.
    pub fn run_for(&mut self, console: &mut impl Console, limit: u64) -> Result<Status, VmError> {
        for _ in 0..limit {
            if self.step(console)? == Status::Halted {
                break;
            }
        }
        Ok(self.status)
    }

    /// Fetch, decode and execute a single instruction.
    ///
    /// A halted machine stays halted. A fatal error halts the machine before it is returned.
    pub fn step(&mut self, console: &mut impl Console) -> Result<Status, VmError> {
        if self.status == Status::Halted {
            return Ok(Status::Halted);
        }
        let pc = self.regs.pc();
        let result = self.fetch_execute(pc, console);
        if result.is_err() {
            self.status = Status::Halted;
        }
        result.map(|_| self.status)
    }

    fn fetch_execute(&mut self, pc: u16, console: &mut impl Console) -> Result<(), VmError> {
        if self.steps % INTERRUPT_INTERVAL == 0 {
            console.check_interrupt()?;
        }
        let instr = self.mem.read(pc, console)?;
        // PC incremented before instruction is performed
        self.regs.set_pc(pc.wrapping_add(1));
        self.steps += 1;

        match decode(instr) {
            Instr::Br { nzp, offset9 } => self.br(nzp, offset9),
            Instr::Add { dr, sr1, op2 } => self.add(dr, sr1, op2),
            Instr::Ld { dr, offset9 } => self.ld(dr, offset9, console)?,
            Instr::St { sr, offset9 } => self.st(sr, offset9),
            Instr::Jsr { offset11 } => self.jsr(offset11),
            Instr::Jsrr { base } => self.jsrr(base),
            Instr::And { dr, sr1, op2 } => self.and(dr, sr1, op2),
            Instr::Ldr { dr, base, offset6 } => self.ldr(dr, base, offset6, console)?,
            Instr::Str { sr, base, offset6 } => self.str(sr, base, offset6),
            Instr::Not { dr, sr } => self.not(dr, sr),
            Instr::Ldi { dr, offset9 } => self.ldi(dr, offset9, console)?,
            Instr::Sti { sr, offset9 } => self.sti(sr, offset9, console)?,
            Instr::Jmp { base } => self.jmp(base),
            Instr::Lea { dr, offset9 } => self.lea(dr, offset9),
            Instr::Trap { vect } => self.trap(vect, pc, console)?,
            reserved @ (Instr::Rti | Instr::Res) => {
                return Err(VmError::Reserved {
                    opcode: reserved.opcode(),
                    instr,
                    pc,
                })
            }
        }
        Ok(())
    }

    #[inline]
    fn operand(&self, op2: Operand) -> u16 {
        match op2 {
            Operand::Reg(sr2) => self.regs.get(sr2),
            Operand::Imm(imm5) => imm5,
        }
    }

    #[inline]
    fn pc_relative(&self, offset: u16) -> u16 {
        self.regs.pc().wrapping_add(offset)
    }

    fn add(&mut self, dr: Register, sr1: Register, op2: Operand) {
        let res = self.regs.get(sr1).wrapping_add(self.operand(op2));
        self.regs.set_with_flags(dr, res);
    }

    fn and(&mut self, dr: Register, sr1: Register, op2: Operand) {
        let res = self.regs.get(sr1) & self.operand(op2);
        self.regs.set_with_flags(dr, res);
    }

    fn not(&mut self, dr: Register, sr: Register) {
        let res = !self.regs.get(sr);
        self.regs.set_with_flags(dr, res);
    }

    fn br(&mut self, nzp: u16, offset9: u16) {
        if self.regs.flag().bits() & nzp != 0 {
            self.regs.set_pc(self.pc_relative(offset9));
        }
    }

    fn jmp(&mut self, base: Register) {
        self.regs.set_pc(self.regs.get(base));
    }

    fn jsr(&mut self, offset11: u16) {
        let target = self.pc_relative(offset11);
        self.regs.set(Register::R7, self.regs.pc());
        self.regs.set_pc(target);
    }

    fn jsrr(&mut self, base: Register) {
        // Read base first, `JSRR R7` jumps to the old R7
        let target = self.regs.get(base);
        self.regs.set(Register::R7, self.regs.pc());
        self.regs.set_pc(target);
    }

    fn ld(&mut self, dr: Register, offset9: u16, console: &mut impl Console) -> Result<(), VmError> {
        let val = self.mem.read(self.pc_relative(offset9), console)?;
        self.regs.set_with_flags(dr, val);
        Ok(())
    }

    fn ldi(&mut self, dr: Register, offset9: u16, console: &mut impl Console) -> Result<(), VmError> {
        let ptr = self.mem.read(self.pc_relative(offset9), console)?;
        let val = self.mem.read(ptr, console)?;
        self.regs.set_with_flags(dr, val);
        Ok(())
    }

    fn ldr(
        &mut self,
        dr: Register,
        base: Register,
        offset6: u16,
        console: &mut impl Console,
    ) -> Result<(), VmError> {
        let addr = self.regs.get(base).wrapping_add(offset6);
        let val = self.mem.read(addr, console)?;
        self.regs.set_with_flags(dr, val);
        Ok(())
    }

    fn lea(&mut self, dr: Register, offset9: u16) {
        let val = self.pc_relative(offset9);
        self.regs.set_with_flags(dr, val);
    }

    fn st(&mut self, sr: Register, offset9: u16) {
        self.mem.write(self.pc_relative(offset9), self.regs.get(sr));
    }

    fn sti(&mut self, sr: Register, offset9: u16, console: &mut impl Console) -> Result<(), VmError> {
        let ptr = self.mem.read(self.pc_relative(offset9), console)?;
        self.mem.write(ptr, self.regs.get(sr));
        Ok(())
    }

    fn str(&mut self, sr: Register, base: Register, offset6: u16) {
        let addr = self.regs.get(base).wrapping_add(offset6);
        self.mem.write(addr, self.regs.get(sr));
    }

    pub(crate) fn halt(&mut self) {
        self.status = Status::Halted;
    }

    pub(crate) fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub(crate) fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn pc(&self) -> u16 {
        self.regs.pc()
    }

    pub fn reg(&self, r: Register) -> u16 {
        self.regs.get(r)
    }

    pub fn flag(&self) -> Flag {
        self.regs.flag()
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Memory cell as stored, without device side effects.
    pub fn peek(&self, addr: u16) -> u16 {
        self.mem.peek(addr)
    }

    pub fn set_reg(&mut self, r: Register, val: u16) {
        self.regs.set(r, val);
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.regs.set_pc(pc);
    }

    pub fn poke(&mut self, addr: u16, val: u16) {
        self.mem.write(addr, val);
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

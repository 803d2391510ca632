use crate::console::Console;
use crate::error::VmError;
use crate::memory::MEMORY_MAX;
use crate::registers::Register;
use crate::runtime::RunState;

/// System routines reachable through `TRAP`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrapVect {
    /// Read one key into R0, no echo
    Getc = 0x20,
    /// Write the low byte of R0
    Out = 0x21,
    /// Write the zero-terminated string at R0, one character per word
    Puts = 0x22,
    /// Prompt, then read and echo one key into R0
    In = 0x23,
    /// Write the zero-terminated string at R0, two characters per word
    Putsp = 0x24,
    Halt = 0x25,
}

impl TryFrom<u8> for TrapVect {
    type Error = ();
    fn try_from(vect: u8) -> Result<Self, Self::Error> {
        Ok(match vect {
            0x20 => TrapVect::Getc,
            0x21 => TrapVect::Out,
            0x22 => TrapVect::Puts,
            0x23 => TrapVect::In,
            0x24 => TrapVect::Putsp,
            0x25 => TrapVect::Halt,
            _ => return Err(()),
        })
    }
}

pub const IN_PROMPT: &str = "Enter a character: ";

impl RunState {
    /// `pc` is the address of the `TRAP` instruction itself, for error reporting.
    pub(crate) fn trap(
        &mut self,
        vect: u8,
        pc: u16,
        console: &mut impl Console,
    ) -> Result<(), VmError> {
        let Ok(routine) = TrapVect::try_from(vect) else {
            return Err(VmError::UnknownTrap { vector: vect, pc });
        };
        // Return address for the routine, PC is already past the `TRAP`
        let ret = self.pc();
        self.regs_mut().set(Register::R7, ret);

        match routine {
            TrapVect::Getc => {
                let key = self.mem_mut().await_key(console)?;
                self.regs_mut().set(Register::R0, key);
            }
            TrapVect::Out => {
                console.write_char(self.reg(Register::R0) as u8)?;
                console.flush()?;
            }
            TrapVect::Puts => {
                self.for_each_word(Register::R0, console, |word, console| {
                    console.write_char(word as u8)
                })?;
                console.flush()?;
            }
            TrapVect::In => {
                console.write_str(IN_PROMPT)?;
                console.flush()?;
                let key = self.mem_mut().await_key(console)?;
                console.write_char(key as u8)?;
                console.flush()?;
                self.regs_mut().set(Register::R0, key);
            }
            TrapVect::Putsp => {
                self.for_each_word(Register::R0, console, |word, console| {
                    console.write_char((word & 0xFF) as u8)?;
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        console.write_char(high)?;
                    }
                    Ok(())
                })?;
                console.flush()?;
            }
            TrapVect::Halt => {
                console.halted()?;
                self.halt();
            }
        }
        Ok(())
    }

    /// Visit words from the address in `start` up to, not including, the first zero word.
    ///
    /// Stops after one lap of memory if no terminator is found.
    fn for_each_word<C, F>(
        &mut self,
        start: Register,
        console: &mut C,
        mut func: F,
    ) -> Result<(), VmError>
    where
        C: Console,
        F: FnMut(u16, &mut C) -> std::io::Result<()>,
    {
        let mut addr = self.reg(start);
        for _ in 0..MEMORY_MAX {
            let word = self.mem_mut().read(addr, console)?;
            if word == 0 {
                break;
            }
            func(word, console)?;
            addr = addr.wrapping_add(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;
    use crate::registers::Flag;
    use crate::runtime::Status;
    use Register::*;

    const HALT: u16 = 0xF025;

    fn run(program: &[u16], input: &str) -> (RunState, ScriptedConsole) {
        let mut state = RunState::with_program(0x3000, program);
        let mut console = ScriptedConsole::with_input(input);
        state.run(&mut console).unwrap();
        (state, console)
    }

    fn chars(string: &str) -> Vec<u16> {
        string.bytes().map(u16::from).chain([0]).collect()
    }

    #[test]
    fn puts_stops_at_zero() {
        // LEA R0, #2 ; PUTS ; HALT ; "Hi!"
        let mut program = vec![0xE002, 0xF022, HALT];
        program.extend(chars("Hi!"));
        let (state, console) = run(&program, "");
        assert_eq!(console.output_str(), "Hi!\nHalted\n");
        assert_eq!(state.status(), Status::Halted);
    }

    #[test]
    fn puts_empty_string() {
        // LEA R0, #2 ; PUTS ; HALT ; ""
        let (_, console) = run(&[0xE002, 0xF022, HALT, 0x0000], "");
        assert_eq!(console.output_str(), "\nHalted\n");
    }

    #[test]
    fn putsp_low_byte_first() {
        // LEA R0, #2 ; PUTSP ; HALT ; "abc"
        let (_, console) = run(&[0xE002, 0xF024, HALT, 0x6261, 0x0063, 0x0000], "");
        assert_eq!(console.output_str(), "abc\nHalted\n");
    }

    #[test]
    fn putsp_odd_word_mid_string() {
        // LEA R0, #2 ; PUTSP ; HALT ; "ab" "c" "de"
        let (_, console) = run(&[0xE002, 0xF024, HALT, 0x6261, 0x0063, 0x6564, 0x0000], "");
        assert_eq!(console.output_str(), "abcde\nHalted\n");
    }

    #[test]
    fn getc_and_out() {
        // GETC ; OUT ; HALT
        let (state, console) = run(&[0xF020, 0xF021, HALT], "z");
        assert_eq!(state.reg(R0), b'z' as u16);
        assert_eq!(console.output_str(), "z\nHalted\n");
        assert_eq!(console.remaining(), 0);
    }

    #[test]
    fn in_prompts_and_echoes() {
        // IN ; HALT
        let (state, console) = run(&[0xF023, HALT], "k");
        assert_eq!(state.reg(R0), b'k' as u16);
        assert_eq!(console.output_str(), format!("{IN_PROMPT}k\nHalted\n"));
    }

    #[test]
    fn trap_links_and_keeps_flags() {
        // ADD R1, R1, #-1 ; OUT ; HALT
        let (state, _) = run(&[0x127F, 0xF021, HALT], "");
        assert_eq!(state.reg(R7), 0x3003);
        assert_eq!(state.flag(), Flag::N);
    }

    #[test]
    fn halt_stops_execution() {
        // HALT ; ADD R0, R0, #1
        let mut state = RunState::with_program(0x3000, &[HALT, 0x1021]);
        let mut console = ScriptedConsole::new();
        assert_eq!(state.run_for(&mut console, 10).unwrap(), Status::Halted);
        assert_eq!(state.steps(), 1);
        assert_eq!(state.step(&mut console).unwrap(), Status::Halted);
        assert_eq!(state.reg(R0), 0);
        assert_eq!(state.pc(), 0x3001);
    }

    #[test]
    fn unknown_vector_is_fatal() {
        let mut state = RunState::with_program(0x3000, &[0xF030]);
        let error = state.run(&mut ScriptedConsole::new()).unwrap_err();
        assert!(matches!(
            error,
            VmError::UnknownTrap {
                vector: 0x30,
                pc: 0x3000
            }
        ));
        assert_eq!(state.status(), Status::Halted);
    }

    #[test]
    fn getc_without_input_fails() {
        let mut state = RunState::with_program(0x3000, &[0xF020, HALT]);
        let error = state.run(&mut ScriptedConsole::new()).unwrap_err();
        assert!(matches!(error, VmError::Console(_)));
    }

    #[test]
    fn keyboard_polling_loop() {
        let program = [
            0xA203, // LDI R1, KBSR_PTR
            0x07FE, // BRzp #-2
            0xA002, // LDI R0, KBDR_PTR
            HALT,
            0xFE00, // KBSR_PTR
            0xFE02, // KBDR_PTR
        ];
        let (state, console) = run(&program, "m");
        assert_eq!(state.reg(R0), b'm' as u16);
        assert_eq!(console.remaining(), 0);
    }
}

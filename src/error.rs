use std::{error::Error, fmt, io};

use miette::Diagnostic;

use crate::decode::{decode, Opcode};

/// Fatal condition raised while executing a program.
///
/// Any of these stops the machine; the caller decides whether to start a fresh one.
#[derive(Debug)]
pub enum VmError {
    /// `RTI` or the reserved opcode was executed.
    Reserved { opcode: Opcode, instr: u16, pc: u16 },
    /// `TRAP` with a vector outside the system routine table.
    UnknownTrap { vector: u8, pc: u16 },
    /// The console collaborator failed, e.g. its input ran out.
    Console(io::Error),
}

impl VmError {
    /// Address of the faulting instruction, if the fault came from one.
    pub fn pc(&self) -> Option<u16> {
        match self {
            Self::Reserved { pc, .. } | Self::UnknownTrap { pc, .. } => Some(*pc),
            Self::Console(_) => None,
        }
    }
}

impl Error for VmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Console(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved { opcode, instr, pc } => write!(
                f,
                "Executed reserved opcode {} (0x{:04x}: {}) at address 0x{:04x}",
                opcode,
                instr,
                decode(*instr),
                pc
            ),
            Self::UnknownTrap { vector, pc } => write!(
                f,
                "Called a trap with an unknown vector x{:02X} at address 0x{:04x}",
                vector, pc
            ),
            Self::Console(error) => write!(f, "Console failed: {}", error),
        }
    }
}

impl Diagnostic for VmError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self {
            Self::Reserved { .. } => "run::reserved_opcode",
            Self::UnknownTrap { .. } => "run::unknown_trap",
            Self::Console(_) => "run::console",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self {
            Self::Reserved { .. } => {
                "RTI and opcode 0xD are not available to user programs; check for a runaway PC"
            }
            Self::UnknownTrap { .. } => {
                "available traps are GETC x20, OUT x21, PUTS x22, IN x23, PUTSP x24 and HALT x25"
            }
            Self::Console(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                "the program asked for a key after input was closed"
            }
            Self::Console(_) => return None,
        };
        Some(Box::new(help))
    }
}

impl From<io::Error> for VmError {
    fn from(error: io::Error) -> Self {
        Self::Console(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_context() {
        let error = VmError::Reserved {
            opcode: Opcode::Rti,
            instr: 0x8000,
            pc: 0x3004,
        };
        assert_eq!(
            error.to_string(),
            "Executed reserved opcode RTI (0x8000: RTI) at address 0x3004"
        );
        assert_eq!(error.pc(), Some(0x3004));
        assert_eq!(error.code().unwrap().to_string(), "run::reserved_opcode");

        let error = VmError::UnknownTrap {
            vector: 0x30,
            pc: 0x3000,
        };
        assert!(error.to_string().contains("x30"));
    }

    #[test]
    fn wraps_console_errors() {
        let error: VmError = io::Error::new(io::ErrorKind::UnexpectedEof, "eof").into();
        assert!(error.pc().is_none());
        assert!(error.source().is_some());
        assert!(error.help().is_some());
    }
}

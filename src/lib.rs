// Machine
mod decode;
pub use decode::{decode, sign_extend, Instr, Opcode, Operand};
mod memory;
pub use memory::{Memory, KBDR, KBSR, KBSR_READY, MEMORY_MAX};
mod registers;
pub use registers::{Flag, Register, Registers};

// Running
mod runtime;
pub use runtime::{RunState, Status, INTERRUPT_INTERVAL, PC_START};
mod trap;
pub use trap::{TrapVect, IN_PROMPT};
mod error;
pub use error::VmError;

// Collaborators
mod console;
pub use console::{Console, ScriptedConsole};
mod image;
pub use image::Image;
pub mod term;

pub mod env;
pub mod output;

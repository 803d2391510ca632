use std::collections::VecDeque;
use std::io;

/// Character device seen by the keyboard registers and the I/O traps.
///
/// Implementations deliver single, unechoed keystrokes. Terminal setup is the
/// implementation's concern, never the VM's.
pub trait Console {
    /// Whether a keystroke is waiting. Must not consume it.
    fn poll_key(&mut self) -> io::Result<bool>;

    /// Take the next keystroke, blocking until one is available.
    fn read_key(&mut self) -> io::Result<u8>;

    /// Called between instructions every so often, so a user interrupt is noticed even
    /// while the program never touches the keyboard. Fails to stop the machine.
    fn check_interrupt(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_char(&mut self, ch: u8) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn write_str(&mut self, string: &str) -> io::Result<()> {
        for byte in string.bytes() {
            self.write_char(byte)?;
        }
        Ok(())
    }

    /// Announce that the machine executed `HALT`.
    fn halted(&mut self) -> io::Result<()> {
        self.write_str("\nHalted\n")?;
        self.flush()
    }
}

/// In-memory console fed from a fixed keystroke script.
///
/// Reading past the end of the script fails with [`io::ErrorKind::UnexpectedEof`]
/// rather than blocking forever.
#[derive(Clone, Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    /// Keystrokes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for ScriptedConsole {
    fn poll_key(&mut self) -> io::Result<bool> {
        Ok(!self.input.is_empty())
    }

    fn read_key(&mut self) -> io::Result<u8> {
        self.input.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "keystroke script exhausted")
        })
    }

    fn write_char(&mut self, ch: u8) -> io::Result<()> {
        self.output.push(ch);
        Ok(())
    }
}

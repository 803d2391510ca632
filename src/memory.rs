use std::io;

use crate::console::Console;

/// LC3 can address 128KB of memory.
pub const MEMORY_MAX: usize = 0x10000;

/// Keyboard status register. Bit 15 is set while a keystroke is waiting.
pub const KBSR: u16 = 0xFE00;
/// Keyboard data register. Holds the most recent keystroke.
pub const KBDR: u16 = 0xFE02;

pub const KBSR_READY: u16 = 0x8000;

/// Flat word-addressed store with the keyboard registers mapped in.
#[derive(Clone)]
pub struct Memory {
    cells: Box<[u16; MEMORY_MAX]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            cells: Box::new([0; MEMORY_MAX]),
        }
    }

    /// Read a word as the running program sees it.
    ///
    /// `KBSR` reports whether `console` has a key waiting. `KBDR` polls first and, if a
    /// key is waiting, latches it before returning the latched value.
    pub fn read(&mut self, addr: u16, console: &mut impl Console) -> io::Result<u16> {
        match addr {
            KBSR => Ok(if console.poll_key()? { KBSR_READY } else { 0 }),
            KBDR => {
                if console.poll_key()? {
                    let key = console.read_key()?;
                    self.latch_key(key);
                }
                Ok(self.cells[KBDR as usize])
            }
            _ => Ok(self.cells[addr as usize]),
        }
    }

    /// Stores `val`. Writes to the keyboard registers are dropped.
    pub fn write(&mut self, addr: u16, val: u16) {
        if addr == KBSR || addr == KBDR {
            return;
        }
        self.cells[addr as usize] = val;
    }

    /// Read a cell without touching any device.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Block until a keystroke is available and return it, latched into `KBDR`.
    pub fn await_key(&mut self, console: &mut impl Console) -> io::Result<u16> {
        if self.read(KBSR, console)? & KBSR_READY != 0 {
            return self.read(KBDR, console);
        }
        let key = console.read_key()?;
        self.latch_key(key);
        Ok(key as u16)
    }

    fn latch_key(&mut self, key: u8) {
        self.cells[KBDR as usize] = key as u16;
    }

    /// Copy `words` into memory starting at `origin`, wrapping past `0xFFFF`.
    ///
    /// Device addresses are skipped like any other write.
    pub fn load_image(&mut self, origin: u16, words: &[u16]) {
        let mut addr = origin;
        for &word in words {
            self.write(addr, word);
            addr = addr.wrapping_add(1);
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.cells.iter().filter(|&&cell| cell != 0).count();
        f.debug_struct("Memory").field("nonzero_cells", &used).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;

    #[test]
    fn plain_cells() {
        let mut mem = Memory::new();
        let mut console = ScriptedConsole::new();
        assert_eq!(mem.read(0x3000, &mut console).unwrap(), 0);
        mem.write(0x3000, 0xBEEF);
        mem.write(0xFFFF, 0x0001);
        assert_eq!(mem.read(0x3000, &mut console).unwrap(), 0xBEEF);
        assert_eq!(mem.read(0xFFFF, &mut console).unwrap(), 0x0001);
    }

    #[test]
    fn keyboard_registers() {
        let mut mem = Memory::new();
        let mut console = ScriptedConsole::with_input("x");

        assert_eq!(mem.read(KBSR, &mut console).unwrap(), KBSR_READY);
        // Status reads never consume
        assert_eq!(mem.read(KBSR, &mut console).unwrap(), KBSR_READY);
        assert_eq!(mem.read(KBDR, &mut console).unwrap(), b'x' as u16);
        assert_eq!(mem.read(KBSR, &mut console).unwrap(), 0);
        // Latch keeps the last key once nothing is pending
        assert_eq!(mem.read(KBDR, &mut console).unwrap(), b'x' as u16);
        assert_eq!(console.remaining(), 0);
    }

    #[test]
    fn device_writes_ignored() {
        let mut mem = Memory::new();
        let mut console = ScriptedConsole::new();
        mem.write(KBSR, 0xFFFF);
        mem.write(KBDR, 0x0041);
        assert_eq!(mem.read(KBSR, &mut console).unwrap(), 0);
        assert_eq!(mem.peek(KBDR), 0);
    }

    #[test]
    fn await_key_blocks_on_console() {
        let mut mem = Memory::new();
        let mut console = ScriptedConsole::with_input("q");
        assert_eq!(mem.await_key(&mut console).unwrap(), b'q' as u16);
        assert_eq!(mem.peek(KBDR), b'q' as u16);
        assert!(mem.await_key(&mut console).is_err());
    }

    #[test]
    fn load_image_wraps() {
        let mut mem = Memory::new();
        mem.load_image(0x3000, &[1, 2, 3]);
        assert_eq!(
            (mem.peek(0x3000), mem.peek(0x3001), mem.peek(0x3002)),
            (1, 2, 3)
        );
        mem.load_image(0xFFFF, &[7, 8]);
        assert_eq!(mem.peek(0xFFFF), 7);
        assert_eq!(mem.peek(0x0000), 8);
    }
}

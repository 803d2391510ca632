use std::collections::VecDeque;
use std::io::{self, IsTerminal, Read, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use colored::Colorize;
use crossterm::{
    event::{self, Event, KeyEvent},
    terminal,
};

use crate::console::Console;

/// Console attached to the process's stdin and stdout.
///
/// An interactive stdin is put in raw mode for the lifetime of the value, so keystrokes
/// arrive one at a time and unechoed. Raw mode swallows the `Ctrl+C` signal, so the key is
/// looked for in [`Console::check_interrupt`] as well as on every read.
///
/// Piped stdin is drained by a reader thread, so polling never waits on the pipe.
pub struct Terminal {
    raw: bool,
    /// Bytes of a keystroke already taken from the terminal but not yet from the VM.
    /// Multi-byte characters are delivered one UTF-8 byte at a time.
    pending: VecDeque<u8>,
    /// `None` when stdin is interactive. Disconnected once stdin reaches EOF.
    piped: Option<Receiver<u8>>,
    minimal: bool,
}

impl Terminal {
    pub fn new(minimal: bool) -> io::Result<Self> {
        let raw = io::stdin().is_terminal();
        let piped = if raw {
            terminal::enable_raw_mode()?;
            None
        } else {
            Some(spawn_stdin_reader())
        };
        Ok(Terminal {
            raw,
            pending: VecDeque::new(),
            piped,
            minimal,
        })
    }

    fn read_event(&mut self) -> io::Result<()> {
        let event = event::read()?;
        if let Some(key) = Key::from_event(event) {
            key.encode(&mut self.pending)?;
        }
        Ok(())
    }

    /// Take every key event already queued by the terminal, without waiting.
    fn drain_events(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            self.read_event()?;
        }
        Ok(())
    }
}

/// Forward stdin to a channel, one byte per message. The sender is dropped on EOF.
fn spawn_stdin_reader() -> Receiver<u8> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut buffer = [0u8; 256];
        loop {
            let count = match stdin.read(&mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(count) => count,
            };
            for &byte in &buffer[..count] {
                if sender.send(byte).is_err() {
                    return;
                }
            }
        }
    });
    receiver
}

fn input_closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "standard input closed")
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}

impl Console for Terminal {
    fn poll_key(&mut self) -> io::Result<bool> {
        if !self.pending.is_empty() {
            return Ok(true);
        }
        match &self.piped {
            Some(receiver) => {
                if let Ok(byte) = receiver.try_recv() {
                    self.pending.push_back(byte);
                }
            }
            None => {
                while self.pending.is_empty() && event::poll(Duration::ZERO)? {
                    self.read_event()?;
                }
            }
        }
        Ok(!self.pending.is_empty())
    }

    fn read_key(&mut self) -> io::Result<u8> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(byte);
            }
            match &self.piped {
                Some(receiver) => return receiver.recv().map_err(|_| input_closed()),
                None => self.read_event()?,
            }
        }
    }

    fn check_interrupt(&mut self) -> io::Result<()> {
        if self.raw {
            // Keys typed meanwhile stay buffered for the program
            self.drain_events()?;
        }
        Ok(())
    }

    fn write_char(&mut self, ch: u8) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        // Raw mode does not translate newlines
        if self.raw && ch == b'\n' {
            stdout.write_all(b"\r\n")
        } else {
            stdout.write_all(&[ch])
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }

    fn halted(&mut self) -> io::Result<()> {
        if self.minimal {
            self.write_str("\nHalted\n")?;
        } else {
            self.write_str(&format!("\n{:>12}\n", "Halted".cyan()))?;
        }
        self.flush()
    }
}

/// Similar to [`crossterm::event::KeyCode`] but only contains keys with a character code.
#[derive(Debug, PartialEq)]
enum Key {
    Enter,
    Backspace,
    Tab,
    Escape,
    Interrupt,
    Char(char),
    Control(char),
}

impl Key {
    fn from_event(event: Event) -> Option<Key> {
        let Event::Key(event) = event else {
            return None;
        };
        Key::from_key_event(event)
    }

    fn from_key_event(event: KeyEvent) -> Option<Key> {
        use event::{KeyCode, KeyEventKind, KeyModifiers as Mod};

        if matches!(event.kind, KeyEventKind::Release) {
            return None;
        }

        let key = match (event.modifiers, event.code) {
            (Mod::CONTROL, KeyCode::Char('c')) => Key::Interrupt,
            (Mod::CONTROL, KeyCode::Char(ch)) if ch.is_ascii_alphabetic() => Key::Control(ch),

            (_, KeyCode::Enter) | (_, KeyCode::Char('\n')) => Key::Enter,
            (_, KeyCode::Backspace) => Key::Backspace,
            (_, KeyCode::Tab) => Key::Tab,
            (_, KeyCode::Esc) => Key::Escape,

            (Mod::NONE | Mod::SHIFT, KeyCode::Char(ch)) => Key::Char(ch),

            _ => return None,
        };
        Some(key)
    }

    /// Append the character code(s) for this key.
    ///
    /// `Ctrl+C` is reported as [`io::ErrorKind::Interrupted`], since raw mode swallows the
    /// signal.
    fn encode(&self, out: &mut VecDeque<u8>) -> io::Result<()> {
        match self {
            Key::Interrupt => {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "interrupted by Ctrl+C",
                ))
            }
            Key::Enter => out.push_back(b'\n'),
            Key::Backspace => out.push_back(0x08),
            Key::Tab => out.push_back(b'\t'),
            Key::Escape => out.push_back(0x1B),
            Key::Control(ch) => out.push_back(ch.to_ascii_lowercase() as u8 & 0x1F),
            Key::Char(ch) => {
                let mut bytes = [0u8; 4];
                out.extend(ch.encode_utf8(&mut bytes).bytes());
            }
        }
        Ok(())
    }
}

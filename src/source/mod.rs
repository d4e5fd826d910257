//! Line sources feeding the per-node cursors.
//!
//! A source is a lazy, finite, non-restartable sequence of raw lines that can be
//! released on demand. The analyzer never cares where the lines come from:
//! - `LogLoader`: a local log file
//! - `CommandSource`: the stdout of a child process (e.g. `ssh host cat file`)
//! - `MemorySource`: fixed lines, used for fixtures

pub mod log_loader;
pub mod remote;

use std::collections::VecDeque;
use std::io;

pub use log_loader::LogLoader;
pub use remote::{CommandSource, Transport};

/// Producer of raw log lines for one node.
pub trait LineSource {
    /// Pull the next line without its terminator.
    ///
    /// `Ok(None)` signals a clean end of stream. An `Err` is a transport failure.
    fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Release the underlying resource. Called once the stream is exhausted or abandoned.
    fn release(&mut self) {}
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        (**self).next_line()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// In-memory line source.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lines: VecDeque<String>,
}

impl MemorySource {
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a text block into lines.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }
}

impl LineSource for MemorySource {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }

    fn release(&mut self) {
        self.lines.clear();
    }
}

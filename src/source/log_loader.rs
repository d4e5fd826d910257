//! Sequential reader for a node's local log file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::LineSource;

/// Buffer size for reading log files (8KB).
const BUFFER_SIZE: usize = 8 * 1024;

/// Log file loader yielding one line at a time.
pub struct LogLoader {
    reader: Option<BufReader<File>>,
    line_buffer: String,
}

impl LogLoader {
    /// Open a log file for reading.
    ///
    /// # Returns
    ///
    /// `Ok(LogLoader)` if the file opens successfully, `Err` otherwise.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;

        Ok(Self {
            reader: Some(BufReader::with_capacity(BUFFER_SIZE, file)),
            line_buffer: String::with_capacity(512),
        })
    }

    /// Whether the file handle has been released.
    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }
}

impl LineSource for LogLoader {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        self.line_buffer.clear();
        match reader.read_line(&mut self.line_buffer)? {
            0 => Ok(None),
            _ => Ok(Some(self.line_buffer.trim_end_matches(['\n', '\r']).to_string())),
        }
    }

    fn release(&mut self) {
        self.reader = None;
    }
}

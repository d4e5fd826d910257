//! Sources backed by a child process, and the peer transport that picks a source per node.
//!
//! Remote peers are reached through the system `ssh` client: a node's log is the
//! stdout of `ssh user@host cat <path>`, a directory listing is `ssh user@host ls <path>`.

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use super::{LineSource, LogLoader};

/// Peer address meaning "read the local filesystem".
pub const LOCAL_PEER: &str = "local";

/// Streams the stdout of a child process line by line.
///
/// Stderr is drained on its own thread so a chatty child cannot block on a full pipe
/// while stdout is still being read.
pub struct CommandSource {
    description: String,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    stderr: Option<JoinHandle<io::Result<Vec<u8>>>>,
    line_buffer: String,
}

impl CommandSource {
    /// Spawn `command` with piped stdout and stderr.
    pub fn spawn(mut command: Command) -> io::Result<Self> {
        let description = format!("{:?}", command);
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let Some(stdout) = child.stdout.take() else {
            let message = format!("stdout of {} was not captured", description);
            return Err(io::Error::other(message));
        };
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || -> io::Result<Vec<u8>> {
                let mut captured = Vec::new();
                pipe.read_to_end(&mut captured)?;
                Ok(captured)
            })
        });

        log::debug!("Spawned {}", description);
        Ok(Self {
            description,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            stderr,
            line_buffer: String::with_capacity(512),
        })
    }

    /// Collect whatever the stderr thread captured. Unreadable output is logged and dropped.
    fn collect_stderr(&mut self) -> String {
        let Some(handle) = self.stderr.take() else {
            return String::new();
        };
        match handle.join() {
            Ok(Ok(captured)) => String::from_utf8_lossy(&captured).trim().to_string(),
            Ok(Err(e)) => {
                log::debug!("Failed to read stderr of {}: {}", self.description, e);
                String::new()
            }
            Err(_) => {
                log::debug!("Stderr reader of {} panicked", self.description);
                String::new()
            }
        }
    }

    /// Reap the child after its stdout closed; a failed exit is a transport error.
    fn finish(&mut self) -> io::Result<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait()?;
        let stderr = self.collect_stderr();
        if status.success() {
            if !stderr.is_empty() {
                log::debug!("{} wrote to stderr: {}", self.description, stderr);
            }
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} exited with {}: {}",
                self.description, status, stderr
            )))
        }
    }
}

impl LineSource for CommandSource {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        self.line_buffer.clear();
        match stdout.read_line(&mut self.line_buffer)? {
            0 => {
                self.finish()?;
                Ok(None)
            }
            _ => Ok(Some(self.line_buffer.trim_end_matches(['\n', '\r']).to_string())),
        }
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("Failed to kill {}: {}", self.description, e);
            }
            if let Err(e) = child.wait() {
                log::warn!("Failed to reap {}: {}", self.description, e);
            }
        }
        // Grandchildren may still hold stderr open; the reader thread ends with the pipe.
        self.stderr = None;
    }
}

impl Drop for CommandSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// How a peer's files are reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Local,
    Ssh { program: String, destination: String },
}

impl Transport {
    /// Interpret a peer address: `local`, or an ssh destination such as `user@host`.
    pub fn for_peer(peer: &str, ssh_program: &str) -> Self {
        if peer == LOCAL_PEER {
            Transport::Local
        } else {
            Transport::Ssh {
                program: ssh_program.to_string(),
                destination: peer.to_string(),
            }
        }
    }

    fn remote_command(program: &str, destination: &str, verb: &str, path: &str) -> Command {
        let mut command = Command::new(program);
        command.arg(destination).arg(verb).arg(path);
        command
    }

    /// Open a node's log file as a line source.
    pub fn open(&self, path: &str) -> io::Result<Box<dyn LineSource>> {
        match self {
            Transport::Local => Ok(Box::new(LogLoader::open(path)?)),
            Transport::Ssh { program, destination } => {
                let command = Self::remote_command(program, destination, "cat", path);
                Ok(Box::new(CommandSource::spawn(command)?))
            }
        }
    }

    /// List the entries of a directory, sorted by name.
    ///
    /// Locally only subdirectories are returned; remotely this is the output of `ls`.
    pub fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
        let mut entries = match self {
            Transport::Local => {
                let mut names = Vec::new();
                for entry in fs::read_dir(Path::new(path))? {
                    let entry = entry?;
                    if entry.file_type()?.is_dir() {
                        names.push(entry.file_name().to_string_lossy().to_string());
                    }
                }
                names
            }
            Transport::Ssh { program, destination } => {
                let command = Self::remote_command(program, destination, "ls", path);
                let mut source = CommandSource::spawn(command)?;
                let mut names = Vec::new();
                while let Some(line) = source.next_line()? {
                    let name = line.trim();
                    if !name.is_empty() {
                        names.push(name.to_string());
                    }
                }
                names
            }
        };
        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_address_parsing() {
        assert_eq!(Transport::for_peer("local", "ssh"), Transport::Local);
        assert_eq!(
            Transport::for_peer("raft@10.0.0.2", "ssh"),
            Transport::Ssh {
                program: "ssh".to_string(),
                destination: "raft@10.0.0.2".to_string()
            }
        );
    }

    #[test]
    fn test_local_list_dir_returns_sorted_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("run-b")).unwrap();
        fs::create_dir(dir.path().join("run-a")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let entries = Transport::Local.list_dir(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(entries, vec!["run-a".to_string(), "run-b".to_string()]);
    }

    #[test]
    fn test_local_open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("election.log");
        fs::write(&path, "line one\nline two\n").unwrap();

        let mut source = Transport::Local.open(path.to_str().unwrap()).unwrap();
        assert_eq!(source.next_line().unwrap().as_deref(), Some("line one"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("line two"));
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_streams_stdout() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("printf 'a\\nb\\n'");
        let mut source = CommandSource::spawn(command).unwrap();

        assert_eq!(source.next_line().unwrap().as_deref(), Some("a"));
        assert_eq!(source.next_line().unwrap().as_deref(), Some("b"));
        assert_eq!(source.next_line().unwrap(), None);
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_failure_is_transport_error() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo partial; echo 'no such file' >&2; exit 1");
        let mut source = CommandSource::spawn(command).unwrap();

        assert_eq!(source.next_line().unwrap().as_deref(), Some("partial"));
        let err = source.next_line().unwrap_err();
        assert!(err.to_string().contains("no such file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_survives_stderr_flood() {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(r#"head -c 200000 /dev/zero | tr '\0' x >&2; echo '{"ts":1,"member":"1"}'"#);
        let mut source = CommandSource::spawn(command).unwrap();

        assert_eq!(source.next_line().unwrap().as_deref(), Some(r#"{"ts":1,"member":"1"}"#));
        assert_eq!(source.next_line().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_non_utf8_stderr() {
        let mut command = Command::new("sh");
        command.arg("-c").arg(r"printf '\377\376' >&2; echo ok");
        let mut source = CommandSource::spawn(command).unwrap();
        assert_eq!(source.next_line().unwrap().as_deref(), Some("ok"));
        assert_eq!(source.next_line().unwrap(), None);

        let mut command = Command::new("sh");
        command.arg("-c").arg(r"printf '\377 broken pipe' >&2; exit 3");
        let mut source = CommandSource::spawn(command).unwrap();
        let err = source.next_line().unwrap_err();
        assert!(err.to_string().contains("broken pipe"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_source_release_kills_child() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo first; sleep 30");
        let mut source = CommandSource::spawn(command).unwrap();

        assert_eq!(source.next_line().unwrap().as_deref(), Some("first"));
        source.release();
        assert_eq!(source.next_line().unwrap(), None);
    }
}

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Output of a subprocess that ran to completion.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    /// stdout and stderr lines, interleaved in arrival order, each newline-terminated.
    pub combined: String,
}

#[derive(Debug)]
pub enum ProcessOutcome {
    Exited(CapturedOutput),
    /// The deadline passed; the child was killed. Holds whatever was captured.
    TimedOut { combined: String },
}

/// Run `command` to completion, merging stdout and stderr into one buffer.
///
/// stdin is closed. With a `timeout`, the child is killed once it elapses.
pub fn run_captured(command: &mut Command, timeout: Option<Duration>) -> io::Result<ProcessOutcome> {
    command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn()?;

    let (tx, rx) = mpsc::channel::<String>();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let deadline = timeout.map(|t| Instant::now() + t);
    let mut combined = String::new();
    loop {
        let line = match deadline {
            None => match rx.recv() {
                Ok(line) => line,
                Err(_) => break,
            },
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(line) => line,
                    Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        kill_quietly(&mut child);
                        return Ok(ProcessOutcome::TimedOut { combined });
                    }
                }
            }
        };
        combined.push_str(&line);
        combined.push('\n');
    }

    for reader in readers {
        let _ = reader.join();
    }

    match wait_until(&mut child, deadline)? {
        Some(status) => Ok(ProcessOutcome::Exited(CapturedOutput { status, combined })),
        None => {
            kill_quietly(&mut child);
            Ok(ProcessOutcome::TimedOut { combined })
        }
    }
}

fn forward_lines<R: Read + Send + 'static>(
    stream: R,
    tx: mpsc::Sender<String>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(&['\r', '\n'][..]).to_string();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Wait for exit; `None` means the deadline passed first.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(20));
    }
}

fn kill_quietly(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

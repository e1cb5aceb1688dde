use std::{
    io::{BufRead, BufReader, Read},
    process::{Command, ExitStatus, Output, Stdio},
    thread,
};

use bitflags::bitflags;
use crossbeam_channel::unbounded;
use miette::{IntoDiagnostic, WrapErr};
use tracing::{debug, enabled, trace, Level};

use crate::result::{bail, Result};

pub const YT_DL: &str = "youtube-dl";
pub const YT_DLP: &str = "yt-dlp";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capture: u8 {
        const STDIN = 0b0000001;
        const STDOUT = 0b0000010;
        const STDERR = 0b0000100;
    }
}

/// Which pipe of the child process a line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipe {
    Stdout,
    Stderr,
}

/// Run a command, returning its raw output handle.
///
/// IO handles will be captured only if the caller required it or if the log level is Debug.
/// In that last case, `stdout` and `stderr` will be logged.
///
/// The function returns an error only if the command failed to execute.
/// If the program runs but returns a non-0 status code, it will not trigger an error.
pub fn run_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
    capture: Capture,
) -> Result<Output> {
    let is_debug = enabled!(Level::DEBUG);
    let get_io = |capture| {
        if capture {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    };

    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(get_io(capture.contains(Capture::STDIN)))
        .stdout(get_io(is_debug || capture.contains(Capture::STDOUT)))
        .stderr(get_io(is_debug || capture.contains(Capture::STDERR)));

    debug!("Executing command: {cmd:?}");
    let res = cmd
        .output()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not run {program}"))?;

    if is_debug {
        debug!("status: {}", res.status);
        debug!("stdout: {} bytes long", res.stdout.len());
        trace!("stdout: {:?}", String::from_utf8_lossy(&res.stdout));
        debug!("stderr: {} bytes long", res.stderr.len());
        trace!("stderr: {:?}", String::from_utf8_lossy(&res.stderr));
    }

    Ok(res)
}

/// Run the command and verify that it has returned a success status code.
pub fn assert_success_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
) -> Result<()> {
    let res = run_command(program, f, Capture::empty())?;
    if res.status.success() {
        Ok(())
    } else {
        bail(format!("{program} did run but was not successful"))
    }
}

/// Run a command while handing every output line to `on_line` as soon as it is printed.
///
/// Both pipes are drained by their own reader thread so that the child never
/// blocks on a full pipe. Lines are delivered on the calling thread.
/// Return the exit status along with the whole stderr text.
pub fn run_streaming<F, L>(program: &str, f: F, mut on_line: L) -> Result<(ExitStatus, String)>
where
    F: FnOnce(&mut Command) -> &mut Command,
    L: FnMut(Pipe, &str),
{
    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Executing command: {cmd:?}");
    let mut child = cmd
        .spawn()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not run {program}"))?;

    let (send, receive) = unbounded();
    let mut readers = Vec::with_capacity(2);
    let pipes: [(Pipe, Option<Box<dyn Read + Send>>); 2] = [
        (Pipe::Stdout, child.stdout.take().map(|p| Box::new(p) as _)),
        (Pipe::Stderr, child.stderr.take().map(|p| Box::new(p) as _)),
    ];
    for (pipe, handle) in pipes {
        let Some(handle) = handle else { continue };
        let send = send.clone();
        readers.push(thread::spawn(move || {
            // yt-dlp rewrites its progress line with '\r' when not given `--newline`
            for line in BufReader::new(handle).split(b'\n').map_while(|l| l.ok()) {
                for part in line.split(|&b| b == b'\r') {
                    let text = String::from_utf8_lossy(part).trim_end().to_string();
                    if !text.is_empty() && send.send((pipe, text)).is_err() {
                        return;
                    }
                }
            }
        }));
    }
    // The loop below ends once both readers dropped their sender
    drop(send);

    let mut stderr = String::new();
    for (pipe, line) in receive {
        trace!("{pipe:?}: {line}");
        if pipe == Pipe::Stderr {
            stderr.push_str(&line);
            stderr.push('\n');
        }
        on_line(pipe, &line);
    }

    for reader in readers {
        // A reader only stops early on a closed channel, which cannot happen here
        let _ = reader.join();
    }

    let status = child
        .wait()
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not wait for {program}"))?;
    debug!("status: {status}");

    Ok((status, stderr))
}

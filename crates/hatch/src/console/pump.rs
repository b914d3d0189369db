//! Full-duplex byte copy between the local stdio and a remote session.
//!
//! Local input is forwarded on a detached thread. Remote output is copied on the
//! caller's thread, and the pump finishes when that direction reaches end of
//! stream. An interactive terminal never signals end of input, so the input
//! thread is simply abandoned.

use std::io::{self, ErrorKind, Read, Write};
use std::thread;

use anyhow::{Context, Result};

const CHUNK: usize = 8192;

/// Copy until the remote read side closes. Returns the number of bytes
/// delivered to `local_out`.
pub fn pump(
  remote_reader: Box<dyn Read + Send>,
  remote_writer: Box<dyn Write + Send>,
  local_in: Box<dyn Read + Send>,
  local_out: Box<dyn Write + Send>,
) -> Result<u64> {
  spawn_input(local_in, remote_writer)?;
  copy_output(remote_reader, local_out)
}

fn spawn_input(mut local_in: Box<dyn Read + Send>, mut remote_writer: Box<dyn Write + Send>) -> Result<()> {
  thread::Builder::new()
    .name("console-input".to_string())
    .spawn(move || {
      let mut buffer = [0u8; CHUNK];
      loop {
        match local_in.read(&mut buffer) {
          Ok(0) => break,
          Ok(count) => {
            if let Err(err) = remote_writer
              .write_all(&buffer[..count])
              .and_then(|()| remote_writer.flush())
            {
              log::debug!("remote input closed: {err}");
              break;
            }
          }
          Err(err) if err.kind() == ErrorKind::Interrupted => {}
          Err(err) => {
            log::debug!("local input closed: {err}");
            break;
          }
        }
      }
      // Dropping the writer tells the remote side that input ended.
      drop(remote_writer);
    })
    .context("failed to spawn console input thread")?;
  Ok(())
}

fn copy_output(mut remote_reader: Box<dyn Read + Send>, mut local_out: Box<dyn Write + Send>) -> Result<u64> {
  let mut buffer = [0u8; CHUNK];
  let mut total = 0u64;
  loop {
    let count = match remote_reader.read(&mut buffer) {
      Ok(0) => break,
      Ok(count) => count,
      Err(err) if err.kind() == ErrorKind::Interrupted => continue,
      Err(err) if is_clean_close(&err) => {
        log::debug!("remote stream closed: {err}");
        break;
      }
      Err(err) => return Err(err).context("remote stream failed"),
    };
    match local_out
      .write_all(&buffer[..count])
      .and_then(|()| local_out.flush())
    {
      Ok(()) => total += count as u64,
      Err(err) if is_clean_close(&err) => {
        log::debug!("local output closed: {err}");
        break;
      }
      Err(err) => return Err(err).context("local output failed"),
    }
  }
  Ok(total)
}

/// Errors that mean the other end went away rather than something broke.
///
/// A PTY master reports `EIO` once the child side has hung up.
#[must_use]
pub fn is_clean_close(err: &io::Error) -> bool {
  matches!(
    err.kind(),
    ErrorKind::UnexpectedEof
      | ErrorKind::BrokenPipe
      | ErrorKind::ConnectionReset
      | ErrorKind::ConnectionAborted
  ) || err.raw_os_error() == Some(nix::errno::Errno::EIO as i32)
}

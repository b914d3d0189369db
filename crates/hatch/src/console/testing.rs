//! Fakes for the console collaborators. Everything they observe goes into a
//! shared [`Journal`] so tests can assert on ordering across components.

use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::SessionRequest;
use super::resize::WindowChanges;
use super::tty::{Geometry, LocalConsole, StdStream};
use crate::host::{Banner, Display, Provider, RemoteHost, RemoteSession, SessionCloser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
  ProviderInit,
  Banner(String),
  Start(Vec<String>),
  Acquire(StdStream),
  Restore(StdStream),
  Resize {
    session_id: String,
    rows: u16,
    cols: u16,
  },
  Output(Vec<u8>),
  Close,
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
  pub fn push(&self, event: Event) {
    self.0.lock().push(event);
  }

  pub fn events(&self) -> Vec<Event> {
    self.0.lock().clone()
  }

  pub fn output(&self) -> Vec<u8> {
    self
      .events()
      .into_iter()
      .filter_map(|e| match e {
        Event::Output(bytes) => Some(bytes),
        _ => None,
      })
      .flatten()
      .collect()
  }

  pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
    self.0.lock().iter().filter(|e| pred(e)).count()
  }
}

/// Records every write as an [`Event::Output`].
pub struct JournalWriter(Journal);

impl JournalWriter {
  pub fn new(journal: &Journal) -> Self {
    Self(journal.clone())
  }
}

impl Write for JournalWriter {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.push(Event::Output(buf.to_vec()));
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

#[derive(Debug, Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
  pub fn contents(&self) -> Vec<u8> {
    self.0.lock().clone()
  }
}

impl Write for SharedBuf {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.lock().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

/// Yields `data` once, then fails with `err`.
pub struct FailingReader {
  data: Cursor<Vec<u8>>,
  err: Option<io::Error>,
}

impl FailingReader {
  pub fn new(data: &[u8], err: io::Error) -> Self {
    Self {
      data: Cursor::new(data.to_vec()),
      err: Some(err),
    }
  }
}

impl Read for FailingReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    let count = self.data.read(buf)?;
    if count > 0 {
      return Ok(count);
    }
    match self.err.take() {
      Some(err) => Err(err),
      None => Ok(0),
    }
  }
}

/// Yields `data` one byte at a time, sleeping `delay` before each.
pub struct TrickleReader {
  data: Cursor<Vec<u8>>,
  delay: Duration,
}

impl TrickleReader {
  pub fn new(data: &[u8], delay: Duration) -> Self {
    Self {
      data: Cursor::new(data.to_vec()),
      delay,
    }
  }
}

impl Read for TrickleReader {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    if buf.is_empty() {
      return Ok(0);
    }
    thread::sleep(self.delay);
    self.data.read(&mut buf[..1])
  }
}

#[derive(Clone)]
pub struct FakeConsole {
  journal: Journal,
  terminal: bool,
  refuse_raw: Vec<StdStream>,
  fail_restore: bool,
  fail_geometry: bool,
  refuse_window_changes: bool,
  geometry: Geometry,
  input: Vec<u8>,
  notifier: Arc<Mutex<Option<Sender<()>>>>,
}

impl FakeConsole {
  pub fn terminal() -> Self {
    Self {
      journal: Journal::default(),
      terminal: true,
      refuse_raw: Vec::new(),
      fail_restore: false,
      fail_geometry: false,
      refuse_window_changes: false,
      geometry: Geometry { cols: 80, rows: 24 },
      input: Vec::new(),
      notifier: Arc::new(Mutex::new(None)),
    }
  }

  pub fn piped() -> Self {
    Self {
      terminal: false,
      ..Self::terminal()
    }
  }

  pub fn with_journal(mut self, journal: &Journal) -> Self {
    self.journal = journal.clone();
    self
  }

  pub fn with_geometry(mut self, cols: u16, rows: u16) -> Self {
    self.geometry = Geometry { cols, rows };
    self
  }

  pub fn with_input(mut self, input: &[u8]) -> Self {
    self.input = input.to_vec();
    self
  }

  pub fn refuse_raw(mut self, stream: StdStream) -> Self {
    self.refuse_raw.push(stream);
    self
  }

  pub fn fail_restore(mut self) -> Self {
    self.fail_restore = true;
    self
  }

  pub fn fail_geometry(mut self) -> Self {
    self.fail_geometry = true;
    self
  }

  pub fn refuse_window_changes(mut self) -> Self {
    self.refuse_window_changes = true;
    self
  }

  pub fn acquired(&self) -> Vec<StdStream> {
    self
      .journal
      .events()
      .into_iter()
      .filter_map(|e| match e {
        Event::Acquire(stream) => Some(stream),
        _ => None,
      })
      .collect()
  }

  pub fn restored(&self) -> Vec<StdStream> {
    self
      .journal
      .events()
      .into_iter()
      .filter_map(|e| match e {
        Event::Restore(stream) => Some(stream),
        _ => None,
      })
      .collect()
  }

  /// Deliver a window-change notification to the active subscription.
  pub fn notify_resize(&self) -> bool {
    self
      .notifier
      .lock()
      .as_ref()
      .is_some_and(|tx| tx.send(()).is_ok())
  }
}

impl LocalConsole for FakeConsole {
  type Snapshot = StdStream;

  fn is_terminal(&self) -> bool {
    self.terminal
  }

  fn acquire_raw(&self, stream: StdStream) -> Result<StdStream> {
    if self.refuse_raw.contains(&stream) {
      bail!("inappropriate ioctl for device");
    }
    self.journal.push(Event::Acquire(stream));
    Ok(stream)
  }

  fn restore(&self, stream: StdStream, snapshot: StdStream) -> Result<()> {
    assert_eq!(stream, snapshot, "snapshot restored onto the wrong descriptor");
    self.journal.push(Event::Restore(stream));
    if self.fail_restore {
      bail!("restore refused");
    }
    Ok(())
  }

  fn geometry(&self) -> Result<Geometry> {
    if self.fail_geometry {
      bail!("failed to read terminal geometry");
    }
    Ok(self.geometry)
  }

  fn window_changes(&self) -> Result<WindowChanges> {
    if self.refuse_window_changes {
      bail!("failed to subscribe to window-change notifications");
    }
    let (tx, rx) = crossbeam_channel::unbounded();
    *self.notifier.lock() = Some(tx);
    Ok(WindowChanges::from_receiver(rx))
  }

  fn input(&self) -> Box<dyn Read + Send> {
    Box::new(Cursor::new(self.input.clone()))
  }

  fn output(&self) -> Box<dyn Write + Send> {
    Box::new(JournalWriter::new(&self.journal))
  }
}

pub struct FakeHost {
  journal: Journal,
  output: Vec<u8>,
  output_delay: Option<Duration>,
  stream_error: Option<String>,
  fail_start: bool,
  fail_resize: bool,
  requests: Mutex<Vec<SessionRequest>>,
  remote_input: SharedBuf,
}

impl FakeHost {
  pub fn new(journal: &Journal) -> Self {
    Self {
      journal: journal.clone(),
      output: Vec::new(),
      output_delay: None,
      stream_error: None,
      fail_start: false,
      fail_resize: false,
      requests: Mutex::new(Vec::new()),
      remote_input: SharedBuf::default(),
    }
  }

  pub fn with_output(mut self, output: &[u8]) -> Self {
    self.output = output.to_vec();
    self
  }

  /// Deliver the output one byte per `delay` so the session stays open.
  pub fn with_slow_output(mut self, output: &[u8], delay: Duration) -> Self {
    self.output = output.to_vec();
    self.output_delay = Some(delay);
    self
  }

  /// Fail the remote stream with a non-clean error after the output.
  pub fn with_stream_error(mut self, message: &str) -> Self {
    self.stream_error = Some(message.to_string());
    self
  }

  pub fn fail_start(mut self) -> Self {
    self.fail_start = true;
    self
  }

  pub fn fail_resize(mut self) -> Self {
    self.fail_resize = true;
    self
  }

  pub fn requests(&self) -> Vec<SessionRequest> {
    self.requests.lock().clone()
  }

  pub fn remote_input(&self) -> Vec<u8> {
    self.remote_input.contents()
  }

  pub fn resize_count(&self) -> usize {
    self.journal.count(|e| matches!(e, Event::Resize { .. }))
  }
}

struct JournalCloser(Journal);

impl SessionCloser for JournalCloser {
  fn close(&mut self) -> Result<()> {
    self.0.push(Event::Close);
    Ok(())
  }
}

impl RemoteHost for FakeHost {
  fn start_session(&self, request: &SessionRequest) -> Result<RemoteSession> {
    self.requests.lock().push(request.clone());
    if self.fail_start {
      bail!("no such container: {}", request.target());
    }
    self.journal.push(Event::Start(request.command().to_vec()));
    let reader: Box<dyn Read + Send> = match (&self.stream_error, self.output_delay) {
      (Some(message), _) => Box::new(FailingReader::new(&self.output, io::Error::other(message.clone()))),
      (None, Some(delay)) => Box::new(TrickleReader::new(&self.output, delay)),
      (None, None) => Box::new(Cursor::new(self.output.clone())),
    };
    Ok(RemoteSession::new(
      "exec-1",
      reader,
      Box::new(self.remote_input.clone()),
      Box::new(JournalCloser(self.journal.clone())),
    ))
  }

  fn resize(&self, session_id: &str, rows: u16, cols: u16) -> Result<()> {
    self.journal.push(Event::Resize {
      session_id: session_id.to_string(),
      rows,
      cols,
    });
    if self.fail_resize {
      return Err(anyhow!("resize rejected"));
    }
    Ok(())
  }
}

pub struct FakeProvider {
  journal: Journal,
  fail: bool,
}

impl FakeProvider {
  pub fn new(journal: &Journal) -> Self {
    Self {
      journal: journal.clone(),
      fail: false,
    }
  }

  pub fn failing(journal: &Journal) -> Self {
    Self {
      fail: true,
      ..Self::new(journal)
    }
  }
}

impl Provider for FakeProvider {
  fn init(&self) -> Result<()> {
    self.journal.push(Event::ProviderInit);
    if self.fail {
      bail!("engine is not running");
    }
    Ok(())
  }
}

pub struct FakeDisplay(Journal);

impl FakeDisplay {
  pub fn new(journal: &Journal) -> Self {
    Self(journal.clone())
  }
}

impl Display for FakeDisplay {
  fn banner(&self, banner: Banner<'_>) {
    let text = match banner {
      Banner::Developer {
        peer_address: Some(peer),
      } => format!("developer:{peer}"),
      Banner::Developer { peer_address: None } => "developer".to_string(),
      Banner::Generic => "generic".to_string(),
    };
    self.0.push(Event::Banner(text));
  }
}

// postflight/src/core/context.rs

//! The per-build execution context: an append-only log sink plus a
//! monotonic result severity, shared by reference across every unit and
//! step of one build invocation.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

use super::severity::Severity;

/// Level of a build-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
  Info,
  Error,
}

/// One entry in the build log.
#[derive(Debug, Clone)]
pub struct LogEntry {
  pub level: LogLevel,
  pub message: String,
}

/// Append-only log sink for one build. Entries are what the host surfaces
/// as the build console; they are never rewritten or removed.
#[derive(Debug, Default)]
pub struct BuildLog {
  entries: Vec<LogEntry>,
}

impl BuildLog {
  pub fn info(&mut self, message: impl Into<String>) {
    self.entries.push(LogEntry {
      level: LogLevel::Info,
      message: message.into(),
    });
  }

  pub fn error(&mut self, message: impl Into<String>) {
    self.entries.push(LogEntry {
      level: LogLevel::Error,
      message: message.into(),
    });
  }

  pub fn entries(&self) -> &[LogEntry] {
    &self.entries
  }

  /// Error-level messages, in insertion order.
  pub fn errors(&self) -> impl Iterator<Item = &str> {
    self
      .entries
      .iter()
      .filter(|e| e.level == LogLevel::Error)
      .map(|e| e.message.as_str())
  }
}

/// Mutable state of one build invocation.
#[derive(Debug, Default)]
pub struct BuildContext {
  severity: Severity,
  log: BuildLog,
}

impl BuildContext {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn result(&self) -> Severity {
    self.severity
  }

  /// Worsen-only merge: the proposed severity replaces the current one only
  /// if it is strictly worse. The result of a build never improves.
  pub fn set_result(&mut self, severity: Severity) {
    self.severity = self.severity.combine(severity);
  }

  pub fn log(&self) -> &BuildLog {
    &self.log
  }

  pub fn log_mut(&mut self) -> &mut BuildLog {
    &mut self.log
  }
}

/// Shared handle to a [`BuildContext`], cloned by reference into every unit
/// and step of one build.
///
/// Guards are blocking and MUST NOT be held across an `.await` point.
#[derive(Debug, Default)]
pub struct SharedContext(Arc<RwLock<BuildContext>>);

impl SharedContext {
  pub fn new(ctx: BuildContext) -> Self {
    SharedContext(Arc::new(RwLock::new(ctx)))
  }

  /// Acquires a read lock. The returned guard MUST be dropped before any
  /// `.await` point.
  pub fn read(&self) -> RwLockReadGuard<'_, BuildContext> {
    self.0.read()
  }

  /// Acquires a write lock. The returned guard MUST be dropped before any
  /// `.await` point.
  pub fn write(&self) -> RwLockWriteGuard<'_, BuildContext> {
    self.0.write()
  }
}

impl Clone for SharedContext {
  fn clone(&self) -> Self {
    SharedContext(Arc::clone(&self.0))
  }
}

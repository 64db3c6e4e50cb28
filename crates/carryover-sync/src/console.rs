//! Console narration for synchronization steps.
//!
//! The synchronizer narrates what it is doing (bootstrap, files found,
//! failures, final outcome) to a [`Console`]. Narration is purely
//! observational: nothing a console does affects the synchronization.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A line of narration sent to a console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleEvent {
  /// A titled section has been opened.
  SectionOpened { label: String },

  /// A message inside the current section.
  Message { text: String },

  /// The current section has been closed.
  SectionClosed { success: bool },
}

/// Sink for human-readable step progress.
pub trait Console: Send + Sync {
  /// Open a titled section.
  fn open_section(&self, label: &str);

  /// Publish a message inside the current section.
  fn publish_message(&self, text: &str);

  /// Close the current section, marking it succeeded or failed.
  fn close_section(&self, success: bool);
}

/// A console that discards all narration.
#[derive(Debug, Clone, Default)]
pub struct NoopConsole;

impl Console for NoopConsole {
  fn open_section(&self, _label: &str) {}

  fn publish_message(&self, _text: &str) {}

  fn close_section(&self, _success: bool) {}
}

/// A console that forwards narration to an unbounded channel.
///
/// Use this to stream progress to a log collector or to inspect it in tests.
#[derive(Debug, Clone)]
pub struct ChannelConsole {
  sender: mpsc::UnboundedSender<ConsoleEvent>,
}

impl ChannelConsole {
  /// Create a new channel console.
  pub fn new(sender: mpsc::UnboundedSender<ConsoleEvent>) -> Self {
    Self { sender }
  }

  fn send(&self, event: ConsoleEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

impl Console for ChannelConsole {
  fn open_section(&self, label: &str) {
    self.send(ConsoleEvent::SectionOpened {
      label: label.to_string(),
    });
  }

  fn publish_message(&self, text: &str) {
    self.send(ConsoleEvent::Message {
      text: text.to_string(),
    });
  }

  fn close_section(&self, success: bool) {
    self.send(ConsoleEvent::SectionClosed { success });
  }
}

/// A console that writes narration as `tracing` events.
#[derive(Debug, Clone, Default)]
pub struct TracingConsole;

impl Console for TracingConsole {
  fn open_section(&self, label: &str) {
    info!(target: "carryover::console", "== {}", label);
  }

  fn publish_message(&self, text: &str) {
    info!(target: "carryover::console", "{}", text);
  }

  fn close_section(&self, success: bool) {
    if success {
      info!(target: "carryover::console", "== done");
    } else {
      warn!(target: "carryover::console", "== failed");
    }
  }
}

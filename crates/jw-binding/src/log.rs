//! Per-binding traffic logging.

use std::fmt;
use std::rc::Rc;

use jw_core::{Address, SignalKind, SignalValue};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDirection {
    /// The binding published a value.
    Sent,
    /// The bus delivered a changed value.
    Received,
    /// The value replayed when the binding subscribed.
    Init,
}

impl LogDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            LogDirection::Sent => "sent",
            LogDirection::Received => "received",
            LogDirection::Init => "init",
        }
    }
}

impl fmt::Display for LogDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value crossing a binding.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub kind: SignalKind,
    pub join: &'a Address,
    pub direction: LogDirection,
    pub value: &'a SignalValue,
    pub key: Option<&'a str>,
    /// Position within a multi-address binding.
    pub index: Option<usize>,
}

impl LogRecord<'_> {
    /// `key`, or `key[index]` for multi-address bindings; empty without a key.
    pub fn label(&self) -> String {
        match (self.key, self.index) {
            (Some(key), Some(index)) => format!("{key}[{index}]"),
            (Some(key), None) => key.to_string(),
            (None, _) => String::new(),
        }
    }

    /// Fixed-width line, e.g. `boolean:001     sent value: true  Power`.
    pub fn line(&self) -> String {
        format!(
            "{:<7}:{:0>3} {:>8} value: {:<5} {}",
            self.kind.as_str(),
            self.join.as_str(),
            self.direction.as_str(),
            self.value.to_string(),
            self.label()
        )
        .trim_end()
        .to_string()
    }
}

/// Custom formatter; `None` suppresses the event.
pub type LogFormatter = Rc<dyn Fn(&LogRecord<'_>) -> Option<String>>;

#[derive(Clone, Default)]
pub enum LogMode {
    #[default]
    Off,
    /// Emit [`LogRecord::line`].
    Lines,
    Custom(LogFormatter),
}

impl LogMode {
    pub fn from_flag(enabled: bool) -> Self {
        if enabled { LogMode::Lines } else { LogMode::Off }
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&LogRecord<'_>) -> Option<String> + 'static,
    {
        LogMode::Custom(Rc::new(f))
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, LogMode::Off)
    }

    /// Text that would be emitted for `record`, if any.
    pub fn render(&self, record: &LogRecord<'_>) -> Option<String> {
        match self {
            LogMode::Off => None,
            LogMode::Lines => Some(record.line()),
            LogMode::Custom(f) => f(record),
        }
    }

    pub fn emit(&self, record: &LogRecord<'_>) {
        if let Some(line) = self.render(record) {
            info!(
                kind = %record.kind,
                join = %record.join,
                direction = %record.direction,
                value = %record.value,
                key = record.key.unwrap_or_default(),
                "{line}"
            );
        }
    }
}

impl fmt::Debug for LogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogMode::Off => f.write_str("Off"),
            LogMode::Lines => f.write_str("Lines"),
            LogMode::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

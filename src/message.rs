//! Host messages as seen by the tap
//!
//! Parsing and framing belong to the host. The tap only needs the string form
//! of a message, which may fail for bodies that can only be read once.

use parking_lot::Mutex;
use std::fmt;

/// A message flowing through a host's dispatch pipeline
pub trait Message: Send + Sync {
    /// Serialized text of the message
    fn render(&self) -> eyre::Result<String>;

    /// Whether the call carrying this message expects no reply
    fn is_one_way(&self) -> bool {
        false
    }
}

/// A fully buffered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    text: String,
    one_way: bool,
}

impl TextMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            one_way: false,
        }
    }

    pub fn one_way(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            one_way: true,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Message for TextMessage {
    fn render(&self) -> eyre::Result<String> {
        Ok(self.text.clone())
    }

    fn is_one_way(&self) -> bool {
        self.one_way
    }
}

impl fmt::Display for TextMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A message whose body can be read exactly once
#[derive(Debug)]
pub struct StreamedMessage {
    body: Mutex<Option<String>>,
}

impl StreamedMessage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Mutex::new(Some(body.into())),
        }
    }

    /// Take the body, leaving the message consumed
    pub fn read_body(&self) -> eyre::Result<String> {
        self.body
            .lock()
            .take()
            .ok_or_else(|| eyre::eyre!("message body has already been consumed"))
    }

    pub fn is_consumed(&self) -> bool {
        self.body.lock().is_none()
    }
}

impl Message for StreamedMessage {
    fn render(&self) -> eyre::Result<String> {
        match self.body.lock().as_ref() {
            Some(body) => Ok(body.clone()),
            None => eyre::bail!("message body has already been consumed"),
        }
    }
}

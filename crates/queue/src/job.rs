use relaydrop_transfer::ChatRef;

use crate::origin;

/// How an origin selector is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    /// Provider file identifier; needs a metadata lookup.
    Identifier,
    /// Plain HTTP(S) link.
    Link,
}

/// One requested transfer. Immutable once queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    pub origin: String,
    pub kind: OriginKind,
    /// Where the job's notifications go.
    pub chat: ChatRef,
}

impl JobDescriptor {
    pub fn new(origin: impl Into<String>, kind: OriginKind, chat: ChatRef) -> Self {
        Self {
            origin: origin.into(),
            kind,
            chat,
        }
    }

    /// Builds a job from free-form user text, if it names a usable origin.
    pub fn from_text(text: &str, chat: ChatRef) -> Option<Self> {
        let (kind, origin) = origin::classify(text)?;
        Some(Self::new(origin, kind, chat))
    }

    /// Key shown as the current job in queue snapshots.
    pub fn label(&self) -> &str {
        &self.origin
    }
}

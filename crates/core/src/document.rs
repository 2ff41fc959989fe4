//! Document trait: identity of a stored read-model document.

/// A read-model document stored under a string id.
pub trait Document {
    /// Name used in log fields and error messages (e.g. "process instance").
    const KIND: &'static str;

    /// Returns the document id.
    fn id(&self) -> &str;
}

/// A runtime event emitted by the process engine.
///
/// Events are immutable facts. The query side never produces them; it only
/// projects them into documents.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Producer's event-type name (e.g. "TASK_CREATED").
    ///
    /// This is the dispatch key and is compared case-sensitively.
    fn event_type(&self) -> &'static str;
}

//! Origin reporting for resources.

/// A resource that knows the URI it was created or last recycled for.
///
/// Implementing this trait allows a resource to be released without naming its URI.
pub trait Origin {
    /// The originating URI text, if known.
    fn origin_uri(&self) -> Option<&str>;
}

/// Structured values report their origin through a conventional `"uri"` field.
impl Origin for serde_json::Value {
    fn origin_uri(&self) -> Option<&str> {
        self.get("uri").and_then(serde_json::Value::as_str)
    }
}

impl<T: Origin + ?Sized> Origin for Box<T> {
    fn origin_uri(&self) -> Option<&str> {
        (**self).origin_uri()
    }
}

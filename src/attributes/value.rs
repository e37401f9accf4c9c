//! Attribute values
//!
//! A value is either concrete text or a deferred render handle. Deferred
//! values are rendered once per merge pass and never cached across passes,
//! so a value backed by shared state reflects that state at merge time.

use std::fmt;
use std::sync::Arc;

/// Error produced by a deferred render.
pub type RenderError = Box<dyn std::error::Error + Send + Sync>;

type RenderFn = dyn Fn() -> Result<String, RenderError> + Send + Sync;

/// A caller-supplied attribute value.
#[derive(Clone)]
pub enum AttrValue {
    /// Concrete text, validated on insertion
    Text(String),

    /// Rendered to text when the effective manifest is computed
    Deferred(Arc<RenderFn>),

    /// Absent value; rejected on insertion
    Null,
}

impl AttrValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// A value rendered by calling `render` at merge time.
    pub fn lazy<F>(render: F) -> Self
    where
        F: Fn() -> Result<String, RenderError> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(render))
    }

    /// A value rendered through its `Display` form at merge time.
    pub fn display<T>(value: T) -> Self
    where
        T: fmt::Display + Send + Sync + 'static,
    {
        Self::lazy(move || Ok(value.to_string()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Render to text.
    pub fn render(&self) -> Result<String, RenderError> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::Deferred(render) => render(),
            Self::Null => Err("value is null".into()),
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Null => f.write_str("Null"),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for AttrValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

macro_rules! display_into_text {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    Self::Text(value.to_string())
                }
            }
        )*
    };
}

display_into_text!(bool, char, i32, i64, u32, u64, usize, f64);

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_text_renders_as_is() {
        assert_eq!(AttrValue::from("1.0").render().unwrap(), "1.0");
        assert_eq!(AttrValue::from(42u32).render().unwrap(), "42");
        assert_eq!(AttrValue::from(true).render().unwrap(), "true");
    }

    #[test]
    fn test_option_none_is_null() {
        let value: AttrValue = None::<&str>.into();
        assert!(value.is_null());
        assert!(value.render().is_err());

        let value: AttrValue = Some("x").into();
        assert_eq!(value.render().unwrap(), "x");
    }

    #[test]
    fn test_deferred_renders_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = AttrValue::lazy(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("build-{}", n))
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(value.render().unwrap(), "build-0");
        assert_eq!(value.render().unwrap(), "build-1");
    }

    #[test]
    fn test_display_reads_shared_state_at_render_time() {
        struct Version(Mutex<String>);
        impl fmt::Display for Version {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0.lock().unwrap())
            }
        }

        let version = Arc::new(Version(Mutex::new("1.0".to_string())));
        let value = AttrValue::display(Arc::clone(&version));
        *version.0.lock().unwrap() = "2.0".to_string();

        assert_eq!(value.render().unwrap(), "2.0");
    }

    #[test]
    fn test_deferred_failure() {
        let value = AttrValue::lazy(|| Err("git describe failed".into()));
        assert_eq!(value.render().unwrap_err().to_string(), "git describe failed");
        assert_eq!(format!("{:?}", value), "Deferred(..)");
    }
}

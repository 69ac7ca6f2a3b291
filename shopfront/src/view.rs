//! State shared by the views.

use serde::Serialize;

/// Data fetched from an external source, as seen by a view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Loadable<T> {
    /// No fetch started yet
    #[default]
    NotLoaded,
    /// Fetch in flight
    Loading,
    /// Fetch succeeded
    Loaded(T),
    /// Fetch failed; the view stays usable and can retry
    Failed(String),
}

impl<T> Loadable<T> {
    /// The loaded value, if any
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// The failure message, if the fetch failed
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Whether a fetch is in flight
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the fetch finished, successfully or not
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Loaded(_) | Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let loaded = Loadable::Loaded(vec![1, 2]);
        assert_eq!(loaded.value(), Some(&vec![1, 2]));
        assert!(loaded.is_settled());

        let failed: Loadable<()> = Loadable::Failed("catalog unavailable".into());
        assert_eq!(failed.error(), Some("catalog unavailable"));
        assert!(failed.is_settled());

        assert!(Loadable::<()>::Loading.is_loading());
        assert!(!Loadable::<()>::default().is_settled());
    }
}

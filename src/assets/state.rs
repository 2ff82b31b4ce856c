use crate::error::AssetError;
use std::fmt;

/// Message reported when an in-flight load was cancelled
pub const ABORTED_MESSAGE: &str = "Aborted";

/// Message reported for every other load failure
pub const LOAD_FAILED_MESSAGE: &str = "Error loading Asset";

/// Why a handle ended up in [`AssetState::Error`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetFailure {
    /// The shared operation was cancelled (last reference released, or a
    /// type-wide abort)
    Aborted,
    /// Fetch, parse or instantiation failed. `detail` keeps the cause.
    LoadFailed { detail: String },
}

impl AssetFailure {
    /// User-visible message: `"Aborted"` or `"Error loading Asset"`
    pub fn message(&self) -> &'static str {
        match self {
            AssetFailure::Aborted => ABORTED_MESSAGE,
            AssetFailure::LoadFailed { .. } => LOAD_FAILED_MESSAGE,
        }
    }

    /// Underlying cause, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            AssetFailure::Aborted => None,
            AssetFailure::LoadFailed { detail } => Some(detail),
        }
    }
}

impl From<AssetError> for AssetFailure {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::Cancelled => AssetFailure::Aborted,
            other => AssetFailure::LoadFailed {
                detail: other.to_string(),
            },
        }
    }
}

impl fmt::Display for AssetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Observable lifecycle state of an asset handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetState {
    /// Waiting for the shared data
    Loading,
    /// Data resolved, instance under construction
    Creating,
    /// Instance available
    Ready,
    /// Handle released its reference
    Unloaded,
    Error(AssetFailure),
}

impl AssetState {
    /// Collapse independent handle facts into a state, highest priority first:
    /// error, unloaded, instance present, data present, otherwise loading.
    pub fn derive(
        error: Option<&AssetFailure>,
        unloaded: bool,
        has_instance: bool,
        has_data: bool,
    ) -> Self {
        if let Some(failure) = error {
            AssetState::Error(failure.clone())
        } else if unloaded {
            AssetState::Unloaded
        } else if has_instance {
            AssetState::Ready
        } else if has_data {
            AssetState::Creating
        } else {
            AssetState::Loading
        }
    }

    /// Lower-case state name
    pub fn name(&self) -> &'static str {
        match self {
            AssetState::Loading => "loading",
            AssetState::Creating => "creating",
            AssetState::Ready => "ready",
            AssetState::Unloaded => "unloaded",
            AssetState::Error(_) => "error",
        }
    }

    /// No load is in progress for this state
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AssetState::Ready | AssetState::Unloaded | AssetState::Error(_)
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AssetState::Ready)
    }

    pub fn failure(&self) -> Option<&AssetFailure> {
        match self {
            AssetState::Error(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_priority_exhaustive() {
        let failure = AssetFailure::Aborted;
        for error in [None, Some(&failure)] {
            for unloaded in [false, true] {
                for has_instance in [false, true] {
                    for has_data in [false, true] {
                        let state = AssetState::derive(error, unloaded, has_instance, has_data);
                        let expected = if error.is_some() {
                            "error"
                        } else if unloaded {
                            "unloaded"
                        } else if has_instance {
                            "ready"
                        } else if has_data {
                            "creating"
                        } else {
                            "loading"
                        };
                        assert_eq!(state.name(), expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_failure_messages() {
        assert_eq!(AssetFailure::from(AssetError::Cancelled).message(), "Aborted");

        let failed = AssetFailure::from(AssetError::Parse("bad json".into()));
        assert_eq!(failed.message(), "Error loading Asset");
        assert_eq!(failed.to_string(), "Error loading Asset");
        assert!(failed.detail().is_some_and(|d| d.contains("bad json")));
    }

    #[test]
    fn test_settled_states() {
        assert!(!AssetState::Loading.is_settled());
        assert!(!AssetState::Creating.is_settled());
        assert!(AssetState::Ready.is_settled());
        assert!(AssetState::Unloaded.is_settled());
        assert!(AssetState::Error(AssetFailure::Aborted).is_settled());
    }
}

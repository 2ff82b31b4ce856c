use crate::assets::state::AssetFailure;
use std::fmt;
use std::sync::Arc;

/// Trait for any event deliverable through a [`Watchable`](crate::watchable::Watchable)
pub trait Event: Send + Sync + 'static {
    /// Event name used for filtered subscriptions
    fn event_name(&self) -> &'static str;
}

/// Lifecycle events emitted by an asset handle
pub enum AssetEvent<D, I> {
    /// Shared data for the handle's key resolved
    DataLoad(Arc<D>),

    /// Handle created its private instance
    InstanceCreate {
        instance: Arc<I>,
        previous: Option<Arc<I>>,
    },

    /// Load failed or was aborted
    Error(AssetFailure),

    /// Handle released its reference
    Unload,
}

impl<D, I> AssetEvent<D, I> {
    /// Get the kind of this event
    pub fn kind(&self) -> AssetEventKind {
        match self {
            AssetEvent::DataLoad(_) => AssetEventKind::DataLoad,
            AssetEvent::InstanceCreate { .. } => AssetEventKind::InstanceCreate,
            AssetEvent::Error(_) => AssetEventKind::Error,
            AssetEvent::Unload => AssetEventKind::Unload,
        }
    }
}

impl<D: Send + Sync + 'static, I: Send + Sync + 'static> Event for AssetEvent<D, I> {
    fn event_name(&self) -> &'static str {
        self.kind().name()
    }
}

impl<D, I> Clone for AssetEvent<D, I> {
    fn clone(&self) -> Self {
        match self {
            AssetEvent::DataLoad(data) => AssetEvent::DataLoad(Arc::clone(data)),
            AssetEvent::InstanceCreate { instance, previous } => AssetEvent::InstanceCreate {
                instance: Arc::clone(instance),
                previous: previous.clone(),
            },
            AssetEvent::Error(failure) => AssetEvent::Error(failure.clone()),
            AssetEvent::Unload => AssetEvent::Unload,
        }
    }
}

impl<D, I> fmt::Debug for AssetEvent<D, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetEvent::Error(failure) => write!(f, "AssetEvent::Error({failure})"),
            AssetEvent::InstanceCreate { previous, .. } => write!(
                f,
                "AssetEvent::InstanceCreate {{ previous: {} }}",
                previous.is_some()
            ),
            other => write!(f, "AssetEvent({})", other.kind().name()),
        }
    }
}

/// Discriminant of [`AssetEvent`], used to filter subscriptions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetEventKind {
    DataLoad,
    InstanceCreate,
    Error,
    Unload,
}

impl AssetEventKind {
    /// Wire name of the event
    pub fn name(self) -> &'static str {
        match self {
            AssetEventKind::DataLoad => "data:load",
            AssetEventKind::InstanceCreate => "instance:create",
            AssetEventKind::Error => "error",
            AssetEventKind::Unload => "unload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let load: AssetEvent<u32, ()> = AssetEvent::DataLoad(Arc::new(7));
        assert_eq!(load.event_name(), "data:load");

        let failed: AssetEvent<u32, ()> = AssetEvent::Error(AssetFailure::Aborted);
        assert_eq!(failed.event_name(), "error");
        assert_eq!(failed.kind(), AssetEventKind::Error);

        assert_eq!(AssetEventKind::InstanceCreate.name(), "instance:create");
        assert_eq!(AssetEventKind::Unload.name(), "unload");
    }
}

//! In-process change feed
//!
//! Every backend publishes the records of a committed `insert` here; readers
//! subscribe with a filter and receive only what was committed afterwards.

use artifacts_common::Artifact;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::warn;

use crate::filter::ArtifactFilter;

/// Notifications buffered per subscriber before the oldest are dropped.
pub const CHANGE_FEED_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Artifact>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { sender }
    }

    /// Publish committed records. Having no subscribers is not an error.
    pub fn publish<'a>(&self, committed: impl IntoIterator<Item = &'a Artifact>) {
        if self.sender.receiver_count() == 0 {
            return;
        }
        for artifact in committed {
            let _ = self.sender.send(artifact.clone());
        }
    }

    pub fn subscribe(&self, filter: ArtifactFilter) -> BoxStream<'static, Artifact> {
        BroadcastStream::new(self.sender.subscribe())
            .filter_map(move |received| {
                let keep = match received {
                    Ok(artifact) if filter.matches(&artifact) => Some(artifact),
                    Ok(_) => None,
                    Err(BroadcastStreamRecvError::Lagged(missed)) => {
                        warn!(missed, "Change feed subscriber lagged; notifications dropped");
                        None
                    },
                };
                futures::future::ready(keep)
            })
            .boxed()
    }
}

//! Per-record screening before a write

use artifacts_common::Artifact;
use tracing::debug;

/// Attach identity problems to every invalid record and return how many
/// records remain writable.
///
/// Records that already carry problems were rejected upstream and are left
/// untouched. Nothing here aborts the batch.
pub(crate) fn screen(artifacts: &mut [Artifact]) -> usize {
    let mut writable = 0;

    for artifact in artifacts.iter_mut() {
        if artifact.is_rejected() {
            continue;
        }

        match artifact.id.validate() {
            Ok(()) => writable += 1,
            Err(error) => {
                debug!(artifact = %artifact.id, error = %error, "Rejected artifact identity");
                artifact.reject(error);
            },
        }
    }

    writable
}

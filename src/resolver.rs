//! Reference resolution - replaces markers with aliases to their targets.

use tracing::{debug, trace};

use crate::docs::{evaluate_uri, DocumentMap};
use crate::error::{DocsError, Result};
use crate::graph::{Graph, NodeId};
use crate::queue::RefQueue;

/// Resolve every queued reference.
///
/// References are taken in queue order. A reference whose marker was already
/// resolved (directly, or as a link of another reference's chain) is skipped.
/// A reference that fails with a not-found error is retried on the next pass;
/// the drain gives up once a whole pass makes no progress.
///
/// # Errors
///
/// Returns `DocsError::ReferenceLoop` as soon as a cycle of references is
/// found, or the first not-found error left when no further progress can be
/// made.
pub fn drain(graph: &mut Graph, docs: &DocumentMap, queue: &mut RefQueue) -> Result<()> {
    let mut pass = 0;
    loop {
        pass += 1;
        debug!(pass, pending = queue.len(), "draining references");

        let mut deferred = Vec::new();
        let mut progressed = false;
        while let Some(pending) = queue.pop() {
            if !graph.is_marker(pending.marker) {
                continue;
            }
            match resolve_marker(graph, docs, pending.marker, &mut Vec::new()) {
                Ok(()) => progressed = true,
                Err(err) if err.is_not_found() => {
                    trace!(target = %pending.target, %err, "deferring reference");
                    deferred.push((pending, err));
                }
                Err(err) => return Err(err),
            }
        }

        if deferred.is_empty() {
            return Ok(());
        }
        if !progressed {
            let (_, err) = deferred.swap_remove(0);
            return Err(err);
        }
        for (pending, _) in deferred {
            queue.requeue(pending);
        }
    }
}

/// Resolve one marker, following reference chains.
///
/// `chain` holds the markers visited by the current attempt.
fn resolve_marker(
    graph: &mut Graph,
    docs: &DocumentMap,
    marker: NodeId,
    chain: &mut Vec<NodeId>,
) -> Result<()> {
    let Some(target) = graph.marker_target(marker).cloned() else {
        return Ok(());
    };
    chain.push(marker);

    let resolved = loop {
        let found = evaluate_uri(graph, docs, &target, true)?;
        if !graph.is_marker(found) {
            break found;
        }
        if chain.contains(&found) {
            return Err(DocsError::ReferenceLoop {
                uri: target.to_string(),
            });
        }
        // Ref to ref, or a pointer running through an unresolved ref.
        resolve_marker(graph, docs, found, chain)?;
    };

    trace!(%target, "resolved reference");
    graph.alias(marker, resolved);
    chain.pop();
    Ok(())
}

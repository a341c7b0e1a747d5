//! The pass which brings every node up to date after a batch of edits.

use std::collections::HashSet;

use crate::buffer::TextBuffer;
use crate::tree::{Error, SnippetTree};

/// The number of sweeps over the tree before [`converge`] gives up
pub const DEFAULT_MAX_SWEEPS: usize = 10;

/// Repeatedly sweeps the tree (children before parents), settling every node which is able to,
/// until every node has settled.  Returns the number of sweeps that were needed.
///
/// Fails with [`Error::DidNotConverge`] if nodes are still waiting after `max_sweeps` sweeps, or
/// if a whole sweep passes without any node settling (which only happens when mirrors wait on
/// each other in a cycle).
pub fn converge(
    tree: &mut SnippetTree,
    buf: &mut impl TextBuffer,
    max_sweeps: usize,
) -> Result<usize, Error> {
    let mut done = HashSet::new();
    for sweep in 1..=max_sweeps {
        let mut progress = false;
        let mut waiting = false;
        for id in tree.postorder() {
            if done.contains(&id) || !tree.contains(id) {
                continue;
            }
            if tree.settle(id, buf, &mut done)? {
                progress = true;
            } else {
                waiting = true;
            }
        }

        if !waiting {
            log::debug!("Settled {} nodes in {} sweep(s)", done.len(), sweep);
            return Ok(sweep);
        }
        if !progress {
            log::debug!("No node settled in sweep {}", sweep);
            return Err(Error::DidNotConverge { sweeps: sweep });
        }
    }
    Err(Error::DidNotConverge { sweeps: max_sweeps })
}

//! Routing of [`EditCmd`]s to the node which should absorb them.

use std::collections::VecDeque;

use super::{Error, SnippetTree};
use crate::arena::NodeId;
use crate::edit::{EditCmd, EditKind};

/// What a container does with one command, decided by looking at its children
#[derive(Debug, Clone, Eq, PartialEq)]
enum Route {
    /// Hand the command to a child container
    Delegate(NodeId),
    /// Destroy a child (if any), then process `cmds` before anything else in the queue
    Requeue {
        kill: Option<NodeId>,
        cmds: Vec<EditCmd>,
    },
    /// No child wants the command, so this container absorbs it
    Absorb,
}

impl SnippetTree {
    /// Tells the tree that `cmd` has just been applied to the buffer.  The command enters at the
    /// root and is routed to the nodes it affects; afterwards every node's span matches the
    /// buffer again.  Leaves which the command landed inside are destroyed.
    pub fn dispatch(&mut self, cmd: &EditCmd) -> Result<(), Error> {
        self.dispatch_at(self.root, cmd)
    }

    /// Like [`SnippetTree::dispatch`], but the command enters at the container `id`.  Fails with
    /// [`Error::OutsideSpan`], changing nothing, if `cmd` doesn't fit inside that container.
    pub fn dispatch_at(&mut self, id: NodeId, cmd: &EditCmd) -> Result<(), Error> {
        cmd.validate()?;

        let node = self.get(id)?;
        if !node.is_container() {
            return Err(Error::NotAContainer(id));
        }
        let (start, end) = (node.start(), node.end());
        let pos = cmd.pos();
        let fits = match cmd.kind() {
            EditKind::Insert => start <= pos && pos <= end,
            EditKind::Delete => start <= pos && cmd.del_end() <= end,
        };
        if !fits {
            log::warn!("Rejecting {}: outside of {}..{}", cmd, start, end);
            return Err(Error::OutsideSpan {
                cmd: cmd.clone(),
                start,
                end,
            });
        }

        self.apply_within(id, cmd.clone())?;

        #[cfg(debug_assertions)]
        if let Err(e) = self.check_invariants() {
            log::error!("Tree is inconsistent after {}: {}", cmd, e);
        }
        Ok(())
    }

    /// Applies `cmd` inside the container `id`, whose span is known to contain it
    fn apply_within(&mut self, id: NodeId, cmd: EditCmd) -> Result<(), Error> {
        let mut queue = VecDeque::new();
        queue.push_back(cmd);
        while let Some(cmd) = queue.pop_front() {
            if cmd.is_empty() {
                continue;
            }
            match self.route(id, &cmd) {
                Route::Delegate(child) => {
                    log::trace!("{:?} passes {} to {:?}", id, cmd, child);
                    self.apply_within(child, cmd)?;
                }
                Route::Requeue { kill, cmds } => {
                    if let Some(child) = kill {
                        log::trace!("{} lands inside {:?}", cmd, child);
                        self.del_child(id, child)?;
                    }
                    for c in cmds.into_iter().rev() {
                        queue.push_front(c);
                    }
                }
                Route::Absorb => self.absorb(id, &cmd)?,
            }
        }
        Ok(())
    }

    /// Decides what the container `id` should do with `cmd`.  The first child which matches
    /// decides.
    fn route(&self, id: NodeId, cmd: &EditCmd) -> Route {
        let pos = cmd.pos();
        for &child_id in self.children(id) {
            let child = match self.node(child_id) {
                Some(child) => child,
                None => continue,
            };
            let (start, end) = (child.start(), child.end());
            let kill = || Route::Requeue {
                kill: Some(child_id),
                cmds: vec![cmd.clone()],
            };

            match cmd.kind() {
                EditKind::Insert => {
                    if child.is_leaf() && start < pos && pos < end {
                        return kill();
                    }
                    if child.is_container() && start <= pos && pos <= end {
                        return Route::Delegate(child_id);
                    }
                }
                EditKind::Delete => {
                    let del_end = cmd.del_end();
                    // Entirely inside the child
                    if start <= pos && pos < end && start < del_end && del_end <= end {
                        return if child.is_leaf() {
                            kill()
                        } else {
                            Route::Delegate(child_id)
                        };
                    }
                    // Removes the whole child
                    if (pos < start && end <= del_end) || (pos <= start && end < del_end) {
                        return kill();
                    }
                    // Line breaks can't be split
                    if cmd.is_line_break() {
                        continue;
                    }
                    // Overlaps the start of the child: the part before the child is ours
                    if pos < start && start < del_end && del_end <= end {
                        if let Some((mine, theirs)) = split(cmd, start.col - pos.col) {
                            return Route::Requeue {
                                kill: None,
                                cmds: vec![mine, theirs],
                            };
                        }
                    }
                    // Overlaps the end of the child: the part inside the child goes first
                    if start <= pos && pos < end && del_end >= end {
                        if let Some((theirs, mine)) = split(cmd, end.col - pos.col) {
                            return Route::Requeue {
                                kill: None,
                                cmds: vec![theirs, mine],
                            };
                        }
                    }
                }
            }
        }
        Route::Absorb
    }

    /// Grows or shrinks the container `id` to account for `cmd`, which none of its children took
    fn absorb(&mut self, id: NodeId, cmd: &EditCmd) -> Result<(), Error> {
        let node = self.get(id)?;
        if cmd.kind() == EditKind::Delete && node.start() == node.end() {
            log::trace!("{:?} is empty, so ignores {}", id, cmd);
            return Ok(());
        }

        let pos = cmd.pos();
        let idx = node.children().iter().rposition(|&c| {
            self.node(c)
                .map_or(false, |child| child.start() < pos && pos <= child.end())
        });
        log::trace!("{:?} absorbs {} (after child {:?})", id, cmd, idx);
        self.child_has_moved(id, idx, pos, cmd.delta());
        Ok(())
    }
}

/// Splits a command after `n` chars, unless that would leave one of the parts empty
fn split(cmd: &EditCmd, n: usize) -> Option<(EditCmd, EditCmd)> {
    if n == 0 || n >= cmd.len() {
        return None;
    }
    Some(cmd.split_at(n))
}

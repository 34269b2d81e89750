//! Linearization of the declaration tree into a river.
//!
//! Channels are packed back to back in a single pre-order walk, children in
//! declaration order, with no padding. The walk doubles as the rivulet pass:
//! since a node's descendants are visited contiguously, its rivulet starts
//! wherever the buffer ended when the walk entered its children, and spans
//! everything appended before the walk left them.
//!
//! The walk keeps an explicit stack, so path depth is bounded by memory
//! rather than by the thread's stack.

use std::sync::Arc;

use crate::link::{Binding, Link};
use crate::lock::SharedLock;
use crate::path::Path;
use crate::river::{ChannelLayout, River};
use crate::tree::{NodeId, Tree};

/// Offsets computed for one linked node.
struct Placement {
    link: Arc<Link>,
    channel_offset: Option<usize>,
    rivulet_offset: usize,
    rivulet_size: usize,
    lock: Option<SharedLock>,
}

/// One step of the layout walk.
enum Visit<'t> {
    /// First visit: place the node's own channel.
    Enter {
        id: NodeId,
        inherited: Option<&'t SharedLock>,
    },
    /// Every descendant is placed.
    Leave {
        id: NodeId,
        lock: Option<&'t SharedLock>,
        channel_offset: Option<usize>,
        rivulet_offset: usize,
    },
}

/// Lays out the tree below `root`, allocates the river and binds every link
/// currently held by the tree.
///
/// The tree's links and locks are detached afterwards, so laying it out again
/// produces an unrelated river.
pub(crate) fn build(tree: &mut Tree, root: NodeId) -> Arc<River> {
    let mut image = Vec::new();
    let mut channels = Vec::new();
    let mut placements = Vec::new();
    let mut components: Vec<String> = Vec::new();

    let mut stack = vec![Visit::Enter {
        id: root,
        inherited: None,
    }];
    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter { id, inherited } => {
                let node = tree.node(id);
                if id != root {
                    components.push(node.name.clone());
                }
                let lock = node.lock.as_ref().or(inherited);

                let channel_offset = node.channel.as_ref().map(|channel| {
                    let offset = image.len();
                    image.extend_from_slice(&channel.init);
                    channels.push(ChannelLayout {
                        path: Path {
                            components: components.clone(),
                        },
                        offset,
                        size: channel.size(),
                        type_name: channel.type_name,
                    });
                    offset
                });

                stack.push(Visit::Leave {
                    id,
                    lock,
                    channel_offset,
                    rivulet_offset: image.len(),
                });
                stack.extend(node.children.iter().rev().map(|child| Visit::Enter {
                    id: *child,
                    inherited: lock,
                }));
            }
            Visit::Leave {
                id,
                lock,
                channel_offset,
                rivulet_offset,
            } => {
                if id != root {
                    components.pop();
                }
                if let Some(link) = &tree.node(id).link {
                    placements.push(Placement {
                        link: link.clone(),
                        channel_offset,
                        rivulet_offset,
                        rivulet_size: image.len() - rivulet_offset,
                        lock: lock.cloned(),
                    });
                }
            }
        }
    }

    let river = Arc::new(River::new(image, channels));
    for placement in &placements {
        let bound = placement.link.bind(Binding {
            river: river.clone(),
            channel_offset: placement.channel_offset,
            rivulet_offset: placement.rivulet_offset,
            rivulet_size: placement.rivulet_size,
            lock: placement.lock.clone(),
        });
        debug_assert!(bound, "link was bound by an earlier build");
    }
    tree.detach_links();

    tracing::debug!(
        bytes = river.len(),
        channels = river.layout().len(),
        links = placements.len(),
        "built river"
    );
    river
}

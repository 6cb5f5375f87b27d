use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use parley_db::Database;
use parley_db::models::MessageFilter;
use parley_types::models::{Message, ThreadNode};

use crate::convert;
use crate::error::{Error, Result};

/// Parents per bulk query. Keeps each statement well under SQLite's bind-parameter limit.
const FRONTIER_BATCH: usize = 500;

/// Rebuilds reply trees with one bulk query per tree level.
pub struct ThreadAssembler {
    db: Arc<Database>,
}

impl ThreadAssembler {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load `root_id` and every message below it, then assemble the tree in memory.
    ///
    /// Descendants are fetched breadth-first: each round asks for all replies to the
    /// previous round's messages, so the number of queries follows the depth of the
    /// thread, not its size. Replies are ordered oldest first.
    pub fn build_tree(&self, root_id: Uuid) -> Result<ThreadNode> {
        let root_key = root_id.to_string();

        let (root, descendants, rounds) = self.db.with_conn(|r| {
            let root = r
                .get_message(&root_key)?
                .ok_or_else(|| Error::NotFound(format!("message {}", root_id)))?;

            let mut seen: HashSet<String> = HashSet::from([root.id.clone()]);
            let mut frontier = vec![root.id.clone()];
            let mut descendants = Vec::new();
            let mut rounds = 0;

            while !frontier.is_empty() {
                let mut next = Vec::new();
                for batch in frontier.chunks(FRONTIER_BATCH) {
                    for row in r.query_messages(&MessageFilter::ParentIn(batch))? {
                        if seen.insert(row.id.clone()) {
                            next.push(row.id.clone());
                            descendants.push(row);
                        }
                    }
                }
                rounds += 1;
                frontier = next;
            }

            Ok((root, descendants, rounds))
        })?;

        debug!(
            %root_id,
            replies = descendants.len(),
            rounds,
            "Thread loaded"
        );

        Ok(assemble(
            convert::message_from_row(root),
            descendants.into_iter().map(convert::message_from_row).collect(),
        ))
    }

    /// Thread roots, newest first. Replies are not loaded.
    pub fn list_roots(&self) -> Result<Vec<Message>> {
        let rows = self.db.with_conn(|r| r.query_messages(&MessageFilter::Roots))?;
        Ok(rows.into_iter().map(convert::message_from_row).collect())
    }

    pub fn get_message(&self, id: Uuid) -> Result<Message> {
        let key = id.to_string();
        self.db
            .with_conn(|r| r.get_message(&key))?
            .map(convert::message_from_row)
            .ok_or_else(|| Error::NotFound(format!("message {}", id)))
    }
}

/// Arena assembly: messages live in a flat vector and the tree is stitched together
/// through a parent -> child-index map. `descendants` must list siblings in reply order.
fn assemble(root: Message, descendants: Vec<Message>) -> ThreadNode {
    let mut children: HashMap<Uuid, Vec<usize>> = HashMap::new();
    for (idx, message) in descendants.iter().enumerate() {
        if let Some(parent_id) = message.parent_id {
            children.entry(parent_id).or_default().push(idx);
        }
    }

    let mut arena: Vec<Option<Message>> = descendants.into_iter().map(Some).collect();
    attach(root, &children, &mut arena)
}

fn attach(message: Message, children: &HashMap<Uuid, Vec<usize>>, arena: &mut [Option<Message>]) -> ThreadNode {
    let mut replies = Vec::new();
    if let Some(indices) = children.get(&message.id) {
        for &idx in indices {
            if let Some(child) = arena[idx].take() {
                replies.push(attach(child, children, arena));
            }
        }
    }
    ThreadNode { message, replies }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationPipeline;

    struct Fixture {
        db: Arc<Database>,
        pipeline: MutationPipeline,
        threads: ThreadAssembler,
        alice: Uuid,
        bob: Uuid,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Fixture {
            pipeline: MutationPipeline::new(db.clone()),
            threads: ThreadAssembler::new(db.clone()),
            db,
            alice: Uuid::new_v4(),
            bob: Uuid::new_v4(),
        }
    }

    fn contents(node: &ThreadNode) -> Vec<&str> {
        node.replies.iter().map(|n| n.message.content.as_str()).collect()
    }

    #[test]
    fn builds_replies_in_creation_order() {
        let f = fixture();
        let root = f.pipeline.send(f.alice, f.bob, "R", None).unwrap();
        let a = f.pipeline.send(f.bob, f.alice, "A", Some(root.id)).unwrap();
        f.pipeline.send(f.alice, f.bob, "B", Some(root.id)).unwrap();
        f.pipeline.send(f.alice, f.bob, "A1", Some(a.id)).unwrap();

        let tree = f.threads.build_tree(root.id).unwrap();
        assert_eq!(tree.message.id, root.id);
        assert_eq!(contents(&tree), ["A", "B"]);
        assert_eq!(contents(&tree.replies[0]), ["A1"]);
        assert!(tree.replies[1].replies.is_empty());
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn subtree_can_be_built_from_any_message() {
        let f = fixture();
        let root = f.pipeline.send(f.alice, f.bob, "R", None).unwrap();
        let a = f.pipeline.send(f.bob, f.alice, "A", Some(root.id)).unwrap();
        f.pipeline.send(f.alice, f.bob, "A1", Some(a.id)).unwrap();

        let subtree = f.threads.build_tree(a.id).unwrap();
        assert_eq!(subtree.message.content, "A");
        assert_eq!(contents(&subtree), ["A1"]);
    }

    #[test]
    fn query_count_follows_depth_not_width() {
        let f = fixture();
        let root = f.pipeline.send(f.alice, f.bob, "root", None).unwrap();
        let mut level = vec![root.id];
        // Three levels, each message with three replies: 39 descendants.
        for _ in 0..3 {
            let mut next = Vec::new();
            for parent in &level {
                for i in 0..3 {
                    next.push(f.pipeline.send(f.bob, f.alice, &format!("r{i}"), Some(*parent)).unwrap().id);
                }
            }
            level = next;
        }

        let before = f.db.statements_executed();
        let tree = f.threads.build_tree(root.id).unwrap();
        let statements = f.db.statements_executed() - before;

        assert_eq!(tree.len(), 1 + 3 + 9 + 27);
        // Root lookup, one query per populated level, one empty level to stop.
        assert_eq!(statements, 1 + 3 + 1);
    }

    #[test]
    fn missing_root_is_not_found() {
        let f = fixture();
        assert!(matches!(f.threads.build_tree(Uuid::new_v4()), Err(Error::NotFound(_))));
        assert!(matches!(f.threads.get_message(Uuid::new_v4()), Err(Error::NotFound(_))));
    }

    #[test]
    fn list_roots_is_shallow_and_newest_first() {
        let f = fixture();
        let first = f.pipeline.send(f.alice, f.bob, "first", None).unwrap();
        f.pipeline.send(f.bob, f.alice, "reply", Some(first.id)).unwrap();
        f.pipeline.send(f.bob, f.alice, "second", None).unwrap();

        let roots: Vec<_> = f
            .threads
            .list_roots()
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(roots, ["second", "first"]);
    }

    #[test]
    fn assemble_ignores_orphans() {
        let root = Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: "root".into(),
            edited: false,
            parent_id: None,
            created_at: convert::now(),
        };
        let orphan = Message {
            id: Uuid::new_v4(),
            parent_id: Some(Uuid::new_v4()),
            content: "orphan".into(),
            ..root.clone()
        };
        let reply = Message {
            id: Uuid::new_v4(),
            parent_id: Some(root.id),
            content: "reply".into(),
            ..root.clone()
        };

        let tree = assemble(root, vec![orphan, reply]);
        assert_eq!(contents(&tree), ["reply"]);
    }
}

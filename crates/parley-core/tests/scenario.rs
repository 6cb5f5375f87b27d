/// End-to-end conversation flows through the pipeline, assembler, inbox and cache,
/// all sharing one in-memory store.
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parley_core::{Error, Inbox, MutationPipeline, ThreadAssembler, ThreadCache};
use parley_db::Database;
use uuid::Uuid;

struct App {
    db: Arc<Database>,
    pipeline: MutationPipeline,
    threads: ThreadAssembler,
    inbox: Inbox,
    cache: ThreadCache,
}

fn app() -> App {
    let db = Arc::new(Database::open_in_memory().unwrap());
    App {
        pipeline: MutationPipeline::new(db.clone()),
        threads: ThreadAssembler::new(db.clone()),
        inbox: Inbox::new(db.clone()),
        cache: ThreadCache::new(),
        db,
    }
}

#[test]
fn alice_and_bob_conversation() {
    let app = app();
    let (alice, bob, carol) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    // Alice says hello; Bob has one unread notification.
    let hello = app.pipeline.send(alice, bob, "Hello", None).unwrap();
    let unread = app.inbox.notifications_for_user(bob, true).unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].message_id, hello.id);

    // Alice fixes her punctuation.
    let edited = app.pipeline.edit(hello.id, "Hello!", Some(alice)).unwrap();
    assert!(edited.edited);
    let history = app.pipeline.history(hello.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].old_content, "Hello");

    // Bob replies, Alice replies to Bob.
    let bob_reply = app.pipeline.send(bob, alice, "Hi Alice", Some(hello.id)).unwrap();
    let alice_reply = app.pipeline.send(alice, bob, "How are you?", Some(bob_reply.id)).unwrap();

    let tree = app.threads.build_tree(hello.id).unwrap();
    assert_eq!(tree.depth(), 3);
    assert_eq!(tree.message.content, "Hello!");
    assert_eq!(tree.replies.len(), 1);
    assert_eq!(tree.replies[0].message.id, bob_reply.id);
    assert_eq!(tree.replies[0].replies.len(), 1);
    assert_eq!(tree.replies[0].replies[0].message.id, alice_reply.id);

    // A separate thread between Alice and Carol, edited by Alice.
    let other = app.pipeline.send(alice, carol, "Lunch?", None).unwrap();
    app.pipeline.edit(other.id, "Lunch tomorrow?", Some(alice)).unwrap();

    // Bob deletes his account.
    let report = app.pipeline.delete_account(bob).unwrap();
    assert_eq!(report.notifications, 2);
    assert_eq!(report.history_entries, 0);
    // Bob's reply, plus the two messages addressed to him.
    assert_eq!(report.messages, 3);

    assert!(app.inbox.notifications_for_user(bob, false).unwrap().is_empty());
    // Every message in the Hello thread involved Bob, so the thread is gone with him.
    assert!(matches!(app.threads.build_tree(hello.id), Err(Error::NotFound(_))));
    assert!(app.inbox.notifications_for_user(alice, false).unwrap().is_empty());

    // Alice's thread with Carol is untouched, history included.
    let kept = app.threads.build_tree(other.id).unwrap();
    assert_eq!(kept.message.content, "Lunch tomorrow?");
    assert_eq!(app.pipeline.history(other.id).unwrap().len(), 1);
    assert_eq!(app.inbox.unread_for_user(carol).unwrap().len(), 1);

    // Running the cleanup again changes nothing.
    assert!(app.pipeline.delete_account(bob).unwrap().is_empty());
}

#[test]
fn history_survives_when_a_non_party_editor_is_removed() {
    let app = app();
    let (alice, bob, moderator) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let message = app.pipeline.send(alice, bob, "Hello", None).unwrap();
    app.pipeline.edit(message.id, "Hello!", Some(alice)).unwrap();
    app.pipeline.edit(message.id, "Hello!!", Some(moderator)).unwrap();

    let report = app.pipeline.delete_account(moderator).unwrap();
    assert_eq!(report.history_entries, 1);
    assert_eq!(report.messages, 0);

    let history = app.pipeline.history(message.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].editor_id, Some(alice));
    assert_eq!(app.inbox.unread_for_user(bob).unwrap().len(), 1);
}

#[test]
fn cached_thread_is_served_without_store_traffic_until_ttl() {
    let app = app();
    let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
    let ttl = Duration::from_millis(200);

    let root = app.pipeline.send(alice, bob, "R", None).unwrap();
    app.pipeline.send(bob, alice, "A", Some(root.id)).unwrap();

    let first = app.cache.get_or_build(&app.threads, root.id, ttl).unwrap();
    let statements = app.db.statements_executed();

    let second = app.cache.get_or_build(&app.threads, root.id, ttl).unwrap();
    assert_eq!(*first, *second);
    assert_eq!(app.db.statements_executed(), statements);

    // A new reply stays invisible while the entry is fresh.
    app.pipeline.send(alice, bob, "B", Some(root.id)).unwrap();
    let stale = app.cache.get_or_build(&app.threads, root.id, ttl).unwrap();
    assert_eq!(stale.replies.len(), 1);

    thread::sleep(ttl + Duration::from_millis(100));

    let before = app.db.statements_executed();
    let fresh = app.cache.get_or_build(&app.threads, root.id, ttl).unwrap();
    assert!(app.db.statements_executed() > before);
    let replies: Vec<_> = fresh.replies.iter().map(|n| n.message.content.as_str()).collect();
    assert_eq!(replies, ["A", "B"]);
}

#[test]
fn cache_miss_for_unknown_root_is_not_found() {
    let app = app();
    let result = app.cache.get_or_build(&app.threads, Uuid::new_v4(), Duration::from_secs(60));
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(app.cache.is_empty());
}

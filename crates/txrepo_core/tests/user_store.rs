use std::thread;
use std::time::Instant;
use tempfile::TempDir;
use txrepo_core::{CallContext, Database, ErrorKind, User, UserStore};
use uuid::Uuid;

fn memory_store() -> UserStore {
    UserStore::new(Database::open_in_memory().unwrap())
}

fn file_store() -> (TempDir, UserStore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("users.db")).unwrap();
    (dir, UserStore::new(db))
}

#[test]
fn create_then_find_returns_same_values() {
    let store = memory_store();
    let ctx = CallContext::background();

    let created = store.create_user(&ctx, "Ada", "ada@example.com").unwrap();
    let loaded = store.find_user(&ctx, created.id).unwrap();

    assert_eq!(loaded.id, created.id);
    assert_eq!(loaded.name, "Ada");
    assert_eq!(loaded.email, "ada@example.com");
}

#[test]
fn conditional_update_never_changes_identifier() {
    let store = memory_store();
    let ctx = CallContext::background();

    let created = store.create_user(&ctx, "Ada", "ada@example.com").unwrap();
    assert!(!created.id.is_nil());

    let updated = store
        .update_user_transactionally(&ctx, created.id, "Ada L.", "ada@lovelace.dev")
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(store.find_user(&ctx, created.id).unwrap().id, created.id);
}

#[test]
fn existing_user_is_updated_transactionally() {
    let store = memory_store();
    let ctx = CallContext::background();

    let user = store.create_user(&ctx, "Bob", "b@x.com").unwrap();
    assert!(store.user_exists(&ctx, user.id).unwrap());

    let updated = store
        .update_user_transactionally(&ctx, user.id, "Robert", "r@x.com")
        .unwrap();
    assert_eq!(updated, User::with_id(user.id, "Robert", "r@x.com"));
    assert_eq!(store.find_user(&ctx, user.id).unwrap(), updated);
}

#[test]
fn updating_missing_user_fails_and_writes_nothing() {
    let store = memory_store();
    let ctx = CallContext::background();
    store.create_user(&ctx, "Ada", "ada@example.com").unwrap();
    let before = store.find_users(&ctx).unwrap();

    let missing = Uuid::new_v4();
    let err = store
        .update_user_transactionally(&ctx, missing, "X", "y@z.com")
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(err.user_id(), Some(missing));
    assert_eq!(err.operation(), "update_user_transactionally");
    assert!(!store.user_exists(&ctx, missing).unwrap());
    assert_eq!(store.find_users(&ctx).unwrap(), before);
}

#[test]
fn failed_update_step_leaves_previous_values() {
    let store = memory_store();
    let ctx = CallContext::background();
    let user = store.create_user(&ctx, "Ada", "ada@example.com").unwrap();

    store
        .database()
        .connect()
        .unwrap()
        .execute_batch(
            "CREATE TRIGGER reject_boom AFTER UPDATE ON users
             WHEN NEW.name = 'boom'
             BEGIN
                 SELECT RAISE(ABORT, 'update rejected');
             END;",
        )
        .unwrap();

    let err = store
        .update_user_transactionally(&ctx, user.id, "boom", "boom@example.com")
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    assert_eq!(store.find_user(&ctx, user.id).unwrap(), user);
}

#[test]
fn find_users_on_empty_storage_is_empty() {
    let store = memory_store();

    let users = store.find_users(&CallContext::background()).unwrap();
    assert!(users.is_empty());
}

#[test]
fn find_missing_user_is_not_found_with_context() {
    let store = memory_store();
    let missing = Uuid::new_v4();

    let err = store
        .find_user(&CallContext::background(), missing)
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains(&missing.to_string()));
}

#[test]
fn cancelled_context_aborts_before_touching_storage() {
    let store = memory_store();
    let ctx = CallContext::background();
    ctx.cancel_handle().cancel();

    let err = store.create_user(&ctx, "Ada", "ada@example.com").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    let expired = CallContext::with_deadline(Instant::now());
    let err = store
        .update_user_transactionally(&expired, Uuid::new_v4(), "X", "y@z.com")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    assert!(store
        .find_users(&CallContext::background())
        .unwrap()
        .is_empty());
}

#[test]
fn concurrent_creates_are_independent() {
    let (_dir, store) = file_store();

    let (first, second) = thread::scope(|scope| {
        let first = scope.spawn(|| {
            store
                .create_user(&CallContext::background(), "Ada", "ada@example.com")
                .unwrap()
        });
        let second = scope.spawn(|| {
            store
                .create_user(&CallContext::background(), "Bob", "b@x.com")
                .unwrap()
        });
        (first.join().unwrap(), second.join().unwrap())
    });

    assert_ne!(first.id, second.id);
    let ctx = CallContext::background();
    assert_eq!(store.find_user(&ctx, first.id).unwrap(), first);
    assert_eq!(store.find_user(&ctx, second.id).unwrap(), second);
}

#[test]
fn concurrent_conditional_updates_on_different_users_all_apply() {
    let (_dir, store) = file_store();
    let ctx = CallContext::background();
    let users: Vec<User> = (0..6)
        .map(|n| {
            store
                .create_user(&ctx, format!("user-{n}"), format!("u{n}@x.com"))
                .unwrap()
        })
        .collect();

    thread::scope(|scope| {
        for user in &users {
            let store = &store;
            scope.spawn(move || {
                store
                    .update_user_transactionally(
                        &CallContext::background(),
                        user.id,
                        format!("{}-renamed", user.name),
                        user.email.clone(),
                    )
                    .unwrap();
            });
        }
    });

    for user in &users {
        let loaded = store.find_user(&ctx, user.id).unwrap();
        assert_eq!(loaded.name, format!("{}-renamed", user.name));
        assert_eq!(loaded.email, user.email);
    }
    assert_eq!(store.find_users(&ctx).unwrap().len(), users.len());
}

#[test]
fn concurrent_calls_on_in_memory_store_all_succeed() {
    let store = memory_store();
    let ctx = CallContext::background();
    let users: Vec<User> = (0..16)
        .map(|n| {
            store
                .create_user(&ctx, format!("user-{n}"), format!("u{n}@x.com"))
                .unwrap()
        })
        .collect();
    let seeded = users.len();

    thread::scope(|scope| {
        for user in &users {
            let store = &store;
            scope.spawn(move || {
                let ctx = CallContext::background();
                store
                    .update_user_transactionally(
                        &ctx,
                        user.id,
                        format!("{}-renamed", user.name),
                        user.email.clone(),
                    )
                    .unwrap();
                store
                    .create_user(&ctx, format!("{}-twin", user.name), user.email.clone())
                    .unwrap();
                assert!(store.find_users(&ctx).unwrap().len() >= seeded);
            });
        }
    });

    for user in &users {
        let loaded = store.find_user(&ctx, user.id).unwrap();
        assert_eq!(loaded.name, format!("{}-renamed", user.name));
    }
    assert_eq!(store.find_users(&ctx).unwrap().len(), users.len() * 2);
}

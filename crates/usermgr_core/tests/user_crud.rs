use std::collections::HashSet;
use usermgr_core::{
    ConnectionConfig, ConnectionFactory, DbError, RepoError, SqliteUserRepository, User,
    UserRepository, UserService,
};

fn memory_factory() -> ConnectionFactory {
    ConnectionFactory::with_config(ConnectionConfig::in_memory())
}

#[test]
fn save_assigns_id_and_timestamp_and_roundtrips() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let saved = repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    let id = saved.id.expect("save should assign an id");
    assert!(saved.created_at.is_some());

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn find_by_unknown_id_is_absent_not_an_error() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    assert!(repo.find_by_id(12345).unwrap().is_none());
    assert!(repo.try_find_by_id(12345).unwrap().is_none());
}

#[test]
fn find_all_returns_every_saved_user() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let alice = repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    let bob = repo.save(User::new("Bob", "bob@x.com", 31)).unwrap();

    let users = repo.find_all().unwrap();
    assert_eq!(users.len(), 2);
    let ids: HashSet<_> = users.iter().map(|user| user.id).collect();
    assert_eq!(ids, HashSet::from([alice.id, bob.id]));
    assert!(users.contains(&alice));
    assert!(users.contains(&bob));
}

#[test]
fn repeated_identical_update_leaves_same_stored_record() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let mut user = repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    user.email = "alice@y.com".to_string();

    repo.update(user.clone()).unwrap();
    let after_once = repo.find_by_id(user.id.unwrap()).unwrap().unwrap();
    repo.update(user.clone()).unwrap();
    let after_twice = repo.find_by_id(user.id.unwrap()).unwrap().unwrap();

    assert_eq!(after_once, after_twice);
    assert_eq!(after_twice.email, "alice@y.com");
}

#[test]
fn update_keeps_unchanged_fields_and_creation_timestamp() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let saved = repo.save(User::new("Carol", "carol@x.com", 30)).unwrap();
    let id = saved.id.unwrap();

    let mut edited = repo.find_by_id(id).unwrap().unwrap();
    edited.age = 31;
    edited.created_at = None;
    repo.update(edited).unwrap();

    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.name, "Carol");
    assert_eq!(loaded.email, "carol@x.com");
    assert_eq!(loaded.age, 31);
    assert_eq!(loaded.created_at, saved.created_at);
}

#[test]
fn delete_removes_user_and_service_delete_is_then_a_no_op() {
    let factory = memory_factory();
    let service = UserService::new(SqliteUserRepository::new(&factory));

    let saved = service.save(User::new("Dave", "dave@x.com", 40)).unwrap();
    let id = saved.id.unwrap();

    service.repository().delete(saved).unwrap();
    assert!(service.find_by_id(id).unwrap().is_none());

    assert!(!service.delete(id).unwrap());
}

#[test]
fn service_delete_by_id_removes_existing_user() {
    let factory = memory_factory();
    let service = UserService::new(SqliteUserRepository::new(&factory));

    let id = service
        .save(User::new("Erin", "erin@x.com", 22))
        .unwrap()
        .id
        .unwrap();

    assert!(service.delete(id).unwrap());
    assert!(service.find_all().unwrap().is_empty());
}

#[test]
fn constraint_violation_rolls_back_and_propagates() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    let err = repo.save(User::new("Alice Again", "alice@x.com", 26)).unwrap_err();

    assert!(matches!(err, RepoError::Db(DbError::Sqlite(_))));
    assert!(!err.is_fatal());
    let users = repo.find_all().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].name, "Alice");
}

#[test]
fn failed_update_rolls_back_whole_change() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    let mut bob = repo.save(User::new("Bob", "bob@x.com", 31)).unwrap();
    bob.name = "Robert".to_string();
    bob.email = "alice@x.com".to_string();

    let err = repo.update(bob.clone()).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));

    let stored = repo.find_by_id(bob.id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.name, "Bob");
    assert_eq!(stored.email, "bob@x.com");
}

#[test]
fn write_preconditions_are_reported() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let saved = repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    let err = repo.save(saved.clone()).unwrap_err();
    assert!(matches!(err, RepoError::AlreadyPersisted(id) if Some(id) == saved.id));

    let unsaved = User::new("Ghost", "ghost@x.com", 1);
    assert!(matches!(
        repo.update(unsaved.clone()).unwrap_err(),
        RepoError::MissingId
    ));
    assert!(matches!(repo.delete(unsaved).unwrap_err(), RepoError::MissingId));

    let mut stale = saved.clone();
    stale.id = Some(9999);
    assert!(matches!(
        repo.update(stale.clone()).unwrap_err(),
        RepoError::NotFound(9999)
    ));
    assert!(matches!(
        repo.delete(stale).unwrap_err(),
        RepoError::NotFound(9999)
    ));
}

#[test]
fn save_accepts_any_unsaved_user() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let unusual = [
        User::default(),
        User::new("Zed", "zed", 40),
        User::new("Neg", "n@x.com", -1),
    ];
    for user in unusual {
        let saved = repo.save(user.clone()).unwrap();
        let id = saved.id.expect("save should assign an id");
        assert!(saved.created_at.is_some());

        let loaded = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.name, user.name);
        assert_eq!(loaded.email, user.email);
        assert_eq!(loaded.age, user.age);
    }
    assert_eq!(repo.find_all().unwrap().len(), 3);
}

#[test]
fn update_accepts_any_field_values() {
    let factory = memory_factory();
    let repo = SqliteUserRepository::new(&factory);

    let mut user = repo.save(User::new("Alice", "alice@x.com", 25)).unwrap();
    user.name = String::new();
    user.age = -5;
    repo.update(user.clone()).unwrap();

    let loaded = repo.find_by_id(user.id.unwrap()).unwrap().unwrap();
    assert_eq!(loaded, user);
}

#[test]
fn file_storage_survives_factory_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.db");

    let id = {
        let factory = ConnectionFactory::with_config(ConnectionConfig::file(&path));
        let repo = SqliteUserRepository::new(&factory);
        repo.save(User::new("Alice", "alice@x.com", 25))
            .unwrap()
            .id
            .unwrap()
    };

    let factory = ConnectionFactory::with_config(ConnectionConfig::file(&path));
    let repo = SqliteUserRepository::new(&factory);
    let loaded = repo.find_by_id(id).unwrap().unwrap();
    assert_eq!(loaded.email, "alice@x.com");
}

#[test]
fn user_serializes_with_storage_fields() {
    let user = User {
        id: Some(7),
        created_at: Some(1_700_000_000_000),
        ..User::new("Alice", "alice@x.com", 25)
    };

    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value["id"], 7);
    assert_eq!(value["created_at"], 1_700_000_000_000_i64);
    assert_eq!(value["name"], "Alice");
}

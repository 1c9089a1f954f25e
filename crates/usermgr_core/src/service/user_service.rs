//! User use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for driver layers.
//! - Compose delete-by-id from a lookup and a delete.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Service layer remains storage-agnostic.
//! - `delete` spans two units of work; a concurrent delete between them
//!   surfaces as the repository's `NotFound`.

use crate::model::user::{User, UserId};
use crate::repo::user_repo::{RepoResult, UserRepository};

/// Use-case service wrapper for user operations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.find_by_id(id)
    }

    pub fn find_all(&self) -> RepoResult<Vec<User>> {
        self.repo.find_all()
    }

    pub fn save(&self, user: User) -> RepoResult<User> {
        self.repo.save(user)
    }

    pub fn update(&self, user: User) -> RepoResult<User> {
        self.repo.update(user)
    }

    /// Deletes the user with `id` if it exists.
    ///
    /// Returns `Ok(false)` without touching storage further when the user is
    /// absent.
    pub fn delete(&self, id: UserId) -> RepoResult<bool> {
        match self.repo.find_by_id(id)? {
            Some(user) => {
                self.repo.delete(user)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::UserService;
    use crate::model::user::{User, UserId};
    use crate::repo::user_repo::{RepoError, RepoResult, UserRepository};
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    #[derive(Default)]
    struct InMemoryRepo {
        rows: RefCell<BTreeMap<UserId, User>>,
        deletes: RefCell<Vec<UserId>>,
    }

    impl UserRepository for InMemoryRepo {
        fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
            Ok(self.rows.borrow().get(&id).cloned())
        }

        fn find_all(&self) -> RepoResult<Vec<User>> {
            Ok(self.rows.borrow().values().cloned().collect())
        }

        fn save(&self, mut user: User) -> RepoResult<User> {
            let id = self.rows.borrow().len() as UserId + 1;
            user.id = Some(id);
            user.created_at = Some(0);
            self.rows.borrow_mut().insert(id, user.clone());
            Ok(user)
        }

        fn update(&self, user: User) -> RepoResult<User> {
            let id = user.id.ok_or(RepoError::MissingId)?;
            self.rows.borrow_mut().insert(id, user.clone());
            Ok(user)
        }

        fn delete(&self, user: User) -> RepoResult<()> {
            let id = user.id.ok_or(RepoError::MissingId)?;
            self.deletes.borrow_mut().push(id);
            self.rows
                .borrow_mut()
                .remove(&id)
                .map(|_| ())
                .ok_or(RepoError::NotFound(id))
        }
    }

    #[test]
    fn delete_by_id_removes_existing_user() {
        let service = UserService::new(InMemoryRepo::default());
        let saved = service.save(User::new("Alice", "alice@x.com", 25)).unwrap();
        let id = saved.id.unwrap();

        assert!(service.delete(id).unwrap());
        assert!(service.find_by_id(id).unwrap().is_none());
        assert_eq!(*service.repository().deletes.borrow(), vec![id]);
    }

    #[test]
    fn delete_by_id_of_absent_user_is_a_no_op() {
        let service = UserService::new(InMemoryRepo::default());

        assert!(!service.delete(42).unwrap());
        assert!(service.repository().deletes.borrow().is_empty());
    }

    #[test]
    fn delegates_reads_and_writes_unchanged() {
        let service = UserService::new(InMemoryRepo::default());
        let mut saved = service.save(User::new("Bob", "bob@x.com", 31)).unwrap();
        saved.age = 32;

        let updated = service.update(saved.clone()).unwrap();
        assert_eq!(updated, saved);
        assert_eq!(service.find_all().unwrap(), vec![saved]);
    }
}

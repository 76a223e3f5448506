//! Data access, one repository per table.

pub mod lock_repo;
pub mod user_repo;

pub use lock_repo::LockRepo;
pub use user_repo::UserRepo;

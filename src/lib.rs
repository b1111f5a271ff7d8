// Library exports
pub mod config;
pub mod hasher;
pub mod manager;
pub mod models;
pub mod storage;

pub use config::{ManagerConfig, StorageConfig};
pub use hasher::{BcryptHasher, CredentialHasher};
pub use manager::{SessionError, SessionManager};
pub use models::{Session, User};

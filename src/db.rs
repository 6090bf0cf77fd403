pub mod blob_store;
pub use blob_store::{BlobStore, FsBlobStore};
pub mod signup_repo;
pub use signup_repo::{SignupRepository, SignupStore};
pub mod subscription_repo;
pub use subscription_repo::{SubscriptionRepository, SubscriptionStore};

#[cfg(test)]
pub mod memory_store;

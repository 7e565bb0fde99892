//! Reference [`SubscriptionStore`](crate::core::subscription::SubscriptionStore)
//! implementations.

pub mod disk;
pub mod memory;

pub use disk::FjallSubscriptionStore;
pub use memory::MemorySubscriptionStore;

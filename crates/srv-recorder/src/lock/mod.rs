//! Leadership lock.
//!
//! One fixed key in the Lease Store is the leadership token. Mutual exclusion
//! comes entirely from the store's compare-and-swap acquire on that key.

mod coordinator;

pub use coordinator::{LockCoordinator, lock_key};

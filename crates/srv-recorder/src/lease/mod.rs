//! Lease lifecycle.
//!
//! A lease is minted by the Lease Store, cached on local disk so a restarted
//! process can try to reuse it, and always revalidated before use.

mod cache;
mod manager;

pub use cache::LeaseCache;
pub use manager::LeaseManager;

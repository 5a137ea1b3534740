//! Test helpers: an in-memory recording backend and small fixtures.
//!
//! Run from workspace root: `cargo test -p stowage-storage --test facade_test`.

pub mod fixtures;
pub mod mock;

use std::sync::Arc;

use stowage_storage::{NamingRuleSet, StorageFacade};

pub use mock::{Call, MockBackend, MockOp};

/// Facade over a fresh mock backend, returning both.
pub fn mock_facade(rules: NamingRuleSet) -> (StorageFacade, Arc<MockBackend>) {
    let backend = Arc::new(MockBackend::new());
    let facade = StorageFacade::new(backend.clone(), rules);
    (facade, backend)
}

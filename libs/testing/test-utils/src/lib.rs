//! Shared test utilities for the schema and domain crates
//!
//! This crate provides reusable test infrastructure:
//! - `TestCassandra`: single-node Cassandra container with automatic cleanup (feature: "cassandra")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `cassandra` (default): Enables Cassandra test infrastructure
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestCassandra, TestDataBuilder};
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_cassandra_test() {
//!     let cassandra = TestCassandra::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let keyspace = builder.keyspace("videos");
//!     let email = builder.email("owner");
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "cassandra")]
mod cassandra;

#[cfg(feature = "cassandra")]
pub use cassandra::TestCassandra;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_add_comment");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a deterministic UUID, distinct per `salt`
    pub fn uuid(&self, salt: u64) -> Uuid {
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&self.seed.to_le_bytes());
        uuid_bytes[8..16].copy_from_slice(&(self.seed ^ salt).to_le_bytes());
        Uuid::from_bytes(uuid_bytes)
    }

    /// Generate a unique user ID for testing
    pub fn user_id(&self) -> Uuid {
        self.uuid(0)
    }

    /// Generate a unique video ID for testing
    pub fn video_id(&self) -> Uuid {
        self.uuid(1)
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(12345);
    /// assert_eq!(builder.name("file", "main"), "test-file-12345-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Generate a unique email address for testing
    pub fn email(&self, local: &str) -> String {
        format!("{}.{}@killrvideo.test", local, self.seed)
    }

    /// Generate a keyspace name that is a valid CQL identifier
    ///
    /// Tests that provision into their own keyspace can share one container.
    pub fn keyspace(&self, prefix: &str) -> String {
        format!("test_{}_{}", prefix, self.seed)
    }
}

/// Test assertion helpers
pub mod assertions {
    use uuid::Uuid;

    /// Assert that two UUIDs are equal with a nice error message
    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(
            actual, expected,
            "{}: expected UUID {}, got {}",
            context, expected, actual
        );
    }

    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that a sequence is sorted newest first by `key`
    pub fn assert_descending<T, K: PartialOrd + std::fmt::Debug>(
        items: &[T],
        key: impl Fn(&T) -> K,
        context: &str,
    ) {
        for pair in items.windows(2) {
            let (a, b) = (key(&pair[0]), key(&pair[1]));
            assert!(a >= b, "{}: {:?} sorted before {:?}", context, a, b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.user_id(), builder2.user_id());
        assert_eq!(builder1.name("file", "test"), builder2.name("file", "test"));
    }

    #[test]
    fn test_data_builder_from_name() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.user_id(), builder2.user_id());
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.user_id(), builder2.user_id());
    }

    #[test]
    fn test_ids_differ_by_salt() {
        let builder = TestDataBuilder::new(7);
        assert_ne!(builder.user_id(), builder.video_id());
    }

    #[test]
    fn test_keyspace_is_identifier_shaped() {
        let keyspace = TestDataBuilder::new(u64::MAX).keyspace("comments");
        assert!(keyspace.len() <= 48);
        assert!(keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert!(keyspace.starts_with("test_"));
    }

    #[test]
    fn test_assert_descending() {
        assertions::assert_descending(&[3, 2, 2, 1], |v| *v, "numbers");
    }
}

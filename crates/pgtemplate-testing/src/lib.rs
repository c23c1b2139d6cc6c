//! # pgtemplate-testing
//!
//! Test infrastructure for the pgtemplate connection providers.
//!
//! ## Features
//!
//! - PostgreSQL container management via testcontainers
//! - Connection string helpers for pointing a base string at another database
//! - Unique database names for tests that run in parallel
//!
//! ## Container Example
//!
//! ```rust,ignore
//! use pgtemplate_testing::PostgresContainer;
//! use testcontainers::runners::AsyncRunner;
//!
//! #[tokio::test]
//! async fn test_with_real_server() {
//!     let image = PostgresContainer::default();
//!     let password = image.password.clone();
//!     let container = image.start().await.unwrap();
//!     let port = container.get_host_port_ipv4(5432).await.unwrap();
//!     let url = PostgresContainer::connection_string("127.0.0.1", port, &password);
//!     // Connect to url...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod fixtures;

pub use container::PostgresContainer;
pub use fixtures::{replace_database_in_connection_string, unique_database_name};

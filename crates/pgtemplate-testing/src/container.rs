//! PostgreSQL container support via testcontainers.

use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// Port PostgreSQL listens on inside the container.
pub const POSTGRES_PORT: u16 = 5432;

/// PostgreSQL container image.
///
/// Uses the official `postgres` image with the default `postgres` superuser.
#[derive(Debug, Clone)]
pub struct PostgresContainer {
    /// Password of the `postgres` superuser.
    pub password: String,
    /// Container tag (version).
    pub tag: String,
}

impl Default for PostgresContainer {
    fn default() -> Self {
        Self {
            password: "password".to_string(),
            tag: "16-alpine".to_string(),
        }
    }
}

impl PostgresContainer {
    /// Create a new PostgreSQL container configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the superuser password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the container tag (PostgreSQL version).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Connection string for the `postgres` database on a started container.
    #[must_use]
    pub fn connection_string(host: &str, port: u16, password: &str) -> String {
        format!("postgres://postgres:{password}@{host}:{port}/postgres?sslmode=disable")
    }
}

impl Image for PostgresContainer {
    fn name(&self) -> &str {
        "postgres"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        )]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<
        Item = (
            impl Into<std::borrow::Cow<'_, str>>,
            impl Into<std::borrow::Cow<'_, str>>,
        ),
    > {
        vec![
            ("POSTGRES_USER", "postgres"),
            ("POSTGRES_PASSWORD", self.password.as_str()),
            ("POSTGRES_DB", "postgres"),
        ]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(POSTGRES_PORT)]
    }
}

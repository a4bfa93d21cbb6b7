//! Table definition for contact submissions
//!
//! The service does not migrate schemas. This DDL is printed by
//! `contactbox schema` and applied on request with `serve --init-schema`.

/// Contacts live in the `users` table.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    comments TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS users_created_at_idx ON users (created_at DESC);
"#;

//! CLI subcommand implementations.

pub mod migrate;
pub mod orders;

/// Read a database URL, falling back to the generic `DATABASE_URL`.
fn database_url(primary_key: &'static str) -> Option<String> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

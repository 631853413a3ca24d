mod file_repository;
#[cfg(test)]
mod memory;
mod pg_file_repository;

pub use file_repository::{FileRepository, SaveOutcome};
#[cfg(test)]
pub use memory::InMemoryFileRepository;
pub use pg_file_repository::PgFileRepository;

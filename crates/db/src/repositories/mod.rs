//! PostgreSQL implementations of the store traits.

pub mod category_repo;
pub mod poster_repo;

pub use category_repo::CategoryRepo;
pub use poster_repo::PosterRepo;

pub mod audit;
pub mod postgres_repository;
pub mod session;
pub mod trip;
pub mod user;
pub mod visa;

pub mod account_repo;
pub mod post_repo;

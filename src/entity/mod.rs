//! SeaORM entity definitions for PostgreSQL database.

pub mod attachment;
pub mod execution;
pub mod platform_test_case;
pub mod project;
pub mod run_session;
pub mod suite;
pub mod suite_test_case;
pub mod test_case;

//! Test case manager library.
//!
//! Catalog of projects, test cases and suites; run sessions with per-test
//! step tracking; image evidence in S3; reports over finished runs.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod repository;
pub mod services;

//! Common library for the SehatMart backend
//!
//! This crate provides the infrastructure shared by the API service:
//! PostgreSQL connection pooling and the database error types.

pub mod database;
pub mod error;

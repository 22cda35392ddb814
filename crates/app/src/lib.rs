//! PostgreSQL-backed storefront services and the checkout workflow.

pub mod config;
pub mod context;
pub mod database;
pub mod domain;
pub mod observability;

#[cfg(test)]
mod test;

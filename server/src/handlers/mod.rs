//! HTTP handlers

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod pages;
pub mod profile;
pub mod recovery;
pub mod stats;

#[cfg(test)]
mod tests;

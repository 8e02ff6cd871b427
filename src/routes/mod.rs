//! Route modules for Traductor Server

pub mod documents;
pub mod health;

//! JSON request handlers, one module per resource.

pub mod health;
pub mod identities;
pub mod registrations;

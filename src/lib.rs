pub mod bootstrap;
pub mod config;
pub mod error;
pub mod model;
pub mod repo;
pub mod seed;
pub mod session;
pub mod supabase;
pub mod upload;

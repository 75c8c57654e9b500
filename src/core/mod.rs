//! Core module - Device state, stores, context, events and configuration

pub mod adapter;
pub mod config;
pub mod context;
pub mod events;
pub mod state;
pub mod store;

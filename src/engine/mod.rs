//! # Engine Module
//!
//! Internal ECS engine implementation.
//!
//! This module contains all core ECS building blocks such as:
//! - Component type registration and aspects
//! - Entity management and component storage
//! - Filters, iterator strategies and views
//! - Systems and scheduling
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod component;
pub mod aspect;
pub mod entity;
pub mod storage;
pub mod listener;
pub mod commands;
pub mod manager;
pub mod filter;
pub mod iterator;
pub mod view;
pub mod systems;
pub mod scheduler;

//! Wallet Rewards Recommendation API Library
//!
//! This library provides the core functionality for the Wallet Rewards API:
//! the reward scoring and recommendation engine, the clients for its external
//! collaborators (wallet service, nearby-place lookup, optional LLM-backed
//! explanations), and the HTTP handlers around them.
//!
//! # Modules
//!
//! - `cache`: Checksum-sealed cache entries.
//! - `category`: Category normalization onto the canonical category set.
//! - `config`: Configuration management.
//! - `engine`: Reward calculator, card ranker, and batch aggregator.
//! - `errors`: Error handling types.
//! - `explain`: Best-effort recommendation explanations.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `services`: External service clients (wallet, location lookup).

pub mod cache;
pub mod category;
pub mod config;
pub mod engine;
pub mod errors;
pub mod explain;
pub mod handlers;
pub mod models;
pub mod services;

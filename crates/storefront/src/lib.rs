//! Boutique Storefront library.
//!
//! Client-side building blocks for the Boutique shop: a REST API client,
//! login and session handling, a cached product catalogue, and the cart
//! service that keeps the local cart in sync with the server.
//!
//! # Modules
//!
//! - [`api`] - HTTP client for the Boutique REST API
//! - [`auth`] - Login, signup and the shared [`auth::Session`]
//! - [`catalog`] - Product, category and brand listings with caching
//! - [`cart`] - Optimistic cart state and multi-cart workflow
//! - [`state`] - [`state::AppState`], which wires everything together

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;

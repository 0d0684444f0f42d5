//! Client core for the HopeSwap marketplace: optimistic chat sync against a
//! live document store, swipe-to-decide listing cards and the listing
//! filters that feed them.

pub mod catalog;
pub mod common;
pub mod config;
pub mod error;
pub mod identity;
pub mod services;
pub mod storage;
pub mod swipe;
pub mod sync;

//! # chronicle-io: mapped region handle
//!
//! A single abstraction — [`MappedRegion`] — over a fixed-size memory mapped
//! file, read-only or read-write, with 8-byte aligned atomic word access.
//! This is the only place `unsafe` appears in the workspace's core read
//! path; everything above this crate talks in terms of typed offsets and
//! words, never raw pointers.

#![allow(unsafe_code)]

mod error;
mod region;

pub use error::IoError;
pub use region::MappedRegion;

//! Integration test crate for DropReel.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every dropreel crate to verify the live run and the offline
//! stages agree on the files they hand to each other.

#[cfg(test)]
mod support;

#[cfg(test)]
mod capture;

#[cfg(test)]
mod compositor;

#[cfg(test)]
mod pipeline;

//! Hand landmarks and finger classification.
//!
//! The landmark detector itself is not part of this crate. It is plugged in through
//! [`source::LandmarkSource`], which yields [`landmark::HandObservation`]s that
//! [`fingers::Classifier`] turns into a finger count.

pub mod fingers;
pub mod landmark;
pub mod source;
pub mod synthetic;

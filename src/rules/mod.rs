//! # Rules Module
//!
//! Savage Worlds rule resolution: dice, trait rolls, damage, wounds and the
//! attack modifier tables. Everything here is stateless apart from the
//! injected [`DieRoller`].

pub mod dice;
pub mod modifiers;
pub mod resolution;

pub use dice::*;
pub use modifiers::*;
pub use resolution::*;

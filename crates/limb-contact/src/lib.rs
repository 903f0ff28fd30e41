//! Soft contact force models.
//!
//! Contact here is penalty-based: a normal force law as a function of
//! penetration and its rate, plus a bristle friction law with its own
//! per-point state. The mechanism stores where contact points live; the
//! dynamics pass evaluates these models and turns the forces into wrenches.

pub mod model;

pub use model::{ContactModel, ContactPoint, HalfSpace, HuntCrossley, ViscoelasticCoulomb};

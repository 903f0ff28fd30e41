//! Mechanical energy.

use crate::error::DynamicsError;
use limb_math::Scalar;
use limb_model::{Mechanism, MechanismState};

/// Kinetic energy `1/2 sum_b T_b · (I_b T_b)`, from the cached world-frame
/// inertias and twists.
pub fn kinetic_energy<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<T, DynamicsError> {
    state.check_compatible(mechanism)?;
    state.ensure_twists();
    state.ensure_inertias_in_world();
    let twists = state.twists();
    let inertias = state.inertias_in_world();
    let mut energy = T::ZERO;
    for b in 0..state.num_bodies() {
        energy += inertias[b].kinetic_energy(&twists[b]);
    }
    Ok(energy)
}

/// Gravitational potential energy `-sum_b m_b g · com_b`, zero at the
/// world origin.
pub fn gravitational_potential_energy<T: Scalar>(
    mechanism: &Mechanism,
    state: &mut MechanismState<T>,
) -> Result<T, DynamicsError> {
    state.check_compatible(mechanism)?;
    state.ensure_inertias_in_world();
    let inertias = state.inertias_in_world();
    let g = state.gravity();
    let mut weighted_height = T::ZERO;
    for b in 0..state.num_bodies() {
        // g · (m c) summed over bodies.
        weighted_height += g.dot(&inertias[b].first_moment);
    }
    Ok(-weighted_height)
}

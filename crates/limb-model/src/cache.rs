//! Scalar-keyed registries of states, results, and segmented vectors.
//!
//! A registry amortizes topology conversion across scalar types: the first
//! lookup for a scalar `T` builds the instance, every later lookup returns
//! the same one by map lookup alone. This is what makes re-evaluating a
//! mechanism under dual numbers allocation-free after warmup.

use crate::error::ModelError;
use crate::mechanism::Mechanism;
use crate::result::DynamicsResult;
use crate::seg::SegmentedVec;
use crate::state::MechanismState;
use limb_math::Scalar;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::ops::Range;

/// One [`MechanismState`] per scalar type, for one mechanism.
pub struct StateCache {
    mechanism_id: u64,
    generation: u64,
    entries: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl StateCache {
    pub fn new(mechanism: &Mechanism) -> Self {
        Self {
            mechanism_id: mechanism.id(),
            generation: mechanism.generation(),
            entries: HashMap::new(),
        }
    }

    /// The state for scalar `T`, built on first lookup and identical on
    /// every later one.
    pub fn get<T: Scalar>(
        &mut self,
        mechanism: &Mechanism,
    ) -> Result<&mut MechanismState<T>, ModelError> {
        if self.mechanism_id != mechanism.id() || self.generation != mechanism.generation() {
            return Err(ModelError::StaleState);
        }
        let entry = self
            .entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(MechanismState::<T>::new(mechanism)));
        Ok(entry
            .downcast_mut::<MechanismState<T>>()
            .expect("cache entry matches its scalar key"))
    }
}

/// One [`DynamicsResult`] per scalar type, for one mechanism.
pub struct DynamicsResultCache {
    mechanism_id: u64,
    generation: u64,
    entries: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl DynamicsResultCache {
    pub fn new(mechanism: &Mechanism) -> Self {
        Self {
            mechanism_id: mechanism.id(),
            generation: mechanism.generation(),
            entries: HashMap::new(),
        }
    }

    pub fn get<T: Scalar>(
        &mut self,
        mechanism: &Mechanism,
    ) -> Result<&mut DynamicsResult<T>, ModelError> {
        if self.mechanism_id != mechanism.id() || self.generation != mechanism.generation() {
            return Err(ModelError::StaleState);
        }
        let entry = self
            .entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(DynamicsResult::<T>::new(mechanism)));
        Ok(entry
            .downcast_mut::<DynamicsResult<T>>()
            .expect("cache entry matches its scalar key"))
    }
}

/// One [`SegmentedVec`] per scalar type, over a fixed range table.
pub struct SegmentedVecCache {
    ranges: Vec<Range<usize>>,
    entries: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl SegmentedVecCache {
    /// Validates the range table once; lookups are then infallible.
    pub fn new(ranges: Vec<Range<usize>>) -> Result<Self, ModelError> {
        SegmentedVec::<f64>::zeros(ranges.clone())?;
        Ok(Self {
            ranges,
            entries: HashMap::new(),
        })
    }

    pub fn get<T: Scalar>(&mut self) -> &mut SegmentedVec<T> {
        let ranges = &self.ranges;
        let entry = self.entries.entry(TypeId::of::<T>()).or_insert_with(|| {
            Box::new(SegmentedVec::<T>::zeros(ranges.clone()).expect("ranges validated at construction"))
        });
        entry
            .downcast_mut::<SegmentedVec<T>>()
            .expect("cache entry matches its scalar key")
    }
}

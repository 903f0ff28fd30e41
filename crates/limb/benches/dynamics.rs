//! Criterion benchmarks: RNEA, CRBA, and forward dynamics over chains of
//! growing length.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use limb::{
    dynamics, inverse_dynamics_into, mass_matrix_into, BodyId, DMat, DynamicsResult, JointKind,
    MassProperties, Mat3, Mechanism, MechanismState, Placement, SegmentedVec,
    SpatialAcceleration, Vec3, Wrench, GRAVITY,
};

fn make_chain(n: usize) -> Mechanism {
    let mut m = Mechanism::new("world", Vec3::new(0.0, -GRAVITY, 0.0));
    let inertia = MassProperties::new(
        1.0,
        Vec3::new(0.5, 0.0, 0.0),
        Mat3::from_diagonal(&Vec3::new(0.001, 1.0 / 12.0, 1.0 / 12.0)),
    );
    let mut parent = BodyId::ROOT;
    for i in 0..n {
        let pose = if i == 0 {
            Placement::identity()
        } else {
            Placement::translation(Vec3::new(1.0, 0.0, 0.0))
        };
        let axis = if i % 2 == 0 {
            Vec3::new(0.0, 0.0, 1.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        parent = m
            .attach(
                parent,
                &format!("link{}", i + 1),
                Some(inertia),
                &format!("joint{}", i + 1),
                JointKind::Revolute { axis },
                pose,
            )
            .unwrap();
    }
    m
}

fn configured_state(m: &Mechanism) -> MechanismState<f64> {
    let mut state = MechanismState::new(m);
    let n = state.num_positions();
    let q: Vec<f64> = (0..n).map(|i| 0.3 + 0.1 * i as f64).collect();
    let v: Vec<f64> = (0..n).map(|i| 0.1 - 0.05 * i as f64).collect();
    state.set_configuration(&q).unwrap();
    state.set_velocity(&v).unwrap();
    state
}

fn bench_chain_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_scaling");
    for &n in &[1, 2, 4, 8, 16] {
        let m = make_chain(n);
        let mut state = configured_state(&m);
        let world = m.world_frame();
        let nb = m.num_bodies();

        let mut tau = SegmentedVec::from_widths(m.tree_joints().iter().map(|j| j.nv()));
        let vdot = SegmentedVec::from_widths(m.tree_joints().iter().map(|j| j.nv()));
        let mut accels = vec![SpatialAcceleration::zero(world, world, world); nb];
        let mut wrenches = vec![Wrench::zero(world, world, world); nb];
        group.bench_with_input(BenchmarkId::new("inverse_dynamics", n), &n, |b, _| {
            b.iter(|| {
                // Invalidate velocity-dependent caches so each iteration
                // does the full recursion.
                let v = state.velocity().as_slice().to_vec();
                state.set_velocity(&v).unwrap();
                inverse_dynamics_into(
                    &mut tau,
                    &m,
                    &mut state,
                    &vdot,
                    None,
                    &mut accels,
                    &mut wrenches,
                )
                .unwrap();
            });
        });

        let mut mm = DMat::zeros(n, n);
        group.bench_with_input(BenchmarkId::new("mass_matrix", n), &n, |b, _| {
            b.iter(|| {
                let q = state.configuration().as_slice().to_vec();
                state.set_configuration(&q).unwrap();
                mass_matrix_into(&mut mm, &m, &mut state).unwrap();
            });
        });

        let mut result = DynamicsResult::new(&m);
        group.bench_with_input(BenchmarkId::new("forward_dynamics", n), &n, |b, _| {
            b.iter(|| {
                let q = state.configuration().as_slice().to_vec();
                state.set_configuration(&q).unwrap();
                dynamics(&mut result, &m, &mut state, None, None).unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain_scaling);
criterion_main!(benches);

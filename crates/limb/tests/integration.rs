//! Integration tests for the limb rigid-body dynamics stack.

use approx::assert_relative_eq;
use limb::{
    dynamics, gravitational_potential_energy, kinetic_energy, mass_matrix, momentum,
    momentum_matrix, BodyId, Dual, DynamicsResult, DynamicsResultCache, FrameId, HalfSpace,
    JointKind, MassProperties, Mat3, Mechanism, MechanismState, ModelError, Placement,
    SegmentedVec, SegmentedVecCache, StateCache, Transform, Twist, Vec3, GRAVITY,
};

fn z_axis() -> Vec3<f64> {
    Vec3::new(0.0, 0.0, 1.0)
}

/// Uniform rod, mass 1, length 1, along +x from the joint.
fn rod() -> MassProperties {
    MassProperties::new(
        1.0,
        Vec3::new(0.5, 0.0, 0.0),
        Mat3::from_diagonal(&Vec3::new(0.0, 1.0 / 12.0, 1.0 / 12.0)),
    )
}

/// Planar double pendulum in the x-y plane, gravity along -y.
fn double_pendulum() -> Mechanism {
    let mut m = Mechanism::new("world", Vec3::new(0.0, -GRAVITY, 0.0));
    let upper = m
        .attach(
            BodyId::ROOT,
            "upper",
            Some(rod()),
            "shoulder",
            JointKind::Revolute { axis: z_axis() },
            Placement::identity(),
        )
        .unwrap();
    m.attach(
        upper,
        "lower",
        Some(rod()),
        "elbow",
        JointKind::Revolute { axis: z_axis() },
        Placement::translation(Vec3::new(1.0, 0.0, 0.0)),
    )
    .unwrap();
    m
}

fn floating_ball() -> Mechanism {
    let mut m = Mechanism::new("world", Vec3::new(0.0, 0.0, -GRAVITY));
    m.attach(
        BodyId::ROOT,
        "ball",
        Some(MassProperties::new(
            1.0,
            Vec3::zero(),
            Mat3::from_diagonal(&Vec3::new(0.004, 0.004, 0.004)),
        )),
        "float",
        JointKind::QuaternionFloating,
        Placement::identity(),
    )
    .unwrap();
    m
}

// ── Integration helpers ─────────────────────────────────────────────────

fn eval_derivatives(
    mechanism: &Mechanism,
    state: &mut MechanismState<f64>,
    result: &mut DynamicsResult<f64>,
    q: &[f64],
    v: &[f64],
) -> (Vec<f64>, Vec<f64>) {
    state.set_configuration(q).unwrap();
    state.set_velocity(v).unwrap();
    let q_dot = state.configuration_derivative();
    dynamics(result, mechanism, state, None, None).unwrap();
    (
        q_dot.as_slice().to_vec(),
        result.vdot.as_slice().to_vec(),
    )
}

/// Classic RK4 step of the passive dynamics.
fn rk4_step(
    mechanism: &Mechanism,
    state: &mut MechanismState<f64>,
    result: &mut DynamicsResult<f64>,
    h: f64,
) {
    let q0 = state.configuration().as_slice().to_vec();
    let v0 = state.velocity().as_slice().to_vec();
    let advance = |base: &[f64], rate: &[f64], step: f64| -> Vec<f64> {
        base.iter()
            .zip(rate.iter())
            .map(|(x, dx)| x + step * dx)
            .collect()
    };

    let (qd1, vd1) = eval_derivatives(mechanism, state, result, &q0, &v0);
    let (qd2, vd2) = eval_derivatives(
        mechanism,
        state,
        result,
        &advance(&q0, &qd1, h / 2.0),
        &advance(&v0, &vd1, h / 2.0),
    );
    let (qd3, vd3) = eval_derivatives(
        mechanism,
        state,
        result,
        &advance(&q0, &qd2, h / 2.0),
        &advance(&v0, &vd2, h / 2.0),
    );
    let (qd4, vd4) = eval_derivatives(
        mechanism,
        state,
        result,
        &advance(&q0, &qd3, h),
        &advance(&v0, &vd3, h),
    );

    let combine = |base: &[f64], k1: &[f64], k2: &[f64], k3: &[f64], k4: &[f64]| -> Vec<f64> {
        base.iter()
            .enumerate()
            .map(|(i, x)| x + h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]))
            .collect()
    };
    let q_new = combine(&q0, &qd1, &qd2, &qd3, &qd4);
    let v_new = combine(&v0, &vd1, &vd2, &vd3, &vd4);
    state.set_configuration(&q_new).unwrap();
    state.set_velocity(&v_new).unwrap();
}

// ── Scenarios ───────────────────────────────────────────────────────────

#[test]
fn double_pendulum_mass_matrix_closed_form() {
    // q = (0, pi/2): cos q2 = 0, so with l = 1, lc = 1/2, I = 1/12:
    //   M11 = 2 I + lc^2 + l^2 + lc^2, M12 = I + lc^2, M22 = I + lc^2.
    let m = double_pendulum();
    let mut state: MechanismState<f64> = MechanismState::new(&m);
    state
        .set_configuration(&[0.0, std::f64::consts::FRAC_PI_2])
        .unwrap();
    let mm = mass_matrix(&m, &mut state).unwrap();
    let i = 1.0 / 12.0;
    assert_relative_eq!(mm[(0, 0)], 2.0 * i + 1.5, epsilon = 1e-12);
    assert_relative_eq!(mm[(0, 1)], i + 0.25, epsilon = 1e-12);
    assert_relative_eq!(mm[(1, 0)], i + 0.25, epsilon = 1e-12);
    assert_relative_eq!(mm[(1, 1)], i + 0.25, epsilon = 1e-12);
}

#[test]
fn free_floating_body_falls_straight_down() {
    let m = floating_ball();
    let mut state: MechanismState<f64> = MechanismState::new(&m);
    let mut result = DynamicsResult::new(&m);
    dynamics(&mut result, &m, &mut state, None, None).unwrap();
    // v = [angular; linear] in the body frame (aligned with world here).
    for i in 0..5 {
        assert_relative_eq!(result.vdot[i], 0.0, epsilon = 1e-12);
    }
    assert_relative_eq!(result.vdot[5], -GRAVITY, epsilon = 1e-12);
}

#[test]
fn passive_double_pendulum_conserves_energy() {
    let m = double_pendulum();
    let mut state: MechanismState<f64> = MechanismState::new(&m);
    let mut result = DynamicsResult::new(&m);
    state.set_configuration(&[0.3, 0.2]).unwrap();

    let e0 = kinetic_energy(&m, &mut state).unwrap()
        + gravitational_potential_energy(&m, &mut state).unwrap();

    let h = 1e-3;
    for _ in 0..1000 {
        rk4_step(&m, &mut state, &mut result, h);
    }

    let e1 = kinetic_energy(&m, &mut state).unwrap()
        + gravitational_potential_energy(&m, &mut state).unwrap();
    assert!(
        (e1 - e0).abs() < 1e-6,
        "energy drifted by {:.3e} over 1000 steps",
        (e1 - e0).abs()
    );
}

#[test]
fn momentum_matrix_equals_dual_jacobian_of_momentum() {
    // Seed v with dual numbers and differentiate momentum(q, v); since
    // h = A(q) v, the derivative slots must reproduce A column by column.
    let m = double_pendulum();
    let mut cache = StateCache::new(&m);

    let q = [0.4, -0.8];
    let v = [0.9, 1.3];

    let state = cache.get::<f64>(&m).unwrap();
    state.set_configuration(&q).unwrap();
    state.set_velocity(&v).unwrap();
    let a = momentum_matrix(&m, state).unwrap();

    let dual_state = cache.get::<Dual<2>>(&m).unwrap();
    let q_dual: Vec<Dual<2>> = q.iter().map(|&x| Dual::constant(x)).collect();
    let v_dual: Vec<Dual<2>> = v
        .iter()
        .enumerate()
        .map(|(i, &x)| Dual::variable(x, i))
        .collect();
    dual_state.set_configuration(&q_dual).unwrap();
    dual_state.set_velocity(&v_dual).unwrap();
    let h = momentum(&m, dual_state).unwrap();

    for col in 0..2 {
        assert_relative_eq!(h.angular.z.derivative(col), a.angular[col].z, epsilon = 1e-12);
        assert_relative_eq!(h.linear.x.derivative(col), a.linear[col].x, epsilon = 1e-12);
        assert_relative_eq!(h.linear.y.derivative(col), a.linear[col].y, epsilon = 1e-12);
    }
}

#[test]
fn power_balance_under_applied_torques() {
    // tau' v = d/dt (T + V) along the solution; the time derivative is
    // taken by seeding one dual slot with (q_dot, vdot).
    let m = double_pendulum();
    let mut cache = StateCache::new(&m);

    let q = [0.5, -0.3];
    let v = [1.1, -0.6];
    let tau = [0.8, 0.25];

    let state = cache.get::<f64>(&m).unwrap();
    state.set_configuration(&q).unwrap();
    state.set_velocity(&v).unwrap();
    let q_dot = state.configuration_derivative();
    let mut result = DynamicsResult::new(&m);
    let mut tau_seg = SegmentedVec::from_widths([1, 1]);
    tau_seg[0] = tau[0];
    tau_seg[1] = tau[1];
    dynamics(&mut result, &m, state, Some(&tau_seg), None).unwrap();
    let vdot = [result.vdot[0], result.vdot[1]];
    let q_dot = [q_dot[0], q_dot[1]];

    let dual_state = cache.get::<Dual<1>>(&m).unwrap();
    let q_dual: Vec<Dual<1>> = (0..2)
        .map(|i| Dual::with_derivative(q[i], [q_dot[i]]))
        .collect();
    let v_dual: Vec<Dual<1>> = (0..2)
        .map(|i| Dual::with_derivative(v[i], [vdot[i]]))
        .collect();
    dual_state.set_configuration(&q_dual).unwrap();
    dual_state.set_velocity(&v_dual).unwrap();

    let energy = kinetic_energy(&m, dual_state).unwrap()
        + gravitational_potential_energy(&m, dual_state).unwrap();
    let energy_rate = energy.derivative(0);
    let power = tau[0] * v[0] + tau[1] * v[1];
    assert_relative_eq!(energy_rate, power, epsilon = 1e-8);
}

#[test]
fn state_cache_returns_identical_instances_per_scalar() {
    let m = double_pendulum();
    let mut states = StateCache::new(&m);
    let p1 = states.get::<f64>(&m).unwrap() as *mut MechanismState<f64>;
    let p2 = states.get::<f64>(&m).unwrap() as *mut MechanismState<f64>;
    let p3 = states.get::<f32>(&m).unwrap() as *mut MechanismState<f32>;
    let p4 = states.get::<f32>(&m).unwrap() as *mut MechanismState<f32>;
    assert_eq!(p1, p2);
    assert_eq!(p3, p4);

    let mut results = DynamicsResultCache::new(&m);
    let r1 = results.get::<f64>(&m).unwrap() as *mut DynamicsResult<f64>;
    let r2 = results.get::<f64>(&m).unwrap() as *mut DynamicsResult<f64>;
    assert_eq!(r1, r2);

    let mut vecs = SegmentedVecCache::new(vec![0..1, 1..2]).unwrap();
    vecs.get::<f64>()[0] = 7.0;
    assert_eq!(vecs.get::<f64>()[0], 7.0);
}

#[test]
#[should_panic(expected = "frame mismatch")]
fn transform_of_twist_in_wrong_frame_is_rejected() {
    let a = FrameId::new(1);
    let b = FrameId::new(2);
    let c = FrameId::new(3);
    let a_from_b = Transform::<f64>::translation(b, a, Vec3::new(1.0, 0.0, 0.0));
    let twist_in_c = Twist::new(b, a, c, Vec3::new(0.0, 0.0, 1.0), Vec3::zero());
    let _ = twist_in_c.transform(&a_from_b);
}

#[test]
fn stale_state_after_topology_mutation() {
    let mut m = double_pendulum();
    let mut state: MechanismState<f64> = MechanismState::new(&m);
    let mut result = DynamicsResult::new(&m);
    dynamics(&mut result, &m, &mut state, None, None).unwrap();

    m.attach(
        BodyId(2),
        "extra",
        Some(rod()),
        "wrist",
        JointKind::Revolute { axis: z_axis() },
        Placement::translation(Vec3::new(1.0, 0.0, 0.0)),
    )
    .unwrap();

    let err = dynamics(&mut result, &m, &mut state, None, None);
    assert!(matches!(
        err,
        Err(limb::DynamicsError::Model(ModelError::StaleState))
    ));
}

#[test]
fn euler_step_of_configuration_derivative_is_second_order() {
    // A floating body spinning at constant omega: one Euler step of q_dot
    // lands within O(h^2) of the exact quaternion, so halving h must
    // quarter the error.
    let m = floating_ball();
    let mut state: MechanismState<f64> = MechanismState::new(&m);
    let omega = Vec3::new(0.0, 0.0, 1.0);
    let mut v = [0.0; 6];
    v[0] = omega.x;
    v[1] = omega.y;
    v[2] = omega.z;
    state.set_velocity(&v).unwrap();

    let error_at = |state: &MechanismState<f64>, h: f64| -> f64 {
        let q_dot = state.configuration_derivative();
        let exact = limb::Quat::from_axis_angle(&Vec3::new(0.0, 0.0, 1.0), h);
        let q = state.configuration();
        let approx_q = [
            q[0] + h * q_dot[0],
            q[1] + h * q_dot[1],
            q[2] + h * q_dot[2],
            q[3] + h * q_dot[3],
        ];
        ((approx_q[0] - exact.w).powi(2)
            + (approx_q[1] - exact.v.x).powi(2)
            + (approx_q[2] - exact.v.y).powi(2)
            + (approx_q[3] - exact.v.z).powi(2))
        .sqrt()
    };

    let h = 1e-3;
    let e1 = error_at(&state, h);
    let e2 = error_at(&state, h / 2.0);
    let ratio = e1 / e2;
    assert!(
        (3.5..4.5).contains(&ratio),
        "error ratio {ratio} is not quadratic (e1 = {e1:.3e}, e2 = {e2:.3e})"
    );
}

#[test]
fn relative_transform_between_attached_frames() {
    let mut m = double_pendulum();
    let tip = m
        .add_frame(
            BodyId(2),
            "tip",
            Placement::translation(Vec3::new(1.0, 0.0, 0.0)),
        )
        .unwrap();
    let mut state: MechanismState<f64> = MechanismState::new(&m);
    state
        .set_configuration(&[std::f64::consts::FRAC_PI_2, -std::f64::consts::FRAC_PI_2])
        .unwrap();
    // Upper link up, elbow bends back to horizontal: tip at (1, 1, 0).
    let x = state
        .relative_transform(&m, tip, m.world_frame())
        .unwrap();
    let origin = x.transform_point(&Vec3::zero());
    assert_relative_eq!(origin.x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(origin.y, 1.0, epsilon = 1e-12);
}

#[test]
fn ball_bounces_on_soft_ground() {
    use limb::{ContactModel, ContactPoint, HuntCrossley, ViscoelasticCoulomb};

    let mut m = floating_ball();
    let model = ContactModel::new(
        HuntCrossley::hertz(50e3, 0.5),
        ViscoelasticCoulomb::new(0.8, 20e3, 100.0),
    );
    m.add_contact_point(BodyId(1), ContactPoint::new(Vec3::new(0.0, 0.0, -0.1), model))
        .unwrap();
    m.add_environment_halfspace(HalfSpace::ground());

    let mut state: MechanismState<f64> = MechanismState::new(&m);
    let mut result = DynamicsResult::new(&m);
    // Drop from 0.2 m (ball bottom 0.1 m above ground).
    let mut q = state.configuration().as_slice().to_vec();
    q[6] = 0.2;
    state.set_configuration(&q).unwrap();

    let h = 1e-4;
    let mut min_height: f64 = f64::INFINITY;
    let mut rebounded = false;
    for _ in 0..5000 {
        rk4_step(&m, &mut state, &mut result, h);
        let z = state.configuration()[6];
        min_height = min_height.min(z);
        if z > 0.11 && state.velocity()[5] > 0.0 && min_height < 0.1 {
            rebounded = true;
            break;
        }
    }
    assert!(min_height < 0.1, "ball never reached the ground");
    assert!(min_height > 0.05, "ball fell through the ground");
    assert!(rebounded, "ball never rebounded");
}

//! Double pendulum — passive dynamics and energy conservation.

use limb::{
    dynamics, gravitational_potential_energy, kinetic_energy, BodyId, DynamicsResult, JointKind,
    MassProperties, Mat3, Mechanism, MechanismState, Placement, Vec3, GRAVITY,
};

fn rod() -> MassProperties {
    MassProperties::new(
        1.0,
        Vec3::new(0.5, 0.0, 0.0),
        Mat3::from_diagonal(&Vec3::new(0.0, 1.0 / 12.0, 1.0 / 12.0)),
    )
}

fn total_energy(m: &Mechanism, state: &mut MechanismState<f64>) -> f64 {
    kinetic_energy(m, state).unwrap() + gravitational_potential_energy(m, state).unwrap()
}

fn main() {
    let mut mechanism = Mechanism::new("world", Vec3::new(0.0, -GRAVITY, 0.0));
    let upper = mechanism
        .attach(
            BodyId::ROOT,
            "upper",
            Some(rod()),
            "shoulder",
            JointKind::Revolute {
                axis: Vec3::new(0.0, 0.0, 1.0),
            },
            Placement::identity(),
        )
        .unwrap();
    mechanism
        .attach(
            upper,
            "lower",
            Some(rod()),
            "elbow",
            JointKind::Revolute {
                axis: Vec3::new(0.0, 0.0, 1.0),
            },
            Placement::translation(Vec3::new(1.0, 0.0, 0.0)),
        )
        .unwrap();

    let mut state: MechanismState<f64> = MechanismState::new(&mechanism);
    let mut result = DynamicsResult::new(&mechanism);
    state
        .set_configuration(&[std::f64::consts::FRAC_PI_4, std::f64::consts::FRAC_PI_4])
        .unwrap();

    let e0 = total_energy(&mechanism, &mut state);
    println!("Double Pendulum");
    println!("===============");
    println!(
        "Initial angles: [{:.3}, {:.3}] rad",
        state.configuration()[0],
        state.configuration()[1]
    );
    println!("Initial energy: {e0:.8} J\n");

    let h = 1e-3;
    let steps = 10_000; // 10 seconds
    let mut max_drift: f64 = 0.0;

    println!("time(s)    q1(rad)    q2(rad)    energy       drift");
    println!("-----------------------------------------------------");
    for step in 0..steps {
        // Classic RK4 on (q, v).
        let q0 = state.configuration().as_slice().to_vec();
        let v0 = state.velocity().as_slice().to_vec();
        let mut eval = |q: &[f64], v: &[f64]| -> (Vec<f64>, Vec<f64>) {
            state.set_configuration(q).unwrap();
            state.set_velocity(v).unwrap();
            let qd = state.configuration_derivative();
            dynamics(&mut result, &mechanism, &mut state, None, None).unwrap();
            (qd.as_slice().to_vec(), result.vdot.as_slice().to_vec())
        };
        let step_vec =
            |x: &[f64], d: &[f64], s: f64| -> Vec<f64> {
                x.iter().zip(d).map(|(a, b)| a + s * b).collect()
            };
        let (k1q, k1v) = eval(&q0, &v0);
        let (k2q, k2v) = eval(&step_vec(&q0, &k1q, h / 2.0), &step_vec(&v0, &k1v, h / 2.0));
        let (k3q, k3v) = eval(&step_vec(&q0, &k2q, h / 2.0), &step_vec(&v0, &k2v, h / 2.0));
        let (k4q, k4v) = eval(&step_vec(&q0, &k3q, h), &step_vec(&v0, &k3v, h));
        let q1: Vec<f64> = (0..q0.len())
            .map(|i| q0[i] + h / 6.0 * (k1q[i] + 2.0 * k2q[i] + 2.0 * k3q[i] + k4q[i]))
            .collect();
        let v1: Vec<f64> = (0..v0.len())
            .map(|i| v0[i] + h / 6.0 * (k1v[i] + 2.0 * k2v[i] + 2.0 * k3v[i] + k4v[i]))
            .collect();
        state.set_configuration(&q1).unwrap();
        state.set_velocity(&v1).unwrap();

        let e = total_energy(&mechanism, &mut state);
        let drift = ((e - e0) / e0).abs();
        max_drift = max_drift.max(drift);
        if step % 1000 == 0 {
            println!(
                "{:8.3}   {:+7.4}    {:+7.4}    {:10.8}  {:.2e}",
                step as f64 * h,
                state.configuration()[0],
                state.configuration()[1],
                e,
                drift
            );
        }
    }

    let e_final = total_energy(&mechanism, &mut state);
    println!("\n-- Energy Conservation --");
    println!("Initial energy: {e0:.8} J");
    println!("Final energy:   {e_final:.8} J");
    println!("Max drift:      {max_drift:.2e}");
    if max_drift < 0.01 {
        println!("PASS: energy conserved within 1% over 10 s");
    } else {
        println!("FAIL: energy drift exceeds 1%!");
    }
}

use glam::{Quat, Vec3};
use procanim::dynamics::{SpringChain, SpringChainConfig, SpringConfig, SpringDynamics};
use procanim::ik::{BoneChain, BoneConstraint, CcdSolver, FabrikSolver, IkSolver, TwoBoneSolver};
use procanim::locomotion::{GaitConfig, LookAtConfig, LookAtController, ProceduralGait};
use procanim::scene::{BoneId, SceneGraph, Skeleton};
use procanim::ChainError;

const FRAME_COUNT: u32 = 240;
const FRAME_DT: f32 = 1.0 / 60.0;
const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

struct Legs {
    hip: [BoneId; 2],
    knee: [BoneId; 2],
    ankle: [BoneId; 2],
}

/// Headless character rig driven one frame at a time.
struct App {
    skeleton: Skeleton,
    pelvis: BoneId,
    head: BoneId,
    legs: Legs,
    tentacle: BoneChain,
    solvers: [IkSolver; 2],
    active_solver: usize,
    limb_solver: TwoBoneSolver,
    gait: ProceduralGait,
    look_at: LookAtController,
    tail: SpringChain,
    target_dynamics: SpringDynamics,
    raw_target: Vec3,
    body_position: Vec3,
    velocity: Vec3,
    time: f32,
}

impl App {
    fn new() -> Result<Self, ChainError> {
        let mut skeleton = Skeleton::new();
        let body_position = Vec3::new(0.0, 1.0, 0.0);
        let pelvis = skeleton.add_root("pelvis", body_position);
        let head = skeleton.add_child(pelvis, "head", Vec3::new(0.0, 0.7, 0.0));

        let mut hip = [pelvis; 2];
        let mut knee = [pelvis; 2];
        let mut ankle = [pelvis; 2];
        for (side, x) in [-0.15f32, 0.15].into_iter().enumerate() {
            hip[side] = skeleton.add_child(pelvis, format!("hip.{side}"), Vec3::new(x, 0.0, 0.0));
            knee[side] = skeleton.add_child(hip[side], format!("knee.{side}"), Vec3::new(0.0, -0.5, 0.0));
            ankle[side] = skeleton.add_child(knee[side], format!("ankle.{side}"), Vec3::new(0.0, -0.45, 0.0));
        }

        let shoulder = skeleton.add_child(pelvis, "tentacle", Vec3::new(0.0, 0.5, 0.2));
        let tentacle = BoneChain::from_lengths(&mut skeleton, shoulder, &[0.3, 0.3, 0.25, 0.2], Vec3::Y)?
            .with_constraint(BoneConstraint::from_degrees(2, 0.0, 50.0));

        let raw_target = Vec3::new(0.6, 1.8, -0.4);

        Ok(Self {
            skeleton,
            pelvis,
            head,
            legs: Legs { hip, knee, ankle },
            tentacle,
            solvers: [
                FabrikSolver::new().into(),
                CcdSolver::new().with_damping_factor(0.8).into(),
            ],
            active_solver: 0,
            limb_solver: TwoBoneSolver::new().with_reference_axis(Vec3::NEG_Y),
            gait: ProceduralGait::new(GaitConfig::default().with_step(0.7, 0.12)),
            look_at: LookAtController::new(LookAtConfig::default().with_max_angle_degrees(70.0)),
            tail: SpringChain::new(SpringChainConfig::new(5, 0.15), body_position),
            target_dynamics: SpringDynamics::new(SpringConfig::new(60.0, 14.0), raw_target),
            raw_target,
            body_position,
            velocity: Vec3::new(0.0, 0.0, -1.2),
            time: 0.0,
        })
    }

    fn update(&mut self, dt: f32) {
        self.time += dt;

        // Walk for two seconds, then stand still.
        if self.time > 2.0 {
            self.velocity = Vec3::ZERO;
        }
        self.body_position += self.velocity * dt;
        self.active_solver = usize::from(self.time > 1.0);

        let gait = self.gait.update(self.body_position, Vec3::NEG_Z, self.velocity, dt);
        self.skeleton.set_local_position(self.pelvis, self.body_position + gait.body_offset);
        self.skeleton.set_local_orientation(self.pelvis, gait.body_rotation);

        let feet = [gait.left_foot_target, gait.right_foot_target];
        for (side, foot) in feet.into_iter().enumerate() {
            let hip = self.skeleton.world_position(self.legs.hip[side]);
            let pole = hip + Vec3::NEG_Z + Vec3::NEG_Y * 0.5;
            self.limb_solver.solve_limb(
                &mut self.skeleton,
                self.legs.hip[side],
                self.legs.knee[side],
                self.legs.ankle[side],
                foot,
                pole,
            );
        }

        self.raw_target = Vec3::new((self.time * 2.0).cos() * 0.6, 1.8, -0.4 + (self.time * 3.0).sin() * 0.3)
            + self.body_position
            - Vec3::Y;
        let target = self.target_dynamics.update(self.raw_target, dt);
        let solver = &self.solvers[self.active_solver];
        let result = solver.solve(&self.skeleton, &self.tentacle, target);
        solver.apply(&mut self.skeleton, &self.tentacle, &result);

        let head_target = target + Vec3::new(0.0, 0.2, 0.0);
        self.look_at.update(&self.skeleton, self.head, head_target, dt);
        self.look_at.apply(&mut self.skeleton, self.head);

        let pelvis_rotation = self.skeleton.world_orientation(self.pelvis);
        let pelvis_position = self.skeleton.world_position(self.pelvis);
        let tail_root = pelvis_position + pelvis_rotation * Vec3::new(0.0, 0.0, 0.15);
        let tail_rotation = pelvis_rotation * Quat::from_rotation_x(-0.6);
        let tail_tip = *self.tail.update(tail_root, tail_rotation, dt, GRAVITY).last().unwrap_or(&tail_root);

        log::trace!(
            "t={:.3} solver={} reached={} iterations={} error={:.4}",
            self.time,
            self.active_solver,
            result.reached,
            result.iterations,
            result.error
        );

        let frame = (self.time / FRAME_DT).round() as u32;
        if frame % 30 == 0 {
            log::info!(
                "t={:.2}s phase={:.2} feet=({}, {}) tentacle reached={} error={:.4} tail_tip={:?}",
                self.time,
                gait.phase,
                if gait.left_foot_lifted { "up" } else { "down" },
                if gait.right_foot_lifted { "up" } else { "down" },
                result.reached,
                result.error,
                tail_tip,
            );
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            log::error!("Failed to build rig: {}", e);
            std::process::exit(1);
        }
    };

    for _ in 0..FRAME_COUNT {
        app.update(FRAME_DT.min(0.1));
    }

    let ankle = app.skeleton.world_position(app.legs.ankle[0]);
    log::info!("finished {} frames, left ankle at {:?}", FRAME_COUNT, ankle);
}

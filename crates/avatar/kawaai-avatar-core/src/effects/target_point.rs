//! Drag smoothing: moves the face direction toward the pointer target with
//! bounded acceleration, braking before it arrives.

const FRAME_RATE: f32 = 30.0;
const EPSILON: f32 = 0.01;
/// Face direction units per second at full speed.
const MAX_SPEED: f32 = 40.0 / 10.0;
const TIME_TO_MAX_SPEED: f32 = 0.15;

#[derive(Clone, Debug, Default)]
pub struct TargetPoint {
    face_target_x: f32,
    face_target_y: f32,
    face_x: f32,
    face_y: f32,
    face_vx: f32,
    face_vy: f32,
    last_time: f32,
    user_time: f32,
}

impl TargetPoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target in `[-1, 1]` on both axes.
    pub fn set(&mut self, x: f32, y: f32) {
        self.face_target_x = x;
        self.face_target_y = y;
    }

    pub fn x(&self) -> f32 {
        self.face_x
    }

    pub fn y(&self) -> f32 {
        self.face_y
    }

    pub fn update(&mut self, dt: f32) {
        self.user_time += dt;

        let max_v = MAX_SPEED / FRAME_RATE;
        if self.last_time == 0.0 {
            self.last_time = self.user_time;
            return;
        }
        let frame_weight = (self.user_time - self.last_time) * FRAME_RATE;
        self.last_time = self.user_time;

        let frames_to_max_speed = TIME_TO_MAX_SPEED * FRAME_RATE;
        let max_a = frame_weight * max_v / frames_to_max_speed;

        let dx = self.face_target_x - self.face_x;
        let dy = self.face_target_y - self.face_y;
        if dx.abs() <= EPSILON && dy.abs() <= EPSILON {
            // Arrived: settle exactly on the target.
            self.face_x = self.face_target_x;
            self.face_y = self.face_target_y;
            self.face_vx = 0.0;
            self.face_vy = 0.0;
            return;
        }

        let d = (dx * dx + dy * dy).sqrt();
        let vx = max_v * dx / d;
        let vy = max_v * dy / d;
        let mut ax = vx - self.face_vx;
        let mut ay = vy - self.face_vy;
        let a = (ax * ax + ay * ay).sqrt();
        if a > max_a {
            ax *= max_a / a;
            ay *= max_a / a;
        }
        self.face_vx += ax;
        self.face_vy += ay;

        // Cap speed so the remaining distance can still be braked within max_a.
        let brake_v = 0.5 * ((max_a * max_a + 16.0 * max_a * d - 8.0 * max_a * d).sqrt() - max_a);
        let cur_v = (self.face_vx * self.face_vx + self.face_vy * self.face_vy).sqrt();
        if cur_v > brake_v {
            self.face_vx *= brake_v / cur_v;
            self.face_vy *= brake_v / cur_v;
        }

        self.face_x += self.face_vx;
        self.face_y += self.face_vy;
    }
}

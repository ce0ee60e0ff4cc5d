//! Pose math for avatar replication: vectors, quaternions, and the
//! smoothing step used to move a displayed pose toward its target.

use serde::{Deserialize, Serialize};

/// Distance (metres) below which a position snaps onto its target.
const POSITION_EPSILON: f32 = 1e-4;
/// Quaternion dot product above which an orientation snaps onto its target.
const ROTATION_DOT_EPSILON: f32 = 1.0 - 1e-6;
/// Yaw difference (degrees) below which yaw snaps onto its target.
const YAW_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            z: self.z + (to.z - self.z) * t,
        }
    }

    pub fn distance(self, other: Self) -> f32 {
        let (dx, dy, dz) = (other.x - self.x, other.y - self.y, other.z - self.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Unit quaternion orientation, `(x, y, z, w)` layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `degrees` about the vertical (Y) axis.
    pub fn from_yaw_degrees(degrees: f32) -> Self {
        let half = degrees.to_radians() * 0.5;
        Self::new(0.0, half.sin(), 0.0, half.cos())
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit-length copy; degenerate input falls back to identity.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return Self::IDENTITY;
        }
        Self::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }

    fn add(self, other: Self) -> Self {
        Self::new(
            self.x + other.x,
            self.y + other.y,
            self.z + other.z,
            self.w + other.w,
        )
    }

    /// Spherical interpolation along the shortest arc.
    pub fn slerp(self, to: Self, t: f32) -> Self {
        let mut to = to;
        let mut cos_theta = self.dot(to);
        if cos_theta < 0.0 {
            to = to.scale(-1.0);
            cos_theta = -cos_theta;
        }

        // Nearly parallel: sin(theta) underflows, fall back to nlerp.
        if cos_theta > 0.9995 {
            return self.scale(1.0 - t).add(to.scale(t)).normalized();
        }

        let theta = cos_theta.clamp(-1.0, 1.0).acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        self.scale(a).add(to.scale(b)).normalized()
    }

    /// Same orientation regardless of sign.
    pub fn approx_eq(self, other: Self, tolerance: f32) -> bool {
        self.dot(other).abs() >= 1.0 - tolerance
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

/// Position and orientation of a single tracked point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl TrackedPose {
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    fn step_toward(&mut self, target: &TrackedPose, t: f32) {
        self.position = if self.position.distance(target.position) < POSITION_EPSILON {
            target.position
        } else {
            self.position.lerp(target.position, t)
        };
        self.rotation = if self.rotation.dot(target.rotation).abs() > ROTATION_DOT_EPSILON {
            target.rotation
        } else {
            self.rotation.slerp(target.rotation, t)
        };
    }

    fn approx_eq(&self, other: &TrackedPose, tolerance: f32) -> bool {
        self.position.distance(other.position) <= tolerance
            && self.rotation.approx_eq(other.rotation, tolerance)
    }

    fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

/// Full-body avatar pose: root position and yaw plus the three tracked
/// points, all in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarPose {
    pub root_position: Vec3,
    /// Degrees about the vertical axis.
    pub root_yaw: f32,
    pub head: TrackedPose,
    pub left_hand: TrackedPose,
    pub right_hand: TrackedPose,
}

impl AvatarPose {
    /// Advance this pose a fraction `t` (clamped to `[0, 1]`) of the way
    /// toward `target`. Components already within tolerance snap exactly, so
    /// repeated steps at rest settle on the target instead of creeping.
    pub fn step_toward(&mut self, target: &AvatarPose, t: f32) {
        let t = t.clamp(0.0, 1.0);
        self.root_position = if self.root_position.distance(target.root_position) < POSITION_EPSILON
        {
            target.root_position
        } else {
            self.root_position.lerp(target.root_position, t)
        };
        self.root_yaw = lerp_yaw(self.root_yaw, target.root_yaw, t);
        self.head.step_toward(&target.head, t);
        self.left_hand.step_toward(&target.left_hand, t);
        self.right_hand.step_toward(&target.right_hand, t);
    }

    pub fn approx_eq(&self, other: &AvatarPose, tolerance: f32) -> bool {
        self.root_position.distance(other.root_position) <= tolerance
            && yaw_delta(self.root_yaw, other.root_yaw).abs() <= tolerance
            && self.head.approx_eq(&other.head, tolerance)
            && self.left_hand.approx_eq(&other.left_hand, tolerance)
            && self.right_hand.approx_eq(&other.right_hand, tolerance)
    }

    /// Rejects NaN/infinite components, which would poison interpolation.
    pub fn is_finite(&self) -> bool {
        self.root_position.is_finite()
            && self.root_yaw.is_finite()
            && self.head.is_finite()
            && self.left_hand.is_finite()
            && self.right_hand.is_finite()
    }
}

/// Signed shortest angular difference `to - from`, in (-180, 180].
fn yaw_delta(from: f32, to: f32) -> f32 {
    let mut delta = (to - from) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

fn lerp_yaw(from: f32, to: f32, t: f32) -> f32 {
    let delta = yaw_delta(from, to);
    if delta.abs() < YAW_EPSILON {
        return to;
    }
    from + delta * t
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pose(x: f32, yaw: f32) -> AvatarPose {
        let rot = Quat::from_yaw_degrees(yaw);
        AvatarPose {
            root_position: Vec3::new(x, 0.0, -x),
            root_yaw: yaw,
            head: TrackedPose::new(Vec3::new(x, 1.7, 0.0), rot),
            left_hand: TrackedPose::new(Vec3::new(x - 0.3, 1.2, 0.2), rot),
            right_hand: TrackedPose::new(Vec3::new(x + 0.3, 1.2, 0.2), rot),
        }
    }

    #[test]
    fn vec_lerp_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 4.0, -6.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vec3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn slerp_halfway_about_y() {
        let a = Quat::IDENTITY;
        let b = Quat::from_yaw_degrees(90.0);
        let mid = a.slerp(b, 0.5);
        assert!(mid.approx_eq(Quat::from_yaw_degrees(45.0), 1e-5));
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn slerp_takes_shortest_arc() {
        let a = Quat::from_yaw_degrees(10.0);
        let b = Quat::from_yaw_degrees(-10.0);
        let negated = Quat::new(-b.x, -b.y, -b.z, -b.w);
        let mid = a.slerp(negated, 0.5);
        assert!(mid.approx_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn normalized_degenerate_is_identity() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalized(), Quat::IDENTITY);
    }

    #[test]
    fn yaw_wraps_across_180() {
        assert!((yaw_delta(170.0, -170.0) - 20.0).abs() < 1e-4);
        assert!((yaw_delta(-170.0, 170.0) + 20.0).abs() < 1e-4);
        let stepped = lerp_yaw(170.0, -170.0, 0.5);
        assert!((stepped - 180.0).abs() < 1e-4);
    }

    #[test]
    fn repeated_steps_converge_and_stay() {
        let mut displayed = sample_pose(0.0, 0.0);
        let target = sample_pose(3.0, 120.0);

        for _ in 0..400 {
            displayed.step_toward(&target, 0.1);
        }
        assert!(displayed.approx_eq(&target, 1e-3));

        let settled = displayed;
        for _ in 0..100 {
            displayed.step_toward(&target, 0.1);
            assert!(displayed.approx_eq(&settled, 1e-3));
        }
    }

    #[test]
    fn full_step_lands_on_target() {
        let mut displayed = sample_pose(0.0, 0.0);
        let target = sample_pose(1.0, 45.0);
        displayed.step_toward(&target, 5.0);
        assert!(displayed.approx_eq(&target, 1e-4));
    }

    #[test]
    fn non_finite_pose_detected() {
        let mut pose = sample_pose(0.0, 0.0);
        assert!(pose.is_finite());
        pose.head.position.y = f32::NAN;
        assert!(!pose.is_finite());
    }

    #[test]
    fn avatar_pose_wire_names() {
        let json = serde_json::to_value(AvatarPose::default()).unwrap();
        assert!(json.get("rootPosition").is_some());
        assert!(json.get("rootYaw").is_some());
        assert!(json.get("leftHand").is_some());
        assert_eq!(json["head"]["rotation"]["w"], 1.0);
    }
}

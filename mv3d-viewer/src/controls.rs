/// Damped orbit controls: drag to rotate, drag+modifier to pan, scroll to zoom
use nalgebra::{Point3, Vector3};

use mv3d_core::Camera;

const MIN_DISTANCE: f32 = 1.0;
const MAX_DISTANCE: f32 = 100.0;

/// Fraction of velocity retained each frame
const DAMPING: f32 = 0.8;

/// Pitch is kept just short of the poles so the up vector stays valid
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

pub struct OrbitControls {
    target: Point3<f32>,
    distance: f32,
    yaw: f32,
    pitch: f32,
    min_distance: f32,
    max_distance: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    pan_velocity: Vector3<f32>,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            target: Point3::origin(),
            distance: 10.0,
            yaw: 0.0,
            pitch: 0.0,
            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            pan_velocity: Vector3::zeros(),
        }
    }

    /// Adopt the camera's current framing as the orbit home position.
    /// The zoom ceiling is widened for large models so the framed distance
    /// always stays reachable.
    pub fn sync_to_camera(&mut self, camera: &Camera) {
        self.target = camera.target;
        let offset = camera.position - camera.target;
        self.distance = offset.norm().max(self.min_distance);
        self.yaw = offset.x.atan2(offset.z);
        self.pitch = (offset.y / self.distance).clamp(-1.0, 1.0).asin();
        self.max_distance = MAX_DISTANCE.max(self.distance * 4.0);
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw_velocity += dx;
        self.pitch_velocity += dy;
    }

    /// Pan the orbit target in camera space (world-space panning, not
    /// screen-space)
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let scale = self.distance * 0.05;
        self.pan_velocity += Vector3::new(dx * scale, dy * scale, 0.0);
    }

    pub fn zoom(&mut self, delta: f32) {
        self.zoom_velocity += delta;
    }

    /// Advance one frame: integrate velocities with damping and reposition
    /// the camera on its orbit sphere.
    pub fn update(&mut self, camera: &mut Camera) {
        self.yaw += self.yaw_velocity;
        self.pitch = (self.pitch + self.pitch_velocity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.distance =
            (self.distance + self.zoom_velocity).clamp(self.min_distance, self.max_distance);

        // Pan in the camera's right/up basis
        if self.pan_velocity.norm() > 1e-6 {
            let forward = (camera.target - camera.position).normalize();
            let right = forward.cross(&camera.up).normalize();
            let up = right.cross(&forward);
            self.target += right * self.pan_velocity.x + up * self.pan_velocity.y;
        }

        self.yaw_velocity *= DAMPING;
        self.pitch_velocity *= DAMPING;
        self.zoom_velocity *= DAMPING;
        self.pan_velocity *= DAMPING;

        let offset = Vector3::new(
            self.pitch.cos() * self.yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.cos(),
        ) * self.distance;

        camera.target = self.target;
        camera.position = self.target + offset;
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed_camera() -> Camera {
        let mut camera = Camera::new(80, 40);
        camera.position = Point3::new(0.0, 0.0, 8.0);
        camera.target = Point3::origin();
        camera
    }

    #[test]
    fn sync_adopts_camera_distance() {
        let camera = framed_camera();
        let mut controls = OrbitControls::new();
        controls.sync_to_camera(&camera);
        assert!((controls.distance() - 8.0).abs() < 1e-5);
    }

    #[test]
    fn rotation_preserves_orbit_distance() {
        let mut camera = framed_camera();
        let mut controls = OrbitControls::new();
        controls.sync_to_camera(&camera);

        controls.rotate(0.3, 0.1);
        for _ in 0..10 {
            controls.update(&mut camera);
        }

        let distance = (camera.position - camera.target).norm();
        assert!((distance - 8.0).abs() < 1e-4);
        // Camera actually moved off the +Z axis
        assert!(camera.position.x.abs() > 0.1);
    }

    #[test]
    fn zoom_is_clamped_to_bounds() {
        let mut camera = framed_camera();
        let mut controls = OrbitControls::new();
        controls.sync_to_camera(&camera);

        for _ in 0..200 {
            controls.zoom(-5.0);
            controls.update(&mut camera);
        }
        assert!((controls.distance() - MIN_DISTANCE).abs() < 1e-4);

        for _ in 0..500 {
            controls.zoom(5.0);
            controls.update(&mut camera);
        }
        assert!(controls.distance() <= controls.max_distance + 1e-4);
    }

    #[test]
    fn damping_brings_motion_to_rest() {
        let mut camera = framed_camera();
        let mut controls = OrbitControls::new();
        controls.sync_to_camera(&camera);

        controls.rotate(0.5, 0.0);
        for _ in 0..100 {
            controls.update(&mut camera);
        }
        let before = camera.position;
        controls.update(&mut camera);
        assert!((camera.position - before).norm() < 1e-4);
    }

    #[test]
    fn pan_moves_target() {
        let mut camera = framed_camera();
        let mut controls = OrbitControls::new();
        controls.sync_to_camera(&camera);

        controls.pan(1.0, 0.0);
        for _ in 0..10 {
            controls.update(&mut camera);
        }
        assert!(camera.target.coords.norm() > 0.01);
    }
}

//! Cameras and the matrices pushed to the mesh shaders.

use glam::{Mat4, Vec3, Vec4};

/// Perspective camera producing Vulkan clip-space matrices.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 2.0),
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            fov: 70.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 200.0,
        }
    }
}

impl Camera {
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.direction, self.up)
    }

    /// Perspective projection with Y flipped for Vulkan's downward clip-space Y.
    pub fn projection_matrix(&self) -> Mat4 {
        let mut projection = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        projection.y_axis.y *= -1.0;
        projection
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn uniforms(&self) -> CameraUniforms {
        CameraUniforms::from(self)
    }
}

/// Yaw/pitch fly camera driven by WASD-style input and mouse deltas.
///
/// Angles are in degrees. Yaw 180 looks down -Z.
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub camera: Camera,
    pub yaw: f32,
    pub pitch: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        let mut fly = Self {
            camera: Camera::default(),
            yaw: 180.0,
            pitch: 0.0,
            speed: 10.0,
            sensitivity: 0.2,
        };
        fly.camera.direction = fly.front();
        fly
    }
}

/// Movement intent for one frame, each axis in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveInput {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
}

impl FlyCamera {
    pub const PITCH_LIMIT: f32 = 89.0;

    pub fn new(camera: Camera) -> Self {
        let mut fly = Self {
            camera,
            ..Self::default()
        };
        fly.camera.direction = fly.front();
        fly
    }

    /// Unit look direction for the current yaw and pitch.
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos()).normalize()
    }

    /// Unit strafe direction.
    pub fn right(&self) -> Vec3 {
        self.front().cross(self.camera.up).normalize()
    }

    /// Apply a mouse delta in pixels. Positive `dy` (mouse down) looks down.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity)
            .clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.camera.direction = self.front();
    }

    /// Move along the look direction, strafe axis and world up for `dt` seconds.
    pub fn translate(&mut self, input: MoveInput, dt: f32) {
        let step = self.speed * dt;
        let front = self.front();
        let right = self.right();
        self.camera.position +=
            front * input.forward * step + right * input.right * step + Vec3::Y * input.up * step;
    }
}

/// Per-frame camera block bound at set 0, binding 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_proj: Mat4,
}

impl From<&Camera> for CameraUniforms {
    fn from(camera: &Camera) -> Self {
        let view = camera.view_matrix();
        let projection = camera.projection_matrix();
        Self {
            view,
            projection,
            view_proj: projection * view,
        }
    }
}

/// Push-constant block for a single draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshPushConstants {
    pub data: Vec4,
    pub render_matrix: Mat4,
}

impl MeshPushConstants {
    pub fn new(render_matrix: Mat4) -> Self {
        Self {
            data: Vec4::ZERO,
            render_matrix,
        }
    }
}

/// Model matrix for the spinning showcase mesh: pushed 10 units down -Z and
/// turned about Y by `frame_number * 0.004` degrees.
#[allow(clippy::cast_precision_loss)]
pub fn spin_model_matrix(frame_number: u64) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0))
        * Mat4::from_rotation_y((frame_number as f32 * 0.004).to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_flips_y() {
        let camera = Camera::default();
        let flipped = camera.projection_matrix();
        let plain = Mat4::perspective_rh(camera.fov, camera.aspect, camera.near, camera.far);
        assert_relative_eq!(flipped.y_axis.y, -plain.y_axis.y);
        assert_relative_eq!(flipped.x_axis.x, plain.x_axis.x);

        // A point above the camera lands in negative clip Y.
        let clip = camera.view_projection_matrix() * Vec4::new(0.0, 1.0, -5.0, 1.0);
        assert!(clip.y < 0.0);
    }

    #[test]
    fn default_fly_camera_looks_down_negative_z() {
        let fly = FlyCamera::default();
        let front = fly.front();
        assert_relative_eq!(front.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(front.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(front.z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(fly.right().x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut fly = FlyCamera::default();
        fly.rotate(0.0, -10_000.0);
        assert_relative_eq!(fly.pitch, FlyCamera::PITCH_LIMIT);
        fly.rotate(0.0, 10_000.0);
        assert_relative_eq!(fly.pitch, -FlyCamera::PITCH_LIMIT);
        assert!(fly.front().is_normalized());
    }

    #[test]
    fn rotate_scales_by_sensitivity() {
        let mut fly = FlyCamera::default();
        fly.rotate(10.0, 5.0);
        assert_relative_eq!(fly.yaw, 178.0);
        assert_relative_eq!(fly.pitch, -1.0);
        assert_eq!(fly.camera.direction, fly.front());
    }

    #[test]
    fn translate_moves_along_axes() {
        let mut fly = FlyCamera::default();
        let start = fly.camera.position;
        fly.translate(
            MoveInput {
                forward: 1.0,
                ..MoveInput::default()
            },
            0.5,
        );
        let moved = fly.camera.position - start;
        assert_relative_eq!(moved.z, -5.0, epsilon = 1e-5);

        let start = fly.camera.position;
        fly.translate(
            MoveInput {
                up: -1.0,
                ..MoveInput::default()
            },
            0.1,
        );
        assert_relative_eq!(fly.camera.position.y - start.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn uniforms_combine_view_and_projection() {
        let camera = Camera::default();
        let u = camera.uniforms();
        let expected = camera.projection_matrix() * camera.view_matrix();
        assert!(u.view_proj.abs_diff_eq(expected, 1e-6));
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 192);
        assert_eq!(std::mem::size_of::<MeshPushConstants>(), 80);
    }

    #[test]
    fn spin_matrix_translates_model() {
        let origin = spin_model_matrix(0).transform_point3(Vec3::ZERO);
        assert_relative_eq!(origin.z, -10.0);

        let m = spin_model_matrix(22_500); // 90 degrees
        let x = m.transform_vector3(Vec3::X);
        assert_relative_eq!(x.z, -1.0, epsilon = 1e-5);
    }
}

/// Camera — perspective parameters plus derived matrices.
///
/// The camera computes its projection matrix and frustum from the
/// perspective parameters; the view matrix is set by the caller (the
/// host drives camera movement, the engine only consumes the result).

use glam::Mat4;
use super::frustum::Frustum;

/// Perspective camera consumed by the G-buffer pass and the tracer.
#[derive(Debug, Clone)]
pub struct Camera {
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Create a perspective camera.
    ///
    /// `fov_y` is the vertical field of view in radians; `aspect` is
    /// width / height.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let projection = Mat4::perspective_rh(fov_y, aspect, near, far);
        let view = Mat4::IDENTITY;
        Self {
            fov_y,
            aspect,
            near,
            far,
            view_matrix: view,
            projection_matrix: projection,
            frustum: Frustum::from_view_projection(&(projection * view)),
        }
    }

    // ===== GETTERS =====

    /// Vertical field of view in radians.
    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    /// Aspect ratio (width / height).
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near plane distance.
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far plane distance.
    pub fn far(&self) -> f32 {
        self.far
    }

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    /// Projection matrix.
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// Frustum planes for culling, derived from the current matrices.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    // ===== SETTERS =====

    /// Set the view matrix and refresh the frustum.
    pub fn set_view(&mut self, view: Mat4) {
        self.view_matrix = view;
        self.refresh_frustum();
    }

    /// Change the aspect ratio (e.g. on swapchain resize) and refresh
    /// the projection and frustum.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.projection_matrix = Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far);
        self.refresh_frustum();
    }

    /// Change the perspective parameters and refresh the projection
    /// and frustum.
    pub fn set_perspective(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        self.fov_y = fov_y;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
        self.projection_matrix = Mat4::perspective_rh(fov_y, aspect, near, far);
        self.refresh_frustum();
    }

    fn refresh_frustum(&mut self) {
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix());
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;

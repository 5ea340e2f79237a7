use nalgebra::{Matrix3, Point3, Rotation3, Vector3};
use thiserror::Error;
use winit::dpi::PhysicalSize;
use winit::event::VirtualKeyCode;

use crate::input::FlagSlots;

pub const CAMERA_SPEED: f32 = 0.2;
pub const CAMERA_ROT_SPEED: f32 = 0.05;
pub const APERTURE_SPEED: f32 = 0.01;
pub const FOCAL_SPEED: f32 = 0.5;
pub const FOV_SPEED: f32 = 1.0;

pub const MIN_FOCAL_DIST: f32 = 0.1;
pub const MIN_FOV: f32 = 5.0;
pub const MAX_FOV: f32 = 180.0;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraError {
    /// position == look_at 이면 기저를 만들 수 없음
    #[error("degenerate camera: position and look-at point coincide")]
    Degenerate,

    #[error("degenerate camera: up vector is parallel to the view direction")]
    ParallelUp,
}

/// 카메라가 매 프레임 읽는 입력 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraFlag {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,

    PitchUp,
    PitchDown,
    YawLeft,
    YawRight,
    // 앞/뒤 "회전"은 시선축 기준 롤
    RollForward,
    RollBack,

    ZoomIn,
    ZoomOut,
    LensWide,
    LensShrink,
    FovUp,
    FovDown,
}

impl CameraFlag {
    pub const COUNT: usize = 18;
}

/// 카메라 입력의 기본 키 배치. 전부 Hold 정책으로 묶임
pub const DEFAULT_BINDINGS: [(VirtualKeyCode, CameraFlag); CameraFlag::COUNT] = [
    (VirtualKeyCode::W, CameraFlag::MoveForward),
    (VirtualKeyCode::S, CameraFlag::MoveBack),
    (VirtualKeyCode::D, CameraFlag::MoveRight),
    (VirtualKeyCode::A, CameraFlag::MoveLeft),
    (VirtualKeyCode::Space, CameraFlag::MoveUp),
    (VirtualKeyCode::LShift, CameraFlag::MoveDown),
    (VirtualKeyCode::Numpad8, CameraFlag::PitchUp),
    (VirtualKeyCode::Numpad2, CameraFlag::PitchDown),
    (VirtualKeyCode::Numpad6, CameraFlag::YawRight),
    (VirtualKeyCode::Numpad4, CameraFlag::YawLeft),
    (VirtualKeyCode::Numpad9, CameraFlag::RollForward),
    (VirtualKeyCode::Numpad7, CameraFlag::RollBack),
    (VirtualKeyCode::NumpadAdd, CameraFlag::ZoomIn),
    (VirtualKeyCode::NumpadSubtract, CameraFlag::ZoomOut),
    (VirtualKeyCode::X, CameraFlag::LensWide),
    (VirtualKeyCode::Z, CameraFlag::LensShrink),
    (VirtualKeyCode::V, CameraFlag::FovUp),
    (VirtualKeyCode::C, CameraFlag::FovDown),
];

/// 쉐이더에 넘기는 한 프레임 분량의 카메라 정보
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameParameters {
    pub eye: Point3<f32>,
    pub lens_radius: f32,
    /// `rays[x][y]`: 0은 음의 방향 모서리, 1은 양의 방향 모서리.
    /// 길이가 곧 초점 거리
    pub rays: [[Vector3<f32>; 2]; 2],
}

/// 얇은 렌즈 모델을 쓰는 비행(fly) 카메라
#[derive(Debug, Clone)]
pub struct Camera {
    position: Point3<f32>,
    look_at: Point3<f32>,
    up: Vector3<f32>,

    // 도 단위
    fov: f32,
    // width / height
    aspect_ratio: f32,

    aperture: f32,
    focal_distance: f32,

    inputs: [bool; CameraFlag::COUNT],
}

impl Camera {
    pub fn new(viewport_size: PhysicalSize<u32>) -> Self {
        let mut camera = Self {
            position: Point3::new(3.0, 2.0, 7.0),
            look_at: Point3::new(-2.0, 0.5, 0.0),
            up: Vector3::y(),
            fov: 90.0,
            aspect_ratio: 1.0,
            aperture: 0.5,
            focal_distance: 3.0,
            inputs: [false; CameraFlag::COUNT],
        };
        camera.set_aspect_ratio(viewport_size);
        camera.orthogonalize_up();

        camera
    }

    pub fn with_pose(
        position: Point3<f32>,
        look_at: Point3<f32>,
        up: Vector3<f32>,
        viewport_size: PhysicalSize<u32>,
    ) -> Result<Self, CameraError> {
        let mut camera = Self::new(viewport_size);
        camera.set_pose(position, look_at, up)?;
        Ok(camera)
    }

    /// 시점을 바꾸고 up을 시선 방향에 수직이 되게 맞춤
    pub fn set_pose(
        &mut self,
        position: Point3<f32>,
        look_at: Point3<f32>,
        up: Vector3<f32>,
    ) -> Result<(), CameraError> {
        let view = look_at - position;
        if view.norm_squared() <= f32::EPSILON * f32::EPSILON {
            return Err(CameraError::Degenerate);
        }
        let forward = view.normalize();
        (up - forward * forward.dot(&up))
            .try_normalize(f32::EPSILON)
            .ok_or(CameraError::ParallelUp)?;

        self.position = position;
        self.look_at = look_at;
        self.up = up;
        self.orthogonalize_up();

        Ok(())
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn look_at(&self) -> Point3<f32> {
        self.look_at
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn aperture(&self) -> f32 {
        self.aperture
    }

    pub fn focal_distance(&self) -> f32 {
        self.focal_distance
    }

    pub fn set_focal_distance(&mut self, focal_distance: f32) {
        self.focal_distance = focal_distance.max(MIN_FOCAL_DIST);
    }

    pub fn set_aspect_ratio(&mut self, viewport_size: PhysicalSize<u32>) {
        if viewport_size.width == 0 || viewport_size.height == 0 {
            return;
        }
        self.aspect_ratio = viewport_size.width as f32 / viewport_size.height as f32;
    }

    pub fn flag(&self, flag: CameraFlag) -> bool {
        self.inputs[flag as usize]
    }

    pub fn flag_mut(&mut self, flag: CameraFlag) -> &mut bool {
        &mut self.inputs[flag as usize]
    }

    pub fn release_all(&mut self) {
        self.inputs = [false; CameraFlag::COUNT];
    }

    // forward, up, right가 카메라의 오른손 정규직교 기저
    pub fn forward(&self) -> Vector3<f32> {
        (self.look_at - self.position).normalize()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(&self.up).normalize()
    }

    fn basis(&self) -> Matrix3<f32> {
        Matrix3::from_columns(&[self.forward(), self.up, self.right()])
    }

    fn orthogonalize_up(&mut self) {
        let forward = self.forward();
        // up에서 forward 성분을 빼서 서로 수직으로 만듦
        if let Some(up) = (self.up - forward * forward.dot(&self.up)).try_normalize(f32::EPSILON) {
            self.up = up;
        }
    }

    pub fn frame_parameters(&self) -> FrameParameters {
        let forward = self.forward();
        let right = self.right();
        let up = self.up.normalize();

        let tan_half_fov = (self.fov.to_radians() / 2.0).tan();
        let delta_x = right * (forward.norm() * tan_half_fov);
        let delta_y = up * (forward.norm() / self.aspect_ratio * tan_half_fov);

        let corner = |sx: f32, sy: f32| {
            (forward + delta_x * sx + delta_y * sy).normalize() * self.focal_distance
        };

        FrameParameters {
            eye: self.position,
            lens_radius: self.aperture / 2.0,
            rays: [
                [corner(-1.0, -1.0), corner(-1.0, 1.0)],
                [corner(1.0, -1.0), corner(1.0, 1.0)],
            ],
        }
    }

    /// 현재 입력 상태로 한 프레임만큼 카메라를 움직임. 뭔가 바뀌었으면 true
    pub fn update(&mut self) -> bool {
        let translated = self.translate();
        let rotated = self.rotate();
        let adjusted = self.adjust_lens();

        translated | rotated | adjusted
    }

    fn axis(&self, positive: CameraFlag, negative: CameraFlag) -> f32 {
        (self.flag(positive) as i8 - self.flag(negative) as i8) as f32
    }

    fn translate(&mut self) -> bool {
        let dx = self.axis(CameraFlag::MoveForward, CameraFlag::MoveBack) * CAMERA_SPEED;
        let dy = self.axis(CameraFlag::MoveUp, CameraFlag::MoveDown) * CAMERA_SPEED;
        let dz = self.axis(CameraFlag::MoveRight, CameraFlag::MoveLeft) * CAMERA_SPEED;

        let delta = self.forward() * dx + self.right() * dz + self.up * dy;
        if delta.norm() <= 0.0 {
            return false;
        }

        // 둘 다 옮겨야 보는 방향이 유지됨
        self.position += delta;
        self.look_at += delta;
        true
    }

    fn rotate(&mut self) -> bool {
        let d_phi_y = self.axis(CameraFlag::YawRight, CameraFlag::YawLeft) * CAMERA_ROT_SPEED;
        let d_phi_z = self.axis(CameraFlag::PitchDown, CameraFlag::PitchUp) * CAMERA_ROT_SPEED;
        let d_phi_x = self.axis(CameraFlag::RollBack, CameraFlag::RollForward) * CAMERA_ROT_SPEED;

        if d_phi_x == 0.0 && d_phi_y == 0.0 && d_phi_z == 0.0 {
            return false;
        }

        // 카메라 좌표계 기준: x = forward, y = up, z = right. 요 → 피치 → 롤 순서
        let local = Rotation3::from_axis_angle(&Vector3::y_axis(), d_phi_y)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), d_phi_z)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), d_phi_x);

        let basis = self.basis();
        let Some(inverse) = basis.try_inverse() else {
            return false;
        };
        let world = (basis * local.matrix() * inverse).transpose();

        let view = world * (self.look_at - self.position);
        self.look_at = self.position + view;
        self.up = world * self.up;

        // 회전을 반복하면 오차가 쌓이니 매번 다시 직교화
        self.orthogonalize_up();
        true
    }

    fn adjust_lens(&mut self) -> bool {
        let mut changed = false;

        // 경계를 넘는 변화량은 잘라내지 않고 그 프레임은 통째로 버림
        let d_focal = self.axis(CameraFlag::ZoomIn, CameraFlag::ZoomOut) * FOCAL_SPEED;
        if d_focal != 0.0 && self.focal_distance + d_focal >= MIN_FOCAL_DIST {
            self.focal_distance += d_focal;
            changed = true;
        }

        let d_aperture = self.axis(CameraFlag::LensWide, CameraFlag::LensShrink) * APERTURE_SPEED;
        if d_aperture != 0.0 && self.aperture + d_aperture >= 0.0 {
            self.aperture += d_aperture;
            changed = true;
        }

        let d_fov = self.axis(CameraFlag::FovUp, CameraFlag::FovDown) * FOV_SPEED;
        let fov = self.fov + d_fov;
        if d_fov != 0.0 && MIN_FOV < fov && fov < MAX_FOV {
            self.fov = fov;
            changed = true;
        }

        changed
    }
}

impl FlagSlots<CameraFlag> for Camera {
    fn slot_mut(&mut self, slot: CameraFlag) -> &mut bool {
        self.flag_mut(slot)
    }
}

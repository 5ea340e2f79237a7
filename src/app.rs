use std::iter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use egui::{self, ClippedPrimitive};
use log::{info, warn};
use wgpu::{
    Backends, Color, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode, Device, DeviceDescriptor,
    Dx12Compiler, Features, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference, PresentMode,
    Queue, RenderPassColorAttachment, RenderPassDescriptor, RequestAdapterOptions, Surface, SurfaceConfiguration,
    SurfaceError, TextureUsages, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::{VirtualKeyCode, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::Window;

use crate::camera::{Camera, CameraFlag, DEFAULT_BINDINGS};
use crate::config::{Graphics, Options};
use crate::input::{FlagSlots, InputMap, KeyAction, KeyTracker, Policy};
use crate::scene::{BodyKind, Scene};
use crate::tracer::Tracer;

/// 키 하나로 켜고 끄는 요청들
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    Screenshot,
    LowGraphics,
    Info,
    Focus,
}

impl Toggle {
    pub const COUNT: usize = 4;
}

/// 키에 묶을 수 있는 값
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Camera(CameraFlag),
    Toggle(Toggle),
}

pub fn default_bindings() -> InputMap<VirtualKeyCode, Slot> {
    let mut bindings = InputMap::new();
    for (key, flag) in DEFAULT_BINDINGS {
        bindings.bind(key, Slot::Camera(flag), Policy::Hold);
    }

    bindings.bind(VirtualKeyCode::F3, Slot::Toggle(Toggle::Screenshot), Policy::Switch);
    bindings.bind(VirtualKeyCode::P, Slot::Toggle(Toggle::LowGraphics), Policy::Switch);
    bindings.bind(VirtualKeyCode::I, Slot::Toggle(Toggle::Info), Policy::Switch);
    bindings.bind(VirtualKeyCode::F, Slot::Toggle(Toggle::Focus), Policy::Switch);

    bindings
}

/// 키 입력이 바꾸는 상태 전부
#[derive(Debug, Clone)]
pub struct Controls {
    pub camera: Camera,
    toggles: [bool; Toggle::COUNT],
}

impl Controls {
    pub fn new(camera: Camera) -> Self {
        Self {
            camera,
            toggles: [false; Toggle::COUNT],
        }
    }

    pub fn toggle(&self, toggle: Toggle) -> bool {
        self.toggles[toggle as usize]
    }

    pub fn toggle_mut(&mut self, toggle: Toggle) -> &mut bool {
        &mut self.toggles[toggle as usize]
    }

    /// 요청을 읽으면서 끔
    pub fn take(&mut self, toggle: Toggle) -> bool {
        std::mem::take(&mut self.toggles[toggle as usize])
    }
}

impl FlagSlots<Slot> for Controls {
    fn slot_mut(&mut self, slot: Slot) -> &mut bool {
        match slot {
            Slot::Camera(flag) => self.camera.flag_mut(flag),
            Slot::Toggle(toggle) => self.toggle_mut(toggle),
        }
    }
}

pub struct Application {
    surface: Surface,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    // 무조건 winit의 Window를 쓸 것!
    pub window: Window,
    egui_state: egui_winit::State,
    egui_context: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,

    tracer: Tracer,
    scene: Scene,
    options: Options,
    bindings: InputMap<VirtualKeyCode, Slot>,
    tracker: KeyTracker,
    controls: Controls,

    last_graphics: Graphics,
    last_info: String,
    started: Instant,
}

impl Application {
    pub async fn new(
        window: Window,
        event_loop: &EventLoop<()>,
        scene: Scene,
        options: Options,
    ) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // window가 surface보다 오래 살아야 함. 둘 다 Application이 들고 있음
        let surface = unsafe { instance.create_surface(&window) }.context("Failed to create a surface")?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .context("No compatible GPU adapter")?;
        info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: Limits::default(),
                    label: Some("Glint GPU"),
                },
                None,
            )
            .await
            .context("Failed to request a device")?;

        let capabilities = surface.get_capabilities(&adapter);
        // 누적 버퍼는 선형 색상이므로 sRGB 표면에 그대로 씀
        let surface_format = capabilities
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .or_else(|| capabilities.formats.first().copied())
            .context("Surface reports no formats")?;
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let tracer = Tracer::new(&device, surface_format, &scene, PhysicalSize::new(config.width, config.height))?;

        let egui_state = egui_winit::State::new(event_loop);
        let egui_context = egui::Context::default();
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1);
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let last_graphics = options.graphics(false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
            tracer,
            scene,
            options,
            bindings: default_bindings(),
            tracker: KeyTracker::default(),
            controls: Controls::new(Camera::new(size)),
            last_graphics,
            last_info: String::from("nothing"),
            started: Instant::now(),
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.window.scale_factor() as f32;
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];

        self.tracer.resize(&self.device, new_size);
        self.controls.camera.set_aspect_ratio(new_size);
    }

    /// 입력이 반영된 카메라를 한 단계 움직임. 바뀌었으면 누적을 다시 시작
    pub fn update(&mut self) {
        if self.controls.camera.update() {
            self.tracer.restart();
        }
    }

    fn graphics(&self) -> Graphics {
        self.options.graphics(self.controls.toggle(Toggle::LowGraphics))
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Encoder"),
        });

        let graphics = self.graphics();
        if graphics != self.last_graphics {
            info!("Graphics settings changed to {graphics:?}");
            self.last_graphics = graphics;
            self.tracer.restart();
        }

        let uniforms = self.tracer.uniforms(
            &self.controls.camera.frame_parameters(),
            graphics,
            self.started.elapsed().as_secs_f32(),
        );
        self.tracer.dispatch(&self.queue, &mut encoder, &uniforms);

        // render_pass가 encoder를 빌려가므로 블록으로 감쌈
        {
            let primitives = self.update_egui(&mut encoder);
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.tracer.present(&mut render_pass);
            self.egui_renderer.render(&mut render_pass, &primitives, &self.egui_screen);
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        self.handle_requests();

        Ok(())
    }

    // true: 앱에서 입력 처리를 했으니 따로 관리할 필요 없음
    // false: 아래 event loop에서 처리 해야 함.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        let egui_response = self.egui_state.on_event(&self.egui_context, event);
        if egui_response.consumed {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput { input, .. } => match self.tracker.track(input) {
                Some((key, action)) => self.bindings.dispatch(&key, action, &mut self.controls),
                None => false,
            },
            // 포커스를 잃은 동안의 Released는 오지 않음
            WindowEvent::Focused(false) => {
                self.release_keys();
                false
            }
            _ => false,
        }
    }

    /// 눌린 채로 남은 키를 모두 뗌. 토글은 그대로 둠
    fn release_keys(&mut self) {
        for key in self.tracker.release_all() {
            self.bindings.dispatch(&key, KeyAction::Release, &mut self.controls);
        }
        self.controls.camera.release_all();
    }

    /// 이번 프레임에 켜진 스크린샷/정보/초점 요청을 처리하고 끔
    fn handle_requests(&mut self) {
        if self.controls.take(Toggle::Screenshot) {
            match self.tracer.capture(&self.device, &self.queue) {
                // 인코딩은 기다리지 않음
                Ok(capture) => drop(capture.save_in_background(PathBuf::from("."))),
                Err(err) => warn!("Failed to capture a screenshot: {err:#}"),
            }
        }

        if self.controls.take(Toggle::Info) {
            match self.tracer.read_probe(&self.device, &self.queue) {
                Ok(probe) => {
                    self.last_info = self.scene.describe_object_at(probe.index);
                    info!("You are looking at {}", self.last_info);
                }
                Err(err) => warn!("Failed to read the object under the crosshair: {err:#}"),
            }
        }

        if self.controls.take(Toggle::Focus) {
            match self.tracer.read_probe(&self.device, &self.queue) {
                Ok(probe) => match probe.hit() {
                    Some(distance) => {
                        self.controls.camera.set_focal_distance(distance);
                        self.tracer.restart();
                        info!("Focused at distance {:.3}", self.controls.camera.focal_distance());
                    }
                    None => info!("Nothing to focus on"),
                },
                Err(err) => warn!("Failed to read the object under the crosshair: {err:#}"),
            }
        }
    }

    fn update_egui(&mut self, encoder: &mut CommandEncoder) -> Vec<ClippedPrimitive> {
        let camera = &self.controls.camera;
        let position = camera.position();
        let look_at = camera.look_at();
        let readout = [
            format!("position: ({:.2}, {:.2}, {:.2})", position.x, position.y, position.z),
            format!("look at: ({:.2}, {:.2}, {:.2})", look_at.x, look_at.y, look_at.z),
            format!("fov: {:.1} (aspect {:.3})", camera.fov(), camera.aspect_ratio()),
            format!("aperture: {:.3}", camera.aperture()),
            format!("focal distance: {:.2}", camera.focal_distance()),
        ];
        let counts = format!(
            "{} boxes, {} balls",
            self.scene.group(BodyKind::Box).len(),
            self.scene.group(BodyKind::Ball).len()
        );
        let samples = format!(
            "frame: {}, samples: {}",
            self.tracer.frame_index(),
            self.tracer.sample_index()
        );
        let last_info = self.last_info.as_str();
        let low_graphics = self.controls.toggle_mut(Toggle::LowGraphics);

        let egui_input = self.egui_state.take_egui_input(&self.window);
        let egui_output = self.egui_context.run(egui_input, |ctx| {
            egui::SidePanel::right("Side Menu")
                .resizable(true)
                .width_range(0.0..=512.0)
                .default_width(180.0)
                .show(ctx, |ui| {
                    ui.heading("Camera");
                    for line in &readout {
                        ui.label(line.as_str());
                    }
                    ui.separator();

                    ui.heading("Scene");
                    ui.label(counts.as_str());
                    ui.label(samples.as_str());
                    ui.label(format!("looking at: {last_info}"));
                    ui.separator();

                    ui.checkbox(low_graphics, "Low graphics");
                });
        });

        self.egui_state
            .handle_platform_output(&self.window, &self.egui_context, egui_output.platform_output);
        let primitives = self.egui_context.tessellate(egui_output.shapes);
        for (id, delta) in &egui_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        }
        for id in &egui_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.egui_renderer
            .update_buffers(&self.device, &self.queue, encoder, &primitives, &self.egui_screen);

        primitives
    }
}

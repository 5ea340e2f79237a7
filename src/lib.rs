use anyhow::Context;
use log::{error, info, warn};
use wgpu::SurfaceError;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::app::Application;
use crate::config::Options;
use crate::scene::{random_scene, Scene};

pub mod app;
pub mod camera;
pub mod config;
pub mod input;
pub mod scene;
pub mod tracer;

/// 장면을 준비하고 창을 띄운 뒤 이벤트 루프를 돌림. 정상적으로는 돌아오지 않음
pub fn run(options: Options) -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("glint=info")).init();

    let scene = match &options.scene {
        Some(path) => {
            Scene::load(path).with_context(|| format!("Failed to load scene {}", path.display()))?
        }
        None => {
            let seed = options.resolved_seed();
            info!("Generating a random scene with seed {seed}");
            random_scene(seed)
        }
    };

    if let Some(path) = &options.dump_scene {
        scene
            .save(path)
            .with_context(|| format!("Failed to write scene {}", path.display()))?;
        info!("Wrote the scene to {}", path.display());
    }

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Glint: Ray Tracer")
        .with_inner_size(options.window_size())
        .build(&event_loop)
        .context("Failed to create a window")?;

    let mut app = pollster::block_on(Application::new(window, &event_loop, scene, options))?;

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => {
            if app.input(event) {
                return;
            }

            match event {
                // 운영체제가 창을 닫으려 하거나 ESC가 눌리면 나가기
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::ExitWithCode(0),

                WindowEvent::Resized(physical_size) => app.resize(*physical_size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => app.resize(**new_inner_size),

                _ => {}
            }
        }

        Event::RedrawRequested(window_id) if window_id == app.window.id() => match app.render() {
            Ok(()) => {}
            // 표면을 잃었으면 다시 설정
            Err(SurfaceError::Lost | SurfaceError::Outdated) => app.resize(app.size),
            Err(SurfaceError::OutOfMemory) => {
                error!("GPU is out of memory");
                *control_flow = ControlFlow::ExitWithCode(1);
            }
            Err(err) => warn!("Skipped a frame: {err}"),
        },

        Event::MainEventsCleared => {
            app.update();
            app.window.request_redraw();
        }

        _ => {}
    });
}

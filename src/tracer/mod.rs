use std::mem::size_of;
use std::sync::mpsc;

use anyhow::{anyhow, Context};
use bytemuck::{Pod, Zeroable};
use log::info;
use wgpu::util::{BufferInitDescriptor, DeviceExt};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType, BufferDescriptor, BufferUsages,
    ColorTargetState, ColorWrites, CommandEncoder, CommandEncoderDescriptor, ComputePassDescriptor,
    ComputePipeline, ComputePipelineDescriptor, Device, ErrorFilter, FragmentState, MapMode,
    Maintain, MultisampleState, PipelineLayoutDescriptor, PrimitiveState, Queue, RenderPass,
    RenderPipeline, RenderPipelineDescriptor, ShaderModule, ShaderModuleDescriptor, ShaderSource,
    ShaderStages, TextureFormat, VertexState,
};
use winit::dpi::PhysicalSize;

use crate::camera::FrameParameters;
use crate::config::Graphics;
use crate::scene::Scene;
use crate::tracer::screenshot::Capture;

pub mod screenshot;
pub mod shader;

const WORKGROUP_SIZE: u32 = 8;
const PIXEL_BYTES: u64 = size_of::<[f32; 4]>() as u64;

/// 쉐이더의 `Frame` 유니폼 블록과 같은 배치 (std140)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub eye_lens: [f32; 4],
    pub rays: [[f32; 4]; 4],
    pub resolution: [u32; 2],
    pub frame_index: u32,
    pub sample_index: u32,
    pub monte_carlo_frames: u32,
    pub anti_aliasing: u32,
    pub max_depth: u32,
    pub time: f32,
}

impl FrameUniforms {
    pub fn new(
        camera: &FrameParameters,
        graphics: Graphics,
        size: PhysicalSize<u32>,
        frame_index: u32,
        sample_index: u32,
        time: f32,
    ) -> Self {
        let eye = camera.eye;
        let ray = |x: usize, y: usize| {
            let ray = camera.rays[x][y];
            [ray.x, ray.y, ray.z, 0.0]
        };

        Self {
            eye_lens: [eye.x, eye.y, eye.z, camera.lens_radius],
            rays: [ray(0, 0), ray(0, 1), ray(1, 0), ray(1, 1)],
            resolution: [size.width, size.height],
            frame_index,
            sample_index,
            monte_carlo_frames: graphics.monte_carlo_frames.max(1),
            anti_aliasing: graphics.anti_aliasing.max(1),
            max_depth: graphics.max_depth,
            time,
        }
    }
}

/// 화면 가운데 픽셀의 1차 광선이 맞은 물체
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Probe {
    /// 전역 물체 인덱스, 아무것도 없으면 -1
    pub index: i32,
    pub distance: f32,
}

impl Probe {
    pub const NOTHING: Self = Self {
        index: -1,
        distance: 0.0,
    };

    pub fn hit(&self) -> Option<f32> {
        (self.index != -1).then_some(self.distance)
    }
}

/// 장면이 박힌 컴퓨트 쉐이더와 누적 버퍼, 화면 출력용 파이프라인
pub struct Tracer {
    compute_pipeline: ComputePipeline,
    present_pipeline: RenderPipeline,
    compute_layout: BindGroupLayout,
    present_layout: BindGroupLayout,
    compute_bind_group: BindGroup,
    present_bind_group: BindGroup,

    uniforms: Buffer,
    accumulation: Buffer,
    probe: Buffer,

    size: PhysicalSize<u32>,
    frame_index: u32,
    sample_index: u32,
}

impl Tracer {
    pub fn new(
        device: &Device,
        surface_format: TextureFormat,
        scene: &Scene,
        size: PhysicalSize<u32>,
    ) -> anyhow::Result<Self> {
        let source = shader::expand(shader::RAYTRACE_TEMPLATE, scene)
            .context("Failed to generate the ray tracing shader")?;
        info!(
            "Generated ray tracing shader for {} objects ({} bytes)",
            scene.len(),
            source.len()
        );

        let compute_module = create_module(
            device,
            "Ray Tracing Shader",
            ShaderSource::Glsl {
                shader: source.into(),
                stage: naga::ShaderStage::Compute,
                defines: Default::default(),
            },
        )?;
        let present_module = create_module(
            device,
            "Present Shader",
            ShaderSource::Wgsl(shader::PRESENT_SHADER.into()),
        )?;

        let compute_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Ray Tracing Bind Group Layout"),
            entries: &[
                buffer_entry(0, ShaderStages::COMPUTE, BufferBindingType::Uniform),
                buffer_entry(1, ShaderStages::COMPUTE, BufferBindingType::Storage { read_only: false }),
                buffer_entry(2, ShaderStages::COMPUTE, BufferBindingType::Storage { read_only: false }),
            ],
        });
        let present_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Present Bind Group Layout"),
            entries: &[
                buffer_entry(0, ShaderStages::FRAGMENT, BufferBindingType::Uniform),
                buffer_entry(1, ShaderStages::FRAGMENT, BufferBindingType::Storage { read_only: true }),
            ],
        });

        device.push_error_scope(ErrorFilter::Validation);
        let compute_pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("Ray Tracing Pipeline"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("Ray Tracing Pipeline Layout"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[],
            })),
            module: &compute_module,
            entry_point: "main",
        });
        let present_pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Present Pipeline"),
            layout: Some(&device.create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some("Present Pipeline Layout"),
                bind_group_layouts: &[&present_layout],
                push_constant_ranges: &[],
            })),
            vertex: VertexState {
                module: &present_module,
                entry_point: "vs_main",
                buffers: &[],
            },
            primitive: PrimitiveState::default(),
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &present_module,
                entry_point: "fs_main",
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: ColorWrites::ALL,
                })],
            }),
            multiview: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(anyhow!("Failed to create pipelines: {err}"));
        }

        let uniforms = device.create_buffer(&BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: size_of::<FrameUniforms>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let probe = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("Probe"),
            contents: bytemuck::bytes_of(&Probe::NOTHING),
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
        });
        let accumulation = create_accumulation(device, size);

        let compute_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Ray Tracing Bind Group"),
            layout: &compute_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: accumulation.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: probe.as_entire_binding(),
                },
            ],
        });
        let present_bind_group = create_present_bind_group(device, &present_layout, &uniforms, &accumulation);

        Ok(Self {
            compute_pipeline,
            present_pipeline,
            compute_layout,
            present_layout,
            compute_bind_group,
            present_bind_group,
            uniforms,
            accumulation,
            probe,
            size,
            frame_index: 0,
            sample_index: 0,
        })
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn sample_index(&self) -> u32 {
        self.sample_index
    }

    /// 카메라나 품질 설정이 바뀌면 누적을 처음부터 다시 함
    pub fn restart(&mut self) {
        self.sample_index = 0;
    }

    pub fn resize(&mut self, device: &Device, new_size: PhysicalSize<u32>) {
        if self.size == new_size || new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.accumulation = create_accumulation(device, new_size);
        self.compute_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("Ray Tracing Bind Group"),
            layout: &self.compute_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: self.uniforms.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: self.accumulation.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: self.probe.as_entire_binding(),
                },
            ],
        });
        self.present_bind_group =
            create_present_bind_group(device, &self.present_layout, &self.uniforms, &self.accumulation);
        self.restart();
    }

    pub fn uniforms(&self, camera: &FrameParameters, graphics: Graphics, time: f32) -> FrameUniforms {
        FrameUniforms::new(camera, graphics, self.size, self.frame_index, self.sample_index, time)
    }

    /// 한 프레임 분량의 광선을 쏨. 끝나면 프레임/샘플 번호가 하나씩 올라감
    pub fn dispatch(&mut self, queue: &Queue, encoder: &mut CommandEncoder, uniforms: &FrameUniforms) {
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(uniforms));

        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("Ray Tracing Pass"),
            });
            pass.set_pipeline(&self.compute_pipeline);
            pass.set_bind_group(0, &self.compute_bind_group, &[]);
            pass.dispatch_workgroups(
                (self.size.width + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE,
                (self.size.height + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE,
                1,
            );
        }

        self.frame_index = self.frame_index.wrapping_add(1);
        self.sample_index = self.sample_index.saturating_add(1);
    }

    pub fn present<'a>(&'a self, render_pass: &mut RenderPass<'a>) {
        render_pass.set_pipeline(&self.present_pipeline);
        render_pass.set_bind_group(0, &self.present_bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    /// 마지막으로 끝난 프레임의 가운데 픽셀 정보. GPU를 기다림
    pub fn read_probe(&self, device: &Device, queue: &Queue) -> anyhow::Result<Probe> {
        let bytes = read_back(device, queue, &self.probe, size_of::<Probe>() as u64)?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    /// 누적 버퍼의 사본. 인코딩은 받는 쪽에서 함
    pub fn capture(&self, device: &Device, queue: &Queue) -> anyhow::Result<Capture> {
        let size = self.size.width as u64 * self.size.height as u64 * PIXEL_BYTES;
        let bytes = read_back(device, queue, &self.accumulation, size)?;

        Ok(Capture {
            width: self.size.width,
            height: self.size.height,
            pixels: bytemuck::pod_collect_to_vec(&bytes),
        })
    }
}

fn create_module(device: &Device, label: &str, source: ShaderSource) -> anyhow::Result<ShaderModule> {
    device.push_error_scope(ErrorFilter::Validation);
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(label),
        source,
    });

    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(anyhow!("Failed to compile {label}: {err}")),
        None => Ok(module),
    }
}

fn buffer_entry(binding: u32, visibility: ShaderStages, ty: BufferBindingType) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_accumulation(device: &Device, size: PhysicalSize<u32>) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some("Accumulation"),
        size: (size.width.max(1) as u64) * (size.height.max(1) as u64) * PIXEL_BYTES,
        usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    })
}

fn create_present_bind_group(
    device: &Device,
    layout: &BindGroupLayout,
    uniforms: &Buffer,
    accumulation: &Buffer,
) -> BindGroup {
    device.create_bind_group(&BindGroupDescriptor {
        label: Some("Present Bind Group"),
        layout,
        entries: &[
            BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            BindGroupEntry {
                binding: 1,
                resource: accumulation.as_entire_binding(),
            },
        ],
    })
}

/// 버퍼 앞부분 `size` 바이트를 CPU로 복사해 옴
fn read_back(device: &Device, queue: &Queue, source: &Buffer, size: u64) -> anyhow::Result<Vec<u8>> {
    let staging = device.create_buffer(&BufferDescriptor {
        label: Some("Readback"),
        size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(MapMode::Read, move |result| {
        let _ = sender.send(result);
    });
    device.poll(Maintain::Wait);
    receiver
        .recv()
        .context("GPU readback was dropped")?
        .context("Failed to map readback buffer")?;

    let bytes = slice.get_mapped_range().to_vec();
    staging.unmap();
    Ok(bytes)
}

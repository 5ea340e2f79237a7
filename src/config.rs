use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use winit::dpi::PhysicalSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Resolution {
    /// 1080x720
    Hd,
    /// 1920x1080
    Fullhd,
}

/// 실시간 GPU 레이 트레이서
#[derive(Debug, Clone, Parser)]
#[command(name = "glint", version)]
pub struct Options {
    /// Path to a JSON scene description (if not set, a random scene is generated)
    #[arg(long)]
    pub scene: Option<PathBuf>,

    /// Seed for random scene generation (if negative, the current UNIX time is used)
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    pub seed: i64,

    /// Screen width in pixels
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Screen height in pixels
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Overrides width and height
    #[arg(long, value_enum)]
    pub resolution: Option<Resolution>,

    /// Number of frames for Monte Carlo denoising
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub mcfc: u32,

    /// Anti-aliasing samples per pixel
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    pub alias: u32,

    /// Maximum recursion depth for ray tracing
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub depth: u32,

    /// Write the scene in use as a JSON description
    #[arg(long)]
    pub dump_scene: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scene: None,
            seed: -1,
            width: 640,
            height: 480,
            resolution: None,
            mcfc: 20,
            alias: 4,
            depth: 10,
            dump_scene: None,
        }
    }
}

impl Options {
    pub fn window_size(&self) -> PhysicalSize<u32> {
        match self.resolution {
            Some(Resolution::Hd) => PhysicalSize::new(1080, 720),
            Some(Resolution::Fullhd) => PhysicalSize::new(1920, 1080),
            None => PhysicalSize::new(self.width, self.height),
        }
    }

    /// 음수 시드는 현재 시각으로 대체
    pub fn resolved_seed(&self) -> u64 {
        u64::try_from(self.seed).unwrap_or_else(|_| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default()
        })
    }

    pub fn graphics(&self, low: bool) -> Graphics {
        if low {
            Graphics::LOW
        } else {
            Graphics {
                monte_carlo_frames: self.mcfc,
                anti_aliasing: self.alias,
                max_depth: self.depth,
            }
        }
    }
}

/// 쉐이더에 넘기는 품질 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Graphics {
    pub monte_carlo_frames: u32,
    pub anti_aliasing: u32,
    pub max_depth: u32,
}

impl Graphics {
    pub const LOW: Self = Self {
        monte_carlo_frames: 1,
        anti_aliasing: 1,
        max_depth: 2,
    };
}

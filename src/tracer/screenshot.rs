use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use chrono::{DateTime, Local};
use image::RgbaImage;
use log::{error, info};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("pixel buffer holds {actual} pixels, expected {width}x{height}")]
    SizeMismatch { width: u32, height: u32, actual: usize },

    #[error("failed to encode screenshot: {0}")]
    Image(#[from] image::ImageError),
}

/// GPU에서 읽어온 누적 버퍼의 사본. 프레임 루프는 이걸 넘기고 바로 다음 프레임으로 감
pub struct Capture {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[f32; 4]>,
}

impl Capture {
    pub fn to_image(&self) -> Result<RgbaImage, ScreenshotError> {
        let mismatch = || ScreenshotError::SizeMismatch {
            width: self.width,
            height: self.height,
            actual: self.pixels.len(),
        };
        if self.pixels.len() != (self.width as usize) * (self.height as usize) {
            return Err(mismatch());
        }

        RgbaImage::from_raw(self.width, self.height, to_rgba8(&self.pixels)).ok_or_else(mismatch)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ScreenshotError> {
        self.to_image()?.save(path)?;
        Ok(())
    }

    /// 인코딩은 별도 스레드에서. 결과는 로그로만 남김
    pub fn save_in_background(self, directory: PathBuf) -> JoinHandle<()> {
        thread::spawn(move || {
            let path = directory.join(file_name(Local::now()));
            match self.save(&path) {
                Ok(()) => info!("Saved a screenshot as {:?}", path.display()),
                Err(err) => error!("Failed to save a screenshot: {}", err),
            }
        })
    }
}

pub fn file_name(time: DateTime<Local>) -> String {
    format!("screenshot_{}.png", time.format("%d-%m-%Y_%H-%M-%S"))
}

/// 선형 색상 → sRGB 8비트
pub fn to_rgba8(pixels: &[[f32; 4]]) -> Vec<u8> {
    pixels
        .par_iter()
        .flat_map_iter(|[r, g, b, _]| [encode(*r), encode(*g), encode(*b), 0xFF])
        .collect()
}

fn encode(linear: f32) -> u8 {
    let c = linear.clamp(0.0, 1.0);
    let srgb = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (srgb * 255.0 + 0.5) as u8
}

use std::fmt;

use nalgebra::Point3;

/// 물체 모양 종류. 값이 곧 Scene 그룹 번호
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Box = 0,
    Ball = 1,
}

impl BodyKind {
    pub const ALL: [BodyKind; 2] = [BodyKind::Box, BodyKind::Ball];

    pub fn name(self) -> &'static str {
        match self {
            BodyKind::Box => "box",
            BodyKind::Ball => "ball",
        }
    }
}

/// 쉐이더 쪽 재질 코드와 같은 순서
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Mirror = 0,
    Lambertian = 1,
    Glass = 2,
}

impl MaterialKind {
    pub fn name(self) -> &'static str {
        match self {
            MaterialKind::Mirror => "mirror",
            MaterialKind::Lambertian => "lambertian",
            MaterialKind::Glass => "glass",
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

/// 8비트 RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// "ddbbbb" 같은 16진수 여섯 자리
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// 쉐이더 소스에 그대로 들어가는 `{r, g, b}` (0..1)
    pub fn literal(self) -> String {
        let unit = |c: u8| c as f32 / 255.0;
        format!("{{{:.6}, {:.6}, {:.6}}}", unit(self.r), unit(self.g), unit(self.b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { min: Point3<f32>, max: Point3<f32> },
    Ball { center: Point3<f32>, radius: f32 },
}

/// 물체의 기하 정보. 쉐이더에 들어갈 리터럴은 만들 때 한 번만 렌더링함
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    shape: Shape,
    desc: String,
}

impl Body {
    pub fn new_box(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self {
            shape: Shape::Box { min, max },
            desc: format!(
                "{{{{{:.6}, {:.6}, {:.6}}},{{{:.6}, {:.6}, {:.6}}}}}",
                min.x, min.y, min.z, max.x, max.y, max.z,
            ),
        }
    }

    pub fn new_ball(center: Point3<f32>, radius: f32) -> Self {
        Self {
            shape: Shape::Ball { center, radius },
            desc: format!(
                "{{{{{:.6}, {:.6}, {:.6}}}, {:.6}}}",
                center.x, center.y, center.z, radius,
            ),
        }
    }

    pub fn kind(&self) -> BodyKind {
        match self.shape {
            Shape::Box { .. } => BodyKind::Box,
            Shape::Ball { .. } => BodyKind::Ball,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }
}

/// 광학적 성질. Lambertian은 fuzz, eta가 언제나 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    kind: MaterialKind,
    color: Color,
    fuzz: f32,
    eta: f32,
}

impl Material {
    pub fn mirror(color: Color, fuzz: f32, eta: f32) -> Self {
        Self {
            kind: MaterialKind::Mirror,
            color,
            fuzz,
            eta,
        }
    }

    pub fn lambertian(color: Color) -> Self {
        Self {
            kind: MaterialKind::Lambertian,
            color,
            fuzz: 0.0,
            eta: 0.0,
        }
    }

    pub fn glass(color: Color, fuzz: f32, eta: f32) -> Self {
        Self {
            kind: MaterialKind::Glass,
            color,
            fuzz,
            eta,
        }
    }

    pub fn kind(&self) -> MaterialKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn fuzz(&self) -> f32 {
        self.fuzz
    }

    pub fn eta(&self) -> f32 {
        self.eta
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub body: Body,
    pub material: Material,
}

impl Object {
    pub fn new(body: Body, material: Material) -> Self {
        Self { body, material }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_literal_is_unit_scaled() {
        let color = Color::from_hex("ddbbbb").unwrap();
        assert_eq!(color, Color::new(0xdd, 0xbb, 0xbb));
        assert_eq!(color.literal(), "{0.866667, 0.733333, 0.733333}");
        assert_eq!(color.to_hex(), "ddbbbb");
    }

    #[test]
    fn bad_hex_is_rejected() {
        for bad in ["", "ddbbb", "ddbbbbb", "ggbbbb", "#ddbbb", "+1bbbb"] {
            assert_eq!(Color::from_hex(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn body_descriptors() {
        let cube = Body::new_box(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(cube.kind(), BodyKind::Box);
        assert_eq!(
            cube.desc(),
            "{{-1.000000, 0.000000, -1.000000},{1.000000, 1.000000, 1.000000}}"
        );

        let ball = Body::new_ball(Point3::new(0.5, 2.0, -3.0), 0.25);
        assert_eq!(ball.kind(), BodyKind::Ball);
        assert_eq!(ball.desc(), "{{0.500000, 2.000000, -3.000000}, 0.250000}");
    }

    #[test]
    fn lambertian_has_no_fuzz_or_eta() {
        let material = Material::lambertian(Color::new(1, 2, 3));
        assert_eq!(material.fuzz(), 0.0);
        assert_eq!(material.eta(), 0.0);
    }
}

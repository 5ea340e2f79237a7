use std::path::Path;

use nalgebra::Point3;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{Body, Color, Material, MaterialKind, Object, Scene, Shape};

/// 장면 설명을 읽다가 처음 만난 문제. 경로는 `objects[2].material.eta` 꼴
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("failed to read scene description: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed scene description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{path} not specified")]
    MissingField { path: String },

    #[error("{path}: invalid type, expected {expected}")]
    InvalidType { path: String, expected: &'static str },

    #[error("{path}: {reason}")]
    OutOfRange { path: String, reason: &'static str },

    #[error("{path}: unknown kind {kind:?}")]
    UnknownKind { path: String, kind: String },

    #[error("{path}: invalid color {value:?}, expected six hex digits")]
    InvalidColor { path: String, value: String },
}

impl Scene {
    /// JSON 배열로 된 물체 목록을 순서대로 추가함.
    ///
    /// 배열 자체가 깨져 있으면 아무것도 추가하지 않음. 물체 하나가 잘못됐으면
    /// 거기서 멈추고, 그 앞의 물체들은 이미 추가된 상태로 남음.
    pub fn parse_description(&mut self, data: &[u8]) -> Result<(), SceneError> {
        let objects: Vec<Value> = serde_json::from_slice(data)?;

        for (index, value) in objects.iter().enumerate() {
            let object = parse_object(value, format!("objects[{index}]"))?;
            self.add_object(object);
        }

        Ok(())
    }

    /// `parse_description`이 다시 읽을 수 있는 형식으로, 전역 인덱스 순서대로 내보냄
    pub fn to_json(&self) -> Result<String, SceneError> {
        let description: Vec<ObjectDescription> = self.objects().map(ObjectDescription::from).collect();
        Ok(serde_json::to_string_pretty(&description)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SceneError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

fn parse_object(value: &Value, path: String) -> Result<Object, SceneError> {
    let fields = Fields::of(value, path)?;
    let body = parse_body(&fields.object("body")?)?;
    let material = parse_material(&fields.object("material")?)?;

    Ok(Object::new(body, material))
}

fn parse_body(fields: &Fields) -> Result<Body, SceneError> {
    match fields.str("kind")? {
        "box" => Ok(Body::new_box(fields.vec3("min")?, fields.vec3("max")?)),
        "ball" => {
            let center = fields.vec3("center")?;
            let radius = fields.number("radius")?;
            if radius < 0.0 {
                return Err(fields.out_of_range("radius", "must not be negative"));
            }
            Ok(Body::new_ball(center, radius))
        }
        kind => Err(SceneError::UnknownKind {
            path: fields.field("kind"),
            kind: kind.to_owned(),
        }),
    }
}

fn parse_material(fields: &Fields) -> Result<Material, SceneError> {
    let kind = match fields.str("kind")? {
        "mirror" => MaterialKind::Mirror,
        "lambertian" => MaterialKind::Lambertian,
        "glass" => MaterialKind::Glass,
        kind => {
            return Err(SceneError::UnknownKind {
                path: fields.field("kind"),
                kind: kind.to_owned(),
            })
        }
    };

    let hex = fields.str("color")?;
    let color = Color::from_hex(hex).ok_or_else(|| SceneError::InvalidColor {
        path: fields.field("color"),
        value: hex.to_owned(),
    })?;

    if kind == MaterialKind::Lambertian {
        return Ok(Material::lambertian(color));
    }

    let fuzz = fields.number("fuzz")?;
    if !(0.0..=1.0).contains(&fuzz) {
        return Err(fields.out_of_range("fuzz", "must be in range [0, 1]"));
    }
    let eta = fields.number("eta")?;
    if eta <= 0.0 {
        return Err(fields.out_of_range("eta", "must be positive"));
    }

    Ok(match kind {
        MaterialKind::Mirror => Material::mirror(color, fuzz, eta),
        _ => Material::glass(color, fuzz, eta),
    })
}

/// 경로를 기억하는 JSON 객체 뷰
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, path: String) -> Result<Self, SceneError> {
        match value.as_object() {
            Some(map) => Ok(Self { map, path }),
            None => Err(SceneError::InvalidType {
                path,
                expected: "object",
            }),
        }
    }

    fn field(&self, name: &str) -> String {
        format!("{}.{}", self.path, name)
    }

    fn out_of_range(&self, name: &str, reason: &'static str) -> SceneError {
        SceneError::OutOfRange {
            path: self.field(name),
            reason,
        }
    }

    fn invalid_type(&self, name: &str, expected: &'static str) -> SceneError {
        SceneError::InvalidType {
            path: self.field(name),
            expected,
        }
    }

    fn get(&self, name: &str) -> Result<&'a Value, SceneError> {
        self.map.get(name).ok_or_else(|| SceneError::MissingField {
            path: self.field(name),
        })
    }

    fn object(&self, name: &str) -> Result<Fields<'a>, SceneError> {
        Fields::of(self.get(name)?, self.field(name))
    }

    fn str(&self, name: &str) -> Result<&'a str, SceneError> {
        self.get(name)?
            .as_str()
            .ok_or_else(|| self.invalid_type(name, "string"))
    }

    /// f32로 표현할 수 없는 값은 쉐이더 소스에 `inf`로 들어가므로 거부함
    fn number(&self, name: &str) -> Result<f32, SceneError> {
        let value = self
            .get(name)?
            .as_f64()
            .ok_or_else(|| self.invalid_type(name, "number"))? as f32;
        self.finite(name, value)
    }

    fn finite(&self, name: &str, value: f32) -> Result<f32, SceneError> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.out_of_range(name, "must be finite"))
        }
    }

    fn vec3(&self, name: &str) -> Result<Point3<f32>, SceneError> {
        let expected = "array of 3 numbers";
        let array = self
            .get(name)?
            .as_array()
            .filter(|array| array.len() == 3)
            .ok_or_else(|| self.invalid_type(name, expected))?;

        let mut point = Point3::origin();
        for (coord, value) in point.iter_mut().zip(array) {
            let value = value.as_f64().ok_or_else(|| self.invalid_type(name, expected))? as f32;
            *coord = self.finite(name, value)?;
        }

        Ok(point)
    }
}

#[derive(Serialize)]
struct ObjectDescription {
    body: BodyDescription,
    material: MaterialDescription,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum BodyDescription {
    Box { min: [f32; 3], max: [f32; 3] },
    Ball { center: [f32; 3], radius: f32 },
}

#[derive(Serialize)]
struct MaterialDescription {
    kind: &'static str,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fuzz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eta: Option<f32>,
}

impl From<&Object> for ObjectDescription {
    fn from(object: &Object) -> Self {
        let body = match *object.body.shape() {
            Shape::Box { min, max } => BodyDescription::Box {
                min: min.coords.into(),
                max: max.coords.into(),
            },
            Shape::Ball { center, radius } => BodyDescription::Ball {
                center: center.coords.into(),
                radius,
            },
        };

        let material = &object.material;
        let optical = material.kind() != MaterialKind::Lambertian;
        Self {
            body,
            material: MaterialDescription {
                kind: material.kind().name(),
                color: material.color().to_hex(),
                fuzz: optical.then(|| material.fuzz()),
                eta: optical.then(|| material.eta()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{random_scene, BodyKind};

    fn parse(json: &str) -> (Scene, Result<(), SceneError>) {
        let mut scene = Scene::new();
        let result = scene.parse_description(json.as_bytes());
        (scene, result)
    }

    #[test]
    fn parses_objects_in_order() {
        let (scene, result) = parse(
            r#"[
                {"body": {"kind": "box", "min": [-1, 0, -1], "max": [1, 1, 1]},
                 "material": {"kind": "lambertian", "color": "ddbbbb"}},
                {"body": {"kind": "ball", "center": [0, 1.5, 0], "radius": 0.5},
                 "material": {"kind": "glass", "color": "ffffff", "fuzz": 0.0, "eta": 1.5}},
                {"body": {"kind": "ball", "center": [2, 1, 0], "radius": 1},
                 "material": {"kind": "mirror", "color": "808080", "fuzz": 0.3, "eta": 1}}
            ]"#,
        );
        result.unwrap();

        assert_eq!(scene.len(), 3);
        assert_eq!(scene.group(BodyKind::Box).num(), 1);
        assert_eq!(scene.group(BodyKind::Ball).num(), 2);
        assert_eq!(
            scene.describe_object_at(0),
            "a lambertian box with (color = {0.866667, 0.733333, 0.733333})"
        );
        assert_eq!(
            scene.group(BodyKind::Ball).materials(),
            &[MaterialKind::Glass, MaterialKind::Mirror]
        );
        assert_eq!(
            scene.group(BodyKind::Ball).descs()[0],
            "{{0.000000, 1.500000, 0.000000}, 0.500000}"
        );
    }

    #[test]
    fn glass_without_eta_is_rejected() {
        let (scene, result) = parse(
            r#"[{"body": {"kind": "ball", "center": [0, 0, 0], "radius": 1},
                 "material": {"kind": "glass", "color": "ffffff", "fuzz": 0.1}}]"#,
        );

        let error = result.unwrap_err();
        assert!(matches!(&error, SceneError::MissingField { path } if path == "objects[0].material.eta"));
        assert!(error.to_string().contains("eta"));
        assert!(scene.is_empty());
    }

    #[test]
    fn lambertian_ignores_optical_fields() {
        let (scene, result) = parse(
            r#"[{"body": {"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]},
                 "material": {"kind": "lambertian", "color": "000000", "fuzz": 5, "eta": -1}}]"#,
        );
        result.unwrap();

        let group = scene.group(BodyKind::Box);
        assert_eq!(group.fuzzs(), &[0.0]);
        assert_eq!(group.etas(), &[0.0]);
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            (
                r#"{"kind": "ball", "center": [0, 0, 0], "radius": -1}"#,
                r#"{"kind": "lambertian", "color": "ffffff"}"#,
                "objects[0].body.radius",
            ),
            (
                r#"{"kind": "ball", "center": [0, 0], "radius": 1}"#,
                r#"{"kind": "lambertian", "color": "ffffff"}"#,
                "objects[0].body.center",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, "1", 1]}"#,
                r#"{"kind": "lambertian", "color": "ffffff"}"#,
                "objects[0].body.max",
            ),
            (
                r#"{"kind": "cone"}"#,
                r#"{"kind": "lambertian", "color": "ffffff"}"#,
                "objects[0].body.kind",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": "mirror", "color": "ffffff", "fuzz": 1.5, "eta": 1}"#,
                "objects[0].material.fuzz",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": "glass", "color": "ffffff", "fuzz": 0, "eta": 0}"#,
                "objects[0].material.eta",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": "glass", "color": "white", "fuzz": 0, "eta": 1}"#,
                "objects[0].material.color",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": "plastic", "color": "ffffff"}"#,
                "objects[0].material.kind",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": 3, "color": "ffffff"}"#,
                "objects[0].material.kind",
            ),
            (
                r#"{"kind": "ball", "center": [0, 0, 0], "radius": 1e300}"#,
                r#"{"kind": "lambertian", "color": "ffffff"}"#,
                "objects[0].body.radius: must be finite",
            ),
            (
                r#"{"kind": "box", "min": [0, -1e39, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": "lambertian", "color": "ffffff"}"#,
                "objects[0].body.min: must be finite",
            ),
            (
                r#"{"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]}"#,
                r#"{"kind": "glass", "color": "ffffff", "fuzz": 0, "eta": 1e40}"#,
                "objects[0].material.eta: must be finite",
            ),
        ];

        for (body, material, expected) in cases {
            let json = format!(r#"[{{"body": {body}, "material": {material}}}]"#);
            let (scene, result) = parse(&json);
            let error = result.unwrap_err();
            assert!(error.to_string().starts_with(expected), "{expected}: {error}");
            assert!(scene.is_empty());
        }
    }

    #[test]
    fn stops_at_first_bad_object() {
        let (scene, result) = parse(
            r#"[
                {"body": {"kind": "box", "min": [0, 0, 0], "max": [1, 1, 1]},
                 "material": {"kind": "lambertian", "color": "ffffff"}},
                {"body": {"kind": "ball", "center": [0, 0, 0]},
                 "material": {"kind": "lambertian", "color": "ffffff"}},
                {"body": {"kind": "box", "min": [0, 0, 0], "max": [2, 2, 2]},
                 "material": {"kind": "lambertian", "color": "ffffff"}}
            ]"#,
        );

        assert!(matches!(
            result.unwrap_err(),
            SceneError::MissingField { path } if path == "objects[1].body.radius"
        ));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn malformed_json_adds_nothing() {
        let (scene, result) = parse(r#"{"body": {}}"#);
        assert!(matches!(result.unwrap_err(), SceneError::Json(_)));
        assert!(scene.is_empty());

        let (scene, result) = parse(r#"[1]"#);
        assert!(matches!(result.unwrap_err(), SceneError::InvalidType { .. }));
        assert!(scene.is_empty());
    }

    #[test]
    fn exported_scene_parses_back() {
        let scene = random_scene(7);
        let json = scene.to_json().unwrap();

        let mut parsed = Scene::new();
        parsed.parse_description(json.as_bytes()).unwrap();
        assert_eq!(parsed, scene);
    }
}

use std::path::Path;

use log::info;

pub use description::SceneError;
pub use generator::random_scene;
pub use object::{Body, BodyKind, Color, Material, MaterialKind, Object, Shape};

mod description;
mod generator;
mod object;

/// 한 종류(상자 또는 공)의 물체들을 속성별 배열로 저장함.
///
/// 모든 배열의 길이는 언제나 `num`과 같고, 같은 인덱스가 한 물체를 뜻함.
/// 문자열들은 쉐이더 소스에 그대로 들어가는 리터럴임.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    num: u32,
    descs: Vec<String>,
    colors: Vec<String>,
    materials: Vec<MaterialKind>,
    fuzzs: Vec<f32>,
    etas: Vec<f32>,

    // 다시 내보낼 때 쓰는 원래 값들. 역시 인덱스가 맞춰져 있음
    objects: Vec<Object>,
}

impl Group {
    fn push(&mut self, object: Object) {
        self.num += 1;
        self.descs.push(object.body.desc().to_owned());
        self.colors.push(object.material.color().literal());
        self.materials.push(object.material.kind());
        self.fuzzs.push(object.material.fuzz());
        self.etas.push(object.material.eta());
        self.objects.push(object);
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn len(&self) -> usize {
        self.num as usize
    }

    pub fn descs(&self) -> &[String] {
        &self.descs
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn materials(&self) -> &[MaterialKind] {
        &self.materials
    }

    pub fn fuzzs(&self) -> &[f32] {
        &self.fuzzs
    }

    pub fn etas(&self) -> &[f32] {
        &self.etas
    }

    pub fn is_empty(&self) -> bool {
        self.num == 0
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    fn describe(&self, kind: BodyKind, index: usize) -> String {
        let material = self.materials[index];
        let mut result = format!("a {} {} with (color = {}", material, kind, self.colors[index]);
        if material != MaterialKind::Lambertian {
            result += &format!(", eta = {:.6}, fuzz = {:.6}", self.etas[index], self.fuzzs[index]);
        }
        result + ")"
    }
}

/// 레이 트레이싱 쉐이더에 들어갈 물체 목록.
///
/// 전역 인덱스는 상자 그룹 다음 공 그룹 순서로 이어 붙인 것임.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    groups: [Group; 2],
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// 파일에서 JSON 장면 설명을 읽음
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SceneError> {
        let data = std::fs::read(path.as_ref())?;
        let mut scene = Self::new();
        scene.parse_description(&data)?;
        info!(
            "Loaded {} objects from {}",
            scene.len(),
            path.as_ref().display()
        );

        Ok(scene)
    }

    pub fn add_object(&mut self, object: Object) {
        self.groups[object.body.kind() as usize].push(object);
    }

    pub fn group(&self, kind: BodyKind) -> &Group {
        &self.groups[kind as usize]
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 전역 인덱스 순서로 물체를 돌려줌
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.groups.iter().flat_map(|group| group.objects.iter())
    }

    /// -1은 쉐이더에서 "아무것도 안 맞음"을 뜻함
    pub fn describe_object_at(&self, index: i32) -> String {
        if index == -1 {
            return String::from("nothing");
        }

        let Ok(mut index) = usize::try_from(index) else {
            return String::from("[invalid object index]");
        };
        for kind in BodyKind::ALL {
            let group = self.group(kind);
            if index < group.len() {
                return group.describe(kind, index);
            }
            index -= group.len();
        }

        String::from("[invalid object index]")
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Point3;

    use super::*;

    fn unit_box() -> Body {
        Body::new_box(Point3::new(-1.0, 0.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    fn assert_aligned(scene: &Scene) {
        for kind in BodyKind::ALL {
            let group = scene.group(kind);
            let num = group.num() as usize;
            assert_eq!(group.descs().len(), num);
            assert_eq!(group.colors().len(), num);
            assert_eq!(group.materials().len(), num);
            assert_eq!(group.fuzzs().len(), num);
            assert_eq!(group.etas().len(), num);
            assert_eq!(group.objects().len(), num);
        }
    }

    #[test]
    fn describes_single_box() {
        let mut scene = Scene::new();
        scene.add_object(Object::new(
            unit_box(),
            Material::lambertian(Color::from_hex("ddbbbb").unwrap()),
        ));

        assert_eq!(
            scene.describe_object_at(0),
            "a lambertian box with (color = {0.866667, 0.733333, 0.733333})"
        );
        assert_eq!(scene.describe_object_at(-1), "nothing");
        assert_eq!(scene.describe_object_at(1), "[invalid object index]");
        assert_eq!(scene.describe_object_at(-7), "[invalid object index]");
    }

    #[test]
    fn global_index_spans_groups() {
        let mut scene = Scene::new();
        scene.add_object(Object::new(
            Body::new_ball(Point3::origin(), 1.0),
            Material::glass(Color::new(255, 0, 0), 0.5, 1.5),
        ));
        scene.add_object(Object::new(unit_box(), Material::mirror(Color::new(0, 0, 0), 0.25, 1.0)));

        // 공을 먼저 넣었어도 상자 그룹이 앞에 옴
        assert_eq!(
            scene.describe_object_at(0),
            "a mirror box with (color = {0.000000, 0.000000, 0.000000}, eta = 1.000000, fuzz = 0.250000)"
        );
        assert_eq!(
            scene.describe_object_at(1),
            "a glass ball with (color = {1.000000, 0.000000, 0.000000}, eta = 1.500000, fuzz = 0.500000)"
        );
        assert_eq!(scene.describe_object_at(2), "[invalid object index]");
    }

    #[test]
    fn groups_stay_aligned() {
        let mut scene = Scene::new();
        assert_aligned(&scene);
        assert!(scene.is_empty());

        for i in 0..10 {
            let body = if i % 3 == 0 {
                unit_box()
            } else {
                Body::new_ball(Point3::new(i as f32, 0.0, 0.0), 0.5)
            };
            scene.add_object(Object::new(body, Material::lambertian(Color::new(i, i, i))));
            assert_aligned(&scene);
        }

        assert_eq!(scene.len(), 10);
        assert_eq!(scene.group(BodyKind::Box).num(), 4);
        assert_eq!(scene.group(BodyKind::Ball).num(), 6);
    }

    #[test]
    fn append_order_within_group() {
        let mut scene = Scene::new();
        for i in 0..3 {
            scene.add_object(Object::new(
                Body::new_ball(Point3::new(i as f32, 0.0, 0.0), 1.0),
                Material::lambertian(Color::default()),
            ));
        }

        let group = scene.group(BodyKind::Ball);
        assert_eq!(group.descs()[0], "{{0.000000, 0.000000, 0.000000}, 1.000000}");
        assert_eq!(group.descs()[2], "{{2.000000, 0.000000, 0.000000}, 1.000000}");
    }
}

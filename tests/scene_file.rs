use std::fs;

use glint::scene::{random_scene, BodyKind, Scene, SceneError};
use glint::tracer::shader::{expand, RAYTRACE_TEMPLATE};

const TWO_OBJECTS: &str = r#"[
    {"body": {"kind": "ball", "center": [0, 1, 0], "radius": 1},
     "material": {"kind": "glass", "color": "ffffff", "fuzz": 0.0, "eta": 1.5}},
    {"body": {"kind": "box", "min": [-70, -1, -70], "max": [70, 0, 70]},
     "material": {"kind": "lambertian", "color": "666666"}}
]"#;

#[test]
fn loads_scene_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    fs::write(&path, TWO_OBJECTS).unwrap();

    let scene = Scene::load(&path).unwrap();

    assert_eq!(scene.len(), 2);
    // 상자 그룹이 먼저 오므로 전역 인덱스 0은 바닥
    assert_eq!(
        scene.describe_object_at(0),
        "a lambertian box with (color = {0.400000, 0.400000, 0.400000})"
    );
    assert_eq!(
        scene.describe_object_at(1),
        "a glass ball with (color = {1.000000, 1.000000, 1.000000}, eta = 1.500000, fuzz = 0.000000)"
    );
    assert_eq!(scene.describe_object_at(-1), "nothing");
    assert_eq!(scene.describe_object_at(2), "[invalid object index]");

    let source = expand(RAYTRACE_TEMPLATE, &scene).unwrap();
    assert!(source.contains(scene.group(BodyKind::Ball).descs()[0].as_str()));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Scene::load(dir.path().join("nope.json"));
    assert!(matches!(result, Err(SceneError::Io(_))));
}

#[test]
fn invalid_object_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    fs::write(
        &path,
        r#"[{"body": {"kind": "cone", "center": [0, 0, 0]},
             "material": {"kind": "lambertian", "color": "ffffff"}}]"#,
    )
    .unwrap();

    let err = Scene::load(&path).unwrap_err();
    assert!(err.to_string().starts_with("objects[0].body.kind"), "{err}");
}

#[test]
fn saved_scene_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.json");
    let scene = random_scene(2024);

    scene.save(&path).unwrap();
    let loaded = Scene::load(&path).unwrap();

    assert_eq!(loaded.len(), scene.len());
    assert_eq!(loaded.to_json().unwrap(), scene.to_json().unwrap());
    for kind in BodyKind::ALL {
        assert_eq!(loaded.group(kind).descs(), scene.group(kind).descs());
        assert_eq!(loaded.group(kind).materials(), scene.group(kind).materials());
    }
}

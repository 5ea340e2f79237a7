use nalgebra::{Point3, Vector2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Body, Color, Material, Object, Scene};

const OBJECT_COUNT: usize = 35;
const MAX_SIZE: f32 = 5.0;
const MIN_SIZE: f32 = 0.5;
const MAX_DIST: f32 = 70.0;

/// 시드가 같으면 언제나 같은 장면을 만듦.
///
/// 난수열은 `StdRng::seed_from_u64` (rand 0.8 기준 ChaCha12)라서, rand 버전이
/// 바뀌지 않는 한 결과가 유지됨.
pub fn random_scene(seed: u64) -> Scene {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut scene = Scene::new();

    // 바닥
    scene.add_object(Object::new(
        Body::new_box(
            Point3::new(-MAX_DIST, -1.0, -MAX_DIST),
            Point3::new(MAX_DIST, 0.0, MAX_DIST),
        ),
        Material::lambertian(Color::new(0x66, 0x66, 0x66)),
    ));

    for _ in 0..OBJECT_COUNT {
        let object = random_object(&mut rng);
        scene.add_object(object);
    }

    scene
}

fn random_object<R: Rng>(rng: &mut R) -> Object {
    let position = Vector2::new(rng.gen::<f32>() - 0.5, rng.gen::<f32>() - 0.5) * (MAX_DIST * 2.0);
    let size = rng.gen_range(MIN_SIZE..MAX_SIZE);

    // 모두 바닥(y = 0) 위에 올려 놓음
    let body = if rng.gen_bool(0.5) {
        Body::new_box(
            Point3::new(position.x - size, 0.0, position.y - size),
            Point3::new(position.x + size, 2.0 * size, position.y + size),
        )
    } else {
        Body::new_ball(Point3::new(position.x, size, position.y), size)
    };

    let color = Color::new(rng.gen(), rng.gen(), rng.gen());
    let material = match rng.gen_range(0..3) {
        // (0, 1]: 다시 읽을 때 eta > 0 검사를 통과해야 함
        0 => Material::mirror(color, rng.gen(), 1.0 - rng.gen::<f32>()),
        1 => Material::lambertian(color),
        // 유리는 거칠기가 0 근처에 몰리게 세제곱함
        _ => Material::glass(
            color,
            (rng.gen::<f32>() * 0.5).powi(3),
            rng.gen::<f32>() / 1.5 + 1.1,
        ),
    };

    Object::new(body, material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{BodyKind, MaterialKind};

    #[test]
    fn same_seed_same_scene() {
        let first = random_scene(42);
        let second = random_scene(42);

        for kind in BodyKind::ALL {
            let (a, b) = (first.group(kind), second.group(kind));
            assert_eq!(a.num(), b.num());
            assert_eq!(a.descs(), b.descs());
            assert_eq!(a.colors(), b.colors());
            assert_eq!(a.materials(), b.materials());
            assert_eq!(a.fuzzs(), b.fuzzs());
            assert_eq!(a.etas(), b.etas());
        }
        assert_eq!(first, second);
    }

    #[test]
    fn different_seeds_differ() {
        assert_ne!(random_scene(1), random_scene(2));
    }

    #[test]
    fn ground_plus_generated_objects() {
        let scene = random_scene(3);
        assert_eq!(scene.len(), OBJECT_COUNT + 1);
        assert_eq!(
            scene.group(BodyKind::Box).descs()[0],
            "{{-70.000000, -1.000000, -70.000000},{70.000000, 0.000000, 70.000000}}"
        );
    }

    #[test]
    fn generated_values_stay_in_range() {
        for seed in 0..20 {
            let scene = random_scene(seed);
            for object in scene.objects().skip(1) {
                let material = &object.material;
                match material.kind() {
                    MaterialKind::Lambertian => {
                        assert_eq!((material.fuzz(), material.eta()), (0.0, 0.0));
                    }
                    MaterialKind::Mirror => {
                        assert!((0.0..1.0).contains(&material.fuzz()));
                        assert!(material.eta() > 0.0 && material.eta() <= 1.0);
                    }
                    MaterialKind::Glass => {
                        assert!((0.0..=0.125).contains(&material.fuzz()));
                        assert!((1.1..1.77).contains(&material.eta()));
                    }
                }
            }
        }
    }
}

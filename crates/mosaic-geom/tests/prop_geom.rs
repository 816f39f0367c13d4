use mosaic_geom::{Aabb, Vec3};
use proptest::num::f32::NORMAL;
use proptest::prelude::*;

fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}
fn vapprox(a: Vec3, b: Vec3, eps: f32) -> bool {
    approx(a.x, b.x, eps) && approx(a.y, b.y, eps) && approx(a.z, b.z, eps)
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded", |v| v.is_finite() && v.abs() <= 1e4)
}
fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    #[test]
    fn normalized_has_unit_length(v in arb_vec3()) {
        prop_assume!(v.length() > 1e-3);
        prop_assert!(approx(v.normalized().length(), 1.0, 1e-4));
    }

    #[test]
    fn from_points_contains_every_point(pts in prop::collection::vec(arb_vec3(), 1..32)) {
        let bb = Aabb::from_points(pts.iter().copied()).unwrap();
        for p in &pts {
            prop_assert!(bb.contains(*p));
        }
    }

    #[test]
    fn translated_box_moves_center(pts in prop::collection::vec(arb_vec3(), 1..8), t in arb_vec3()) {
        let bb = Aabb::from_points(pts.iter().copied()).unwrap();
        let moved = bb.translated(t);
        prop_assert!(vapprox(moved.center(), bb.center() + t, 1e-2));
    }

    #[test]
    fn triangle_normal_flips_with_winding(a in arb_vec3(), b in arb_vec3(), c in arb_vec3()) {
        let n1 = Vec3::triangle_normal(a, b, c);
        let n2 = Vec3::triangle_normal(a, c, b);
        let scale = n1.length().max(1.0);
        prop_assert!(vapprox(n1, -n2, 1e-3 * scale));
    }
}

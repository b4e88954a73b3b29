//! Geometrische Hilfsfunktionen für Rundung und 3D-Kollisionserkennung.
//!
//! Dieses Modul bietet die zustandslosen Primitive, auf denen Bin und Packer
//! aufbauen: Rundung auf eine feste Anzahl Nachkommastellen und den
//! AABB-Überschneidungstest.

use crate::model::Item;
use crate::types::BoundingBox;

/// Rundet `value` auf `decimals` Nachkommastellen (kaufmännisch, halb nach oben).
///
/// Alle Maße, Gewichte und Volumina laufen zu Beginn eines Packlaufs genau einmal
/// hierdurch, damit Vergleiche und Sortierungen stabil bleiben.
///
/// # Beispiel
/// ```
/// use binpack3d::geometry::round_to;
///
/// assert_eq!(round_to(1.23456, 3), 1.235);
/// assert_eq!(round_to(2.5, 0), 3.0);
/// ```
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    // Ab 2^53 ist jedes f64 ganzzahlig, es gibt nichts mehr zu runden (auch bei Überlauf)
    if scaled.abs() >= 9_007_199_254_740_992.0 {
        return value;
    }
    // Halbe Stellen, die durch Binärdarstellung knapp darunter landen, nach oben ziehen
    let nudged = scaled + scaled.signum() * scaled.abs().max(1.0) * f64::EPSILON;
    nudged.round() / factor
}

/// Prüft, ob sich zwei Bounding Boxes mit positivem Volumen überschneiden.
///
/// Eine Überschneidung liegt nur vor, wenn sich die Intervalle auf **allen drei**
/// Achsen echt überlappen (`a.min < b.max && b.min < a.max`). Boxen, die sich
/// nur an einer Fläche oder Kante berühren, überschneiden sich nicht.
/// Der Test ist symmetrisch.
pub fn boxes_intersect(a: &BoundingBox, b: &BoundingBox) -> bool {
    a.min.x < b.max.x
        && b.min.x < a.max.x
        && a.min.y < b.max.y
        && b.min.y < a.max.y
        && a.min.z < b.max.z
        && b.min.z < a.max.z
}

/// Prüft, ob sich zwei platzierte Objekte räumlich überschneiden.
///
/// Verwendet die effektiven (rotierten) Maße und Positionen beider Objekte,
/// gerundet auf deren Genauigkeit.
///
/// # Parameter
/// * `a` - Erstes platziertes Objekt
/// * `b` - Zweites platziertes Objekt
///
/// # Rückgabewert
/// `true` wenn sich die Objekte überschneiden, sonst `false`
pub fn intersects(a: &Item, b: &Item) -> bool {
    boxes_intersect(&a.bounding_box(), &b.bounding_box())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;
    use test_case::test_case;

    fn bb(pos: (f64, f64, f64), dims: (f64, f64, f64)) -> BoundingBox {
        BoundingBox::from_position_and_dims(Vec3::from_tuple(pos), Vec3::from_tuple(dims))
    }

    #[test_case(1.23456, 3, 1.235; "rounds up at the fourth digit")]
    #[test_case(1.23449, 3, 1.234; "rounds down at the fourth digit")]
    #[test_case(1.0005, 3, 1.001; "half rounds up")]
    #[test_case(2.5, 0, 3.0; "half rounds up to integer")]
    #[test_case(7.0, 3, 7.0; "integral values unchanged")]
    #[test_case(0.0, 5, 0.0; "zero stays zero")]
    fn round_to_cases(value: f64, decimals: u32, expected: f64) {
        assert_eq!(round_to(value, decimals), expected);
    }

    #[test]
    fn round_to_keeps_huge_finite_values() {
        assert_eq!(round_to(f64::MAX, 3), f64::MAX);
        assert_eq!(round_to(-f64::MAX, 12), -f64::MAX);
        assert_eq!(round_to(1e300, 12), 1e300);
        assert_eq!(round_to(f64::MAX, 0), f64::MAX);
        assert_eq!(round_to(1e17, 2), 1e17);
    }

    #[test]
    fn round_to_stabilises_accumulated_error() {
        let sum = 0.1 + 0.2;
        assert_ne!(sum, 0.3);
        assert_eq!(round_to(sum, 3), 0.3);
    }

    #[test]
    fn overlapping_boxes_intersect() {
        let a = bb((0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let b = bb((5.0, 5.0, 5.0), (10.0, 10.0, 10.0));
        assert!(boxes_intersect(&a, &b));
        assert!(boxes_intersect(&b, &a));
    }

    #[test]
    fn touching_faces_do_not_collide() {
        let a = bb((0.0, 0.0, 0.0), (2.0, 2.0, 2.0));
        let b = bb((2.0, 0.0, 0.0), (2.0, 2.0, 2.0));
        assert!(!boxes_intersect(&a, &b));
        assert!(!boxes_intersect(&b, &a));
    }

    #[test]
    fn touching_edges_do_not_collide() {
        let a = bb((0.0, 0.0, 0.0), (2.0, 2.0, 2.0));
        let b = bb((2.0, 2.0, 0.0), (2.0, 2.0, 2.0));
        assert!(!boxes_intersect(&a, &b));
    }

    #[test]
    fn overlap_on_two_axes_only_is_not_a_collision() {
        let a = bb((0.0, 0.0, 0.0), (4.0, 4.0, 4.0));
        let b = bb((1.0, 1.0, 5.0), (2.0, 2.0, 2.0));
        assert!(!boxes_intersect(&a, &b));
    }

    #[test]
    fn contained_box_collides() {
        let outer = bb((0.0, 0.0, 0.0), (10.0, 10.0, 10.0));
        let inner = bb((4.0, 4.0, 4.0), (1.0, 1.0, 1.0));
        assert!(boxes_intersect(&outer, &inner));
        assert!(boxes_intersect(&inner, &outer));
    }

    #[test]
    fn item_intersection_uses_rotation() {
        let mut a = Item::new("a", 4.0, 1.0, 1.0, 0.0).unwrap();
        let mut b = Item::new("b", 1.0, 1.0, 1.0, 0.0).unwrap();
        b.position = Vec3::new(0.0, 2.0, 0.0);
        assert!(!intersects(&a, &b));

        a.rotation = crate::types::RotationType::Hwd;
        assert!(intersects(&a, &b));
        assert!(intersects(&b, &a));
    }
}

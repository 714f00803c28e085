use approx::assert_relative_eq;
use nalgebra::Point3;
use offmesh::{IndexedMesh, OffsetField, PolygonSoup, Surface, float_types::Real};

#[test]
fn field_is_zero_on_the_offset_of_a_closed_mesh() {
    let cube = IndexedMesh::<()>::cube(2.0, None);
    let field = OffsetField::from_mesh(&cube, 0.3).unwrap();
    assert!(field.is_signed());

    // face, edge and corner regions of the grown cube
    for p in [
        Point3::new(2.3, 1.0, 1.0),
        Point3::new(1.0, -0.3, 0.5),
        Point3::new(2.0 + 0.3 / (2.0 as Real).sqrt(), 1.0, 2.0 + 0.3 / (2.0 as Real).sqrt()),
        Point3::new(
            2.0 + 0.3 / (3.0 as Real).sqrt(),
            2.0 + 0.3 / (3.0 as Real).sqrt(),
            2.0 + 0.3 / (3.0 as Real).sqrt(),
        ),
    ] {
        assert_relative_eq!(field.evaluate(&p), 0.0, epsilon = 1e-9);
    }
}

#[test]
fn inset_field_decreases_toward_the_outside() {
    let octahedron = IndexedMesh::<()>::octahedron(1.0, None);
    let field = OffsetField::from_mesh(&octahedron, -0.2).unwrap();
    let inradius = 1.0 / (3.0 as Real).sqrt();

    assert_relative_eq!(field.evaluate(&Point3::origin()), inradius - 0.2, epsilon = 1e-9);
    let mut previous = Real::MAX;
    for i in 0..12 {
        let p = Point3::new(i as Real * 0.1, 0.01, 0.02);
        let value = field.evaluate(&p);
        assert!(value < previous, "{value} at {p}");
        previous = value;
    }
}

#[test]
fn unsigned_shell_for_soups_and_open_meshes() {
    let icosahedron = IndexedMesh::<()>::icosahedron(1.0, None);
    let soup: Surface<()> = PolygonSoup::from_mesh(&icosahedron).into();
    let field = OffsetField::from_surface(&soup, 0.1).unwrap();
    assert!(!field.is_signed());

    // the same value on both sides of a face
    let [a, b, c] = icosahedron.triangles().next().unwrap();
    let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
    let normal = (b - a).cross(&(c - a)).normalize();
    let outside = centroid + normal * 0.05;
    let inside = centroid - normal * 0.05;
    assert_relative_eq!(field.evaluate(&outside), 0.05, epsilon = 1e-9);
    assert_relative_eq!(field.evaluate(&inside), 0.05, epsilon = 1e-9);
    assert_eq!(field.index().len(), 20);

    let mut open = icosahedron;
    open.polygons.truncate(10);
    let field = OffsetField::from_mesh(&open, 0.1).unwrap();
    assert!(!field.is_signed());
    assert!(field.evaluate(&Point3::new(0.0, 0.0, 5.0)) < 0.0);
}

#[test]
fn on_boundary_points_take_the_offset() {
    let icosahedron = IndexedMesh::<()>::icosahedron(1.0, None);
    let field = OffsetField::from_mesh(&icosahedron, 0.25).unwrap();
    for v in &icosahedron.vertices {
        assert_eq!(field.evaluate(&v.pos), 0.25);
    }
}

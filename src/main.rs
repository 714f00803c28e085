// main.rs
//
// Offsets a few solids through the background coordinator and writes the
// results as STL files into stl/.

use offmesh::float_types::Real;
use offmesh::{
    IndexedMesh, MeshingCoordinator, MeshingOutcome, OffsetParams, OffsetRequest, PolygonSoup,
    SurfaceNetsMesher,
};
use std::{fs, sync::mpsc};

type Mesh = IndexedMesh<()>;

/// Run one offset job to completion and write its result
fn offset_and_write(
    coordinator: &MeshingCoordinator,
    name: &str,
    request: OffsetRequest<()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let result_name = request.result_name(name);
    let (tx, rx) = mpsc::channel();

    let handle = coordinator.submit(request, SurfaceNetsMesher::new())?;
    handle.on_complete(move |outcome| {
        let _ = tx.send(outcome);
    })?;

    match rx.recv()? {
        MeshingOutcome::Mesh(mesh) => {
            println!(
                "{result_name}: {} vertices, {} triangles",
                mesh.vertex_count(),
                mesh.polygons.len()
            );
            let file = format!("stl/{}.stl", result_name.replace([' ', '(', ')'], "_"));
            #[cfg(feature = "stl-io")]
            fs::write(file, mesh.to_stl_binary(&result_name)?)?;
            #[cfg(not(feature = "stl-io"))]
            let _ = file;
        },
        MeshingOutcome::Empty => println!("{result_name}: empty"),
        MeshingOutcome::Cancelled => println!("{result_name}: cancelled"),
        MeshingOutcome::Invalid(err) => println!("{result_name}: {err}"),
    }

    handle.join()?;
    coordinator.wait_idle();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Ensure the /stls folder exists
    let _ = fs::create_dir_all("stl");

    let coordinator = MeshingCoordinator::new();

    // 1) icosahedron grown by 0.2
    let ico = Mesh::icosahedron(1.0, None);
    let params = OffsetParams::default()
        .with_offset(0.2)
        .with_facet_angle(25.0)
        .with_facet_size(0.05)
        .with_facet_distance(0.01);
    offset_and_write(&coordinator, "icosahedron", OffsetRequest::new(ico.clone(), params))?;

    // 2) cube shrunk by 0.25
    let cube = Mesh::cube(2.0, None);
    let params = OffsetParams::from_diagonal(2.0 * (3.0 as Real).sqrt()).with_offset(-0.25);
    offset_and_write(&coordinator, "cube", OffsetRequest::new(cube, params))?;

    // 3) the icosahedron as a polygon soup: a shell on both sides
    let soup = PolygonSoup::from_mesh(&ico);
    let params = OffsetParams::from_diagonal(2.0).with_offset(0.1);
    offset_and_write(&coordinator, "icosahedron_soup", OffsetRequest::new(soup, params))?;

    Ok(())
}

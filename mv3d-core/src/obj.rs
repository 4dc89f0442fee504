/// Wavefront OBJ export
use std::io::{self, Write};

use crate::geometry::Mesh;

/// Write a mesh as OBJ text: `v` positions, `vn` normals, and `f` faces
/// with 1-based `v//vn` indices. The mesh is not modified.
pub fn write_obj<W: Write>(mesh: &Mesh, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "# Exported by mv3d")?;
    writeln!(writer, "# Triangles: {}", mesh.triangle_count())?;
    writeln!(writer)?;

    for triangle in &mesh.triangles {
        for v in &triangle.vertices {
            writeln!(
                writer,
                "v {:.6} {:.6} {:.6}",
                v.position.x, v.position.y, v.position.z
            )?;
        }
    }

    writeln!(writer)?;
    for triangle in &mesh.triangles {
        for v in &triangle.vertices {
            writeln!(writer, "vn {:.6} {:.6} {:.6}", v.normal.x, v.normal.y, v.normal.z)?;
        }
    }

    writeln!(writer)?;
    for i in 0..mesh.triangle_count() {
        let base = i * 3 + 1;
        writeln!(
            writer,
            "f {0}//{0} {1}//{1} {2}//{2}",
            base,
            base + 1,
            base + 2
        )?;
    }

    Ok(())
}

/// Render a mesh to an OBJ string
pub fn obj_string(mesh: &Mesh) -> String {
    let mut buffer = Vec::new();
    // Writing to a Vec<u8> cannot fail
    write_obj(mesh, &mut buffer).expect("in-memory write");
    String::from_utf8(buffer).expect("OBJ output is ASCII")
}

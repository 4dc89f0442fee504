/// STL file parser for binary and ASCII formats
use nom::{
    bytes::complete::{tag, take_till},
    character::complete::{multispace0, multispace1},
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::geometry::{Mesh, Triangle, Vertex};

const BINARY_HEADER_LEN: usize = 80;
const BINARY_TRIANGLE_LEN: usize = 50;

/// Detect and parse an STL payload (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, String> {
    // Files starting with "solid" may still be binary, so an ASCII parse
    // failure falls through to the binary path.
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, String> {
    if data.len() < BINARY_HEADER_LEN + 4 {
        return Err("file too small to be a valid STL".to_string());
    }

    let body = &data[BINARY_HEADER_LEN..];
    let triangle_count = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
    let records = &body[4..];

    if records.len() < triangle_count * BINARY_TRIANGLE_LEN {
        return Err(format!(
            "truncated STL: header promises {} triangles, payload holds {} bytes",
            triangle_count,
            records.len()
        ));
    }

    let mut mesh = Mesh::with_capacity(triangle_count);
    for record in records.chunks_exact(BINARY_TRIANGLE_LEN).take(triangle_count) {
        let (nx, ny, nz) = read_vec3(&record[0..12]);
        let mut vertices = [Vertex::from_coords(0.0, 0.0, 0.0, nx, ny, nz); 3];
        for (i, vertex) in vertices.iter_mut().enumerate() {
            let start = 12 + i * 12;
            let (x, y, z) = read_vec3(&record[start..start + 12]);
            *vertex = Vertex::from_coords(x, y, z, nx, ny, nz);
        }
        // Trailing 2-byte attribute count is ignored
        mesh.add_triangle(Triangle::new(vertices[0], vertices[1], vertices[2]));
    }

    Ok(mesh)
}

fn read_vec3(bytes: &[u8]) -> (f32, f32, f32) {
    let f = |i: usize| f32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    (f(0), f(4), f(8))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, String> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(format!("failed to parse ASCII STL: {:?}", e)),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = take_till(|c| c == '\n')(input)?; // optional solid name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::from_coords(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Serialize a mesh as binary STL, used to build test fixtures and uploads
pub fn write_binary_stl(mesh: &Mesh) -> Vec<u8> {
    let mut out = vec![0u8; BINARY_HEADER_LEN];
    out.extend_from_slice(&(mesh.triangle_count() as u32).to_le_bytes());

    for triangle in &mesh.triangles {
        let normal = triangle.vertices[0].normal;
        for value in [normal.x, normal.y, normal.z] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        for vertex in &triangle.vertices {
            for value in [vertex.position.x, vertex.position.y, vertex.position.z] {
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        out.extend_from_slice(&0u16.to_le_bytes());
    }

    out
}

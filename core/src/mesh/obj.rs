//! OBJ-subset reader/writer for the session mesh interchange file.
//!
//! The editor exports the triangulated mesh as plain `v x y z` and 1-based
//! `f i j k` lines before the session starts. Only that subset is produced,
//! but the reader also tolerates comments, blank lines, unknown directives
//! and `f i/../..` style index groups so hand-made fixtures load too.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::geometry::Point3;

use super::{Mesh, MeshError};

pub fn read<R: Read>(reader: R) -> Result<Mesh, MeshError> {
    let mut vertices: Vec<Point3> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();

    for (line_no, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let mut coord = [0.0f64; 3];
                for c in &mut coord {
                    *c = fields
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| bad_line(line_no, line))?;
                }
                vertices.push(Point3::new(coord[0], coord[1], coord[2]));
            }
            Some("f") => {
                let mut idx = [0usize; 3];
                for i in &mut idx {
                    // "f 1 2 3" from the editor; "f 1/1/1 ..." from generic
                    // exporters. Either way the first group is the vertex.
                    let field = fields.next().ok_or_else(|| bad_line(line_no, line))?;
                    let vertex: usize = field
                        .split('/')
                        .next()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| bad_line(line_no, line))?;
                    if vertex == 0 {
                        return Err(bad_line(line_no, line));
                    }
                    *i = vertex - 1;
                }
                if fields.next().is_some() {
                    return Err(MeshError::Parse(format!(
                        "line {}: face is not a triangle: {:?}",
                        line_no + 1,
                        line
                    )));
                }
                faces.push(idx);
            }
            // vt/vn/usemtl and friends are irrelevant to the engine.
            _ => continue,
        }
    }

    Mesh::new(vertices, faces)
}

pub fn write<W: Write>(mesh: &Mesh, writer: &mut W) -> Result<(), MeshError> {
    for v in mesh.vertices() {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in mesh.faces() {
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }
    Ok(())
}

pub fn load(path: &Path) -> Result<Mesh, MeshError> {
    read(std::fs::File::open(path)?)
}

pub fn save(mesh: &Mesh, path: &Path) -> Result<(), MeshError> {
    let mut file = std::fs::File::create(path)?;
    write(mesh, &mut file)
}

fn bad_line(line_no: usize, line: &str) -> MeshError {
    MeshError::Parse(format!("line {}: {:?}", line_no + 1, line))
}

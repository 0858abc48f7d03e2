// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use seamkit_engine::prelude::*;

/// Loads the positions and polygons of an OBJ file. Everything else in the
/// file is ignored.
pub fn load(path: &Path) -> Result<PolyMesh> {
    let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    read(&mut BufReader::new(file)).with_context(|| format!("Reading {}", path.display()))
}

pub fn read(reader: &mut impl BufRead) -> Result<PolyMesh> {
    use wavefront_rs::obj;
    use wavefront_rs::obj::entity::Entity;

    let mut positions = vec![];
    let mut polygons: Vec<SVec<VertexId>> = vec![];
    let mut relative_indices = false;
    obj::read_lexer::ReadLexer::read_to_end(reader, |entity| match entity {
        Entity::Vertex { x, y, z, w: _w } => {
            positions.push(Vec3::new(x as f32, y as f32, z as f32));
        }
        Entity::Face { vertices } => {
            relative_indices |= vertices.iter().any(|v| v.vertex < 1);
            // NOTE: OBJ Wavefront indices start at 1
            polygons.push(
                vertices
                    .iter()
                    .map(|v| VertexId::from((v.vertex.max(1) - 1) as usize))
                    .collect(),
            );
        }
        _ => {}
    })
    .map_err(|err| anyhow!("Malformed OBJ: {err}"))?;

    if relative_indices {
        bail!("Relative face indices are not supported")
    }
    log::debug!(
        "Read {} vertices and {} faces",
        positions.len(),
        polygons.len()
    );
    Ok(PolyMesh::new(positions, polygons, None)?)
}

pub fn save(mesh: &PolyMesh, normals: &[Vec3], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(mesh, normals, &mut writer).with_context(|| format!("Writing {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

/// Writes `mesh` as OBJ text. Each vertex gets the matching entry of
/// `normals`, unless its corner has a face-vertex normal of its own.
pub fn write(mesh: &PolyMesh, normals: &[Vec3], out: &mut impl Write) -> Result<()> {
    if normals.len() != mesh.num_vertices() {
        bail!(
            "Got {} normals for {} vertices",
            normals.len(),
            mesh.num_vertices()
        )
    }

    for p in mesh.points() {
        writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
    }
    let uvs = mesh.uvs();
    for uv in &uvs.uvs {
        writeln!(out, "vt {} {}", uv.x, uv.y)?;
    }
    for n in normals {
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }

    let mut next_normal = normals.len();
    for (f, polygon) in mesh.polygons().iter().enumerate() {
        let face = FaceId::from(f);
        let face_uvs = uvs.face_uvs.get(f).map(|i| i.as_slice()).unwrap_or(&[]);
        let mut line = String::from("f");
        for (i, &v) in polygon.iter().enumerate() {
            let n = match mesh.face_vertex_normal(face, v) {
                Some(n) => {
                    writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
                    next_normal += 1;
                    next_normal
                }
                None => v.idx() + 1,
            };
            match face_uvs.get(i) {
                Some(t) => line.push_str(&format!(" {}/{}/{n}", v.idx() + 1, t + 1)),
                None => line.push_str(&format!(" {}//{n}", v.idx() + 1)),
            }
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use seamkit_engine::mesh::primitives::Grid;

    const QUAD_STRIP: &str = "# two quads
v 0 0 0
v 1 0 0
v 2 0 0
v 0 0 1
v 1 0 1
v 2 0 1
f 1 4 5 2
f 2 5 6 3
";

    #[test]
    pub fn read_positions_and_faces() {
        let mesh = read(&mut QUAD_STRIP.as_bytes()).unwrap();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_edges(), 7);
        assert_eq!(
            mesh.polygon(FaceId(1)).unwrap(),
            &[1, 4, 5, 2].map(VertexId)
        );
        assert_eq!(mesh.points()[5], Vec3::new(2.0, 0.0, 1.0));
    }

    #[test]
    pub fn bad_faces_are_rejected() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 4\n";
        assert!(read(&mut obj.as_bytes()).is_err());
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nf -3 -2 -1\n";
        assert!(read(&mut obj.as_bytes()).is_err());
    }

    #[test]
    pub fn write_uvs_and_normals() {
        let mut mesh = Grid::build(1, 1, 1.0).unwrap();
        mesh.set_face_vertex_normal(FaceId(0), VertexId(2), Vec3::X)
            .unwrap();
        let normals = vec![Vec3::Y; 4];
        let mut out = vec![];
        write(&mesh, &normals, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let count = |prefix: &str| text.lines().filter(|l| l.starts_with(prefix)).count();
        assert_eq!(count("v "), 4);
        assert_eq!(count("vt "), 4);
        assert_eq!(count("vn "), 5);
        // Grid faces go 0, 2, 3, 1. Corner 2 uses the extra normal.
        let face = text.lines().find(|l| l.starts_with("f ")).unwrap();
        assert_eq!(face, "f 1/1/1 3/3/5 4/4/4 2/2/2");

        assert!(write(&mesh, &normals[..3], &mut vec![]).is_err());
    }
}

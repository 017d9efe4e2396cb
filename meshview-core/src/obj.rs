//! Wavefront OBJ parser (vertex positions and faces only)
use nalgebra::Point3;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{i64 as signed_index, multispace1},
    combinator::{cut, map, rest},
    multi::separated_list1,
    number::complete::double,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::DecodeError;
use crate::geometry::{Mesh, Triangle};

enum Record {
    Vertex(Point3<f64>),
    Face(Vec<i64>),
    Other,
}

fn record(input: &str) -> IResult<&str, Record> {
    alt((vertex_record, face_record, map(rest, |_| Record::Other)))(input)
}

/// `v x y z`; texture and normal records (`vt`, `vn`) fall through
fn vertex_record(input: &str) -> IResult<&str, Record> {
    let (input, (x, _, y, _, z)) = preceded(
        pair(tag("v"), multispace1),
        cut(tuple((double, multispace1, double, multispace1, double))),
    )(input)?;
    Ok((input, Record::Vertex(Point3::new(x, y, z))))
}

/// `f a b c ...`, where each entry may carry `/texture/normal` suffixes
fn face_record(input: &str) -> IResult<&str, Record> {
    let face_index = terminated(signed_index, take_till(char::is_whitespace));
    let (input, indices) = preceded(
        pair(tag("f"), multispace1),
        cut(separated_list1(multispace1, face_index)),
    )(input)?;
    Ok((input, Record::Face(indices)))
}

/// Resolves a one-based (or negative, relative) OBJ index
fn resolve(index: i64, count: usize) -> Option<usize> {
    let i = match index {
        0 => return None,
        i if i > 0 => i - 1,
        i => count as i64 + i,
    };
    usize::try_from(i).ok().filter(|&i| i < count)
}

/// Parse the text of an OBJ file, fan-triangulating polygons
pub fn parse_obj(text: &str) -> Result<Mesh, DecodeError> {
    let mut vertices = Vec::new();
    let mut mesh = Mesh::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let parsed = record(line.trim()).map_err(|e| DecodeError::Parse {
            line: line_no,
            message: e.to_string(),
        })?;
        match parsed.1 {
            Record::Vertex(p) => vertices.push(p),
            Record::Face(indices) => {
                if indices.len() < 3 {
                    return Err(DecodeError::Parse {
                        line: line_no,
                        message: format!(
                            "face has {} vertices; at least 3 are required",
                            indices.len()
                        ),
                    });
                }
                let corners = indices
                    .iter()
                    .map(|&index| {
                        resolve(index, vertices.len())
                            .map(|j| vertices[j])
                            .ok_or(DecodeError::BadIndex {
                                line: line_no,
                                index,
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                for w in corners[1..].windows(2) {
                    mesh.add_triangle(Triangle::new(corners[0], w[0], w[1]));
                }
            }
            Record::Other => (),
        }
    }
    Ok(mesh)
}

//! STL file parser for binary and ASCII formats
use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{double, le_f32, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::DecodeError;
use crate::geometry::{Mesh, Triangle};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Expected size of a binary STL holding `n` triangles
fn binary_len(n: usize) -> usize {
    n.saturating_mul(FACET_LEN).saturating_add(HEADER_LEN + 4)
}

/// Returns the declared triangle count if the data length matches it exactly
fn binary_triangle_count(data: &[u8]) -> Option<usize> {
    let (_, n) = preceded(take::<_, _, ()>(HEADER_LEN), le_u32)(data).ok()?;
    let n = n as usize;
    (data.len() == binary_len(n)).then_some(n)
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, DecodeError> {
    let truncated = |expected| DecodeError::Truncated {
        expected,
        got: data.len(),
    };
    let (rest, n) =
        preceded(take::<_, _, ()>(HEADER_LEN), le_u32)(data)
            .map_err(|_| truncated(binary_len(0)))?;
    let n = n as usize;
    if data.len() < binary_len(n) {
        return Err(truncated(binary_len(n)));
    }

    let (_, triangles) = count(binary_facet, n)(rest)
        .map_err(|_: nom::Err<()>| truncated(binary_len(n)))?;
    Ok(Mesh { triangles })
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle, ()> {
    // The stored normal is ignored; shading derives its own
    let (input, _normal) = take(12usize)(input)?;
    let (input, v0) = binary_point(input)?;
    let (input, v1) = binary_point(input)?;
    let (input, v2) = binary_point(input)?;
    let (input, _attribute_bytes) = take(2usize)(input)?;
    Ok((input, Triangle::new(v0, v1, v2)))
}

fn binary_point(input: &[u8]) -> IResult<&[u8], Point3<f64>, ()> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Point3::new(x as f64, y as f64, z as f64)))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, DecodeError> {
    match ascii_solid(input) {
        Ok((_, triangles)) => Ok(Mesh { triangles }),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(DecodeError::Parse {
                line: line_of(input, e.input),
                message: format!("expected {:?}", e.code),
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(DecodeError::Parse {
            line: line_of(input, ""),
            message: "unexpected end of file".to_owned(),
        }),
    }
}

/// One-based line number of `rest` inside `full`
fn line_of(full: &str, rest: &str) -> usize {
    let offset = full.len().saturating_sub(rest.len());
    full[..offset].matches('\n').count() + 1
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<Triangle>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = not_line_ending(input)?;
    let (input, triangles) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    Ok((input, triangles))
}

fn ascii_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, _normal) = ascii_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v0) = ascii_vertex(input)?;
    let (input, v1) = ascii_vertex(input)?;
    let (input, v2) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v0, v1, v2)))
}

fn ascii_vertex(input: &str) -> IResult<&str, Point3<f64>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = ascii_vector3(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn ascii_vector3(input: &str) -> IResult<&str, (f64, f64, f64)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = double(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = double(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
///
/// A file whose length matches its binary header is binary even when the
/// header happens to start with `solid`, which many exporters write.
pub fn parse_stl(data: &[u8]) -> Result<Mesh, DecodeError> {
    if binary_triangle_count(data).is_some() {
        return parse_binary_stl(data);
    }
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            return parse_ascii_stl(text);
        }
    }
    parse_binary_stl(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(header: &[u8], triangles: &[[f32; 9]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data[..header.len()].copy_from_slice(header);
        data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
        for t in triangles {
            data.extend_from_slice(&[0u8; 12]);
            for f in t {
                data.extend_from_slice(&f.to_le_bytes());
            }
            data.extend_from_slice(&[0u8; 2]);
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        // Set triangle count to 0
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_triangle() {
        let data = binary_stl(
            b"",
            &[[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.5]],
        );
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[2], Point3::new(0.0, 1.0, 0.5));
    }

    #[test]
    fn test_binary_with_solid_header() {
        let data = binary_stl(
            b"solid exported by a CAD tool",
            &[[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]; 2],
        );
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
    }

    #[test]
    fn test_truncated_binary() {
        let mut data =
            binary_stl(b"", &[[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]]);
        data.truncate(100);
        assert!(matches!(
            parse_stl(&data),
            Err(DecodeError::Truncated {
                expected: 134,
                got: 100
            })
        ));
        assert!(matches!(
            parse_stl(&[0u8; 10]),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_parse_ascii() {
        let text = "solid cube_corner
  facet normal 0 0 -1
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 1.5e0 1 -2.25
    endloop
  endfacet
endsolid cube_corner
";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(
            mesh.triangles[0].vertices[2],
            Point3::new(1.5, 1.0, -2.25)
        );
    }

    #[test]
    fn test_parse_ascii_unnamed() {
        let text = "solid\nendsolid\n";
        let mesh = parse_ascii_stl(text).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_parse_ascii_error_line() {
        let text = "solid broken
  facet normal 0 0 1
    outer loop
      vertex 0 0 zero
";
        match parse_ascii_stl(text) {
            Err(DecodeError::Parse { line, .. }) => assert!(line >= 2),
            r => panic!("unexpected result {r:?}"),
        }
    }
}

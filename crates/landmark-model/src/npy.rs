//! Minimal `.npy` array codec.
//!
//! Writes format 1.0 files that NumPy loads directly. Reads format 1.0,
//! 2.0 and 3.0 headers; only little-endian `f4` and single-byte unsigned /
//! boolean element types are accepted, in C order.

use std::io::{Read, Write};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Element types this codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    /// Little-endian IEEE-754 single precision (`<f4`).
    F32,
    /// Unsigned byte (`|u1`), also used for boolean masks (`|b1`).
    U8,
}

impl Dtype {
    fn descr(self) -> &'static str {
        match self {
            Dtype::F32 => "<f4",
            Dtype::U8 => "|u1",
        }
    }

    fn item_size(self) -> usize {
        match self {
            Dtype::F32 => 4,
            Dtype::U8 => 1,
        }
    }

    fn parse(descr: &str) -> Option<Self> {
        match descr {
            "<f4" => Some(Dtype::F32),
            "|u1" | "<u1" | "u1" | "|b1" => Some(Dtype::U8),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NpyError {
    #[error("not an npy file (bad magic)")]
    BadMagic,

    #[error("unsupported npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unsupported dtype '{0}' (expected <f4 or u1)")]
    UnsupportedDtype(String),

    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,

    #[error("payload holds {actual} bytes, shape {shape:?} needs {expected}")]
    LengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A decoded array header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    pub dtype: Dtype,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Number of elements, or `None` when the shape overflows `usize`.
    pub fn element_count(&self) -> Option<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    /// Payload size in bytes, or `None` when it overflows `usize`.
    pub fn payload_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.dtype.item_size())
    }
}

/// A decoded array.
#[derive(Debug, Clone, PartialEq)]
pub enum NpyData {
    F32(Vec<f32>),
    U8(Vec<u8>),
}

/// Write an `f32` array.
pub fn write_f32<W: Write>(out: &mut W, shape: &[usize], data: &[f32]) -> std::io::Result<()> {
    debug_assert_eq!(shape.iter().product::<usize>(), data.len());
    write_header(out, Dtype::F32, shape)?;
    let mut bytes = Vec::with_capacity(data.len() * 4);
    for value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    out.write_all(&bytes)
}

/// Write a `u8` array.
pub fn write_u8<W: Write>(out: &mut W, shape: &[usize], data: &[u8]) -> std::io::Result<()> {
    debug_assert_eq!(shape.iter().product::<usize>(), data.len());
    write_header(out, Dtype::U8, shape)?;
    out.write_all(data)
}

pub(crate) fn write_header<W: Write>(out: &mut W, dtype: Dtype, shape: &[usize]) -> std::io::Result<()> {
    let shape_text = match shape {
        [single] => format!("({single},)"),
        dims => format!(
            "({})",
            dims.iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    };
    let mut dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        dtype.descr(),
        shape_text
    );

    // magic(6) + version(2) + length(2) + dict + '\n' is padded to 64 bytes.
    let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat(' ').take(padding));
    dict.push('\n');

    let header_len = u16::try_from(dict.len())
        .map_err(|_| std::io::Error::other("npy header exceeds 65535 bytes"))?;

    out.write_all(MAGIC)?;
    out.write_all(&[1, 0])?;
    out.write_all(&header_len.to_le_bytes())?;
    out.write_all(dict.as_bytes())
}

/// Read and validate an array header.
pub fn read_header<R: Read>(input: &mut R) -> Result<NpyHeader, NpyError> {
    let mut magic = [0u8; 6];
    input.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let mut version = [0u8; 2];
    input.read_exact(&mut version)?;
    let header_len = match version[0] {
        1 => {
            let mut len = [0u8; 2];
            input.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            input.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        _ => return Err(NpyError::UnsupportedVersion(version[0], version[1])),
    };

    let mut raw = vec![0u8; header_len];
    input.read_exact(&mut raw)?;
    let text = String::from_utf8(raw)
        .map_err(|_| NpyError::MalformedHeader("header is not valid text".to_string()))?;

    parse_header_dict(&text)
}

fn parse_header_dict(text: &str) -> Result<NpyHeader, NpyError> {
    let descr = dict_value(text, "descr")
        .and_then(quoted)
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing descr in {text:?}")))?;
    let dtype = Dtype::parse(descr).ok_or_else(|| NpyError::UnsupportedDtype(descr.to_string()))?;

    let fortran = dict_value(text, "fortran_order")
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing fortran_order in {text:?}")))?;
    if fortran.starts_with("True") {
        return Err(NpyError::FortranOrder);
    }

    let shape_text = dict_value(text, "shape")
        .and_then(|rest| {
            let open = rest.find('(')?;
            let close = rest.find(')')?;
            (open < close).then(|| &rest[open + 1..close])
        })
        .ok_or_else(|| NpyError::MalformedHeader(format!("missing shape in {text:?}")))?;

    let shape = shape_text
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| NpyError::MalformedHeader(format!("bad dimension '{part}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let header = NpyHeader { dtype, shape };
    if header.payload_len().is_none() {
        return Err(NpyError::MalformedHeader(format!(
            "shape {:?} overflows the addressable size",
            header.shape
        )));
    }
    Ok(header)
}

/// Text following `'key':` in the header dict.
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let needle_single = format!("'{key}'");
    let needle_double = format!("\"{key}\"");
    let (pos, len) = text
        .find(&needle_single)
        .map(|p| (p, needle_single.len()))
        .or_else(|| text.find(&needle_double).map(|p| (p, needle_double.len())))?;
    let rest = text[pos + len..].trim_start();
    Some(rest.strip_prefix(':')?.trim_start())
}

fn quoted(rest: &str) -> Option<&str> {
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &rest[1..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

/// Read a whole array (header and payload).
pub fn read_array<R: Read>(input: &mut R) -> Result<(NpyHeader, NpyData), NpyError> {
    let header = read_header(input)?;
    let expected = header.payload_len().ok_or_else(|| {
        NpyError::MalformedHeader(format!(
            "shape {:?} overflows the addressable size",
            header.shape
        ))
    })?;

    // Header sizes are untrusted. Read at most one byte past the expected length.
    let mut payload = Vec::new();
    input
        .take((expected as u64).saturating_add(1))
        .read_to_end(&mut payload)?;
    if payload.len() != expected {
        return Err(NpyError::LengthMismatch {
            shape: header.shape.clone(),
            expected,
            actual: payload.len(),
        });
    }

    let data = match header.dtype {
        Dtype::F32 => NpyData::F32(
            payload
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect(),
        ),
        Dtype::U8 => NpyData::U8(payload),
    };
    Ok((header, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_aligned_and_numpy_shaped() {
        let mut buf = Vec::new();
        write_f32(&mut buf, &[2, 33, 4], &vec![0.0; 2 * 33 * 4]).unwrap();

        let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
        let text = std::str::from_utf8(&buf[10..10 + header_len]).unwrap();
        assert!(text.starts_with("{'descr': '<f4', 'fortran_order': False, 'shape': (2, 33, 4), }"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_one_dimensional_shape_has_trailing_comma() {
        let mut buf = Vec::new();
        write_u8(&mut buf, &[3], &[1, 0, 1]).unwrap();
        let text = String::from_utf8_lossy(&buf[10..]);
        assert!(text.contains("'shape': (3,)"));
    }

    #[test]
    fn test_read_back_f32_bit_exact() {
        let values = [0.1f32, -2.5, f32::MIN_POSITIVE, 1.0e-7, 0.0, -0.0];
        let mut buf = Vec::new();
        write_f32(&mut buf, &[1, 2, 3], &values).unwrap();

        let (header, data) = read_array(&mut buf.as_slice()).unwrap();
        assert_eq!(header.shape, vec![1, 2, 3]);
        let NpyData::F32(decoded) = data else {
            panic!("expected f32 payload");
        };
        let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&decoded), bits(&values));
    }

    #[test]
    fn test_zero_length_array() {
        let mut buf = Vec::new();
        write_f32(&mut buf, &[0, 468, 3], &[]).unwrap();
        let (header, data) = read_array(&mut buf.as_slice()).unwrap();
        assert_eq!(header.shape, vec![0, 468, 3]);
        assert_eq!(data, NpyData::F32(Vec::new()));
    }

    #[test]
    fn test_rejects_float64() {
        let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 33, 4), }";
        assert!(matches!(
            parse_header_dict(header),
            Err(NpyError::UnsupportedDtype(d)) if d == "<f8"
        ));
    }

    #[test]
    fn test_rejects_fortran_order() {
        let header = "{'descr': '<f4', 'fortran_order': True, 'shape': (1, 21, 3), }";
        assert!(matches!(parse_header_dict(header), Err(NpyError::FortranOrder)));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut buf = Vec::new();
        write_f32(&mut buf, &[1, 21, 3], &vec![0.5; 63]).unwrap();
        buf.truncate(buf.len() - 4);
        assert!(matches!(
            read_array(&mut buf.as_slice()),
            Err(NpyError::LengthMismatch { expected: 252, actual: 248, .. })
        ));
    }

    #[test]
    fn test_rejects_overflowing_shape() {
        let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (9223372036854775807, 468, 3), }";
        assert!(matches!(
            parse_header_dict(header),
            Err(NpyError::MalformedHeader(msg)) if msg.contains("overflows")
        ));
    }

    #[test]
    fn test_huge_shape_with_tiny_payload_is_length_mismatch() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, Dtype::F32, &[1_000_000_000_000, 468, 3]).unwrap();
        bytes.extend_from_slice(&[0u8; 252]);

        match read_array(&mut bytes.as_slice()) {
            Err(NpyError::LengthMismatch { expected, actual, .. }) => {
                assert_eq!(expected, 1_000_000_000_000 * 468 * 3 * 4);
                assert_eq!(actual, 252);
            }
            other => panic!("expected a length mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut buf = Vec::new();
        write_u8(&mut buf, &[2], &[1, 0]).unwrap();
        buf.extend_from_slice(&[7, 7, 7]);
        assert!(matches!(
            read_array(&mut buf.as_slice()),
            Err(NpyError::LengthMismatch { expected: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn test_bad_magic() {
        let bytes = b"PK\x03\x04 not an npy file at all";
        assert!(matches!(
            read_header(&mut bytes.as_slice()),
            Err(NpyError::BadMagic)
        ));
    }
}

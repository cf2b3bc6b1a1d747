use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};
use plypick_core::{BoundingExtents, CancelFlag, Colors, LoadStage, PointCloud, ProgressSink};
use tracing::debug;

use crate::error::{PlyError, PlyResult};
use crate::schema::{FieldTag, Schema};

/// Upper bound on up-front allocation so a lying header cannot exhaust memory
/// before the body runs out.
const MAX_PREALLOC_POINTS: usize = 1 << 22;

/// Per-record decode state. Values persist from one record to the next, so a
/// schema without color fields keeps the white default throughout.
struct Record {
    position: [f32; 3],
    rgba: [u8; 4],
}

impl Record {
    fn apply(&mut self, tag: FieldTag, bytes: &[u8]) {
        match tag {
            FieldTag::R8 => self.rgba[0] = bytes[0],
            FieldTag::G8 => self.rgba[1] = bytes[0],
            FieldTag::B8 => self.rgba[2] = bytes[0],
            FieldTag::A8 => self.rgba[3] = bytes[0],

            // 16-bit channels keep their high byte.
            FieldTag::R16 => self.rgba[0] = high_byte(bytes),
            FieldTag::G16 => self.rgba[1] = high_byte(bytes),
            FieldTag::B16 => self.rgba[2] = high_byte(bytes),
            FieldTag::A16 => self.rgba[3] = high_byte(bytes),

            FieldTag::SingleX => self.position[0] = LittleEndian::read_f32(bytes),
            FieldTag::SingleY => self.position[1] = LittleEndian::read_f32(bytes),
            FieldTag::SingleZ => self.position[2] = LittleEndian::read_f32(bytes),

            FieldTag::DoubleX => self.position[0] = LittleEndian::read_f64(bytes) as f32,
            FieldTag::DoubleY => self.position[1] = LittleEndian::read_f64(bytes) as f32,
            FieldTag::DoubleZ => self.position[2] = LittleEndian::read_f64(bytes) as f32,

            // Normals are not part of the decoded cloud.
            FieldTag::SingleNx | FieldTag::SingleNy | FieldTag::SingleNz => {}

            FieldTag::Skip8 | FieldTag::Skip16 | FieldTag::Skip32 | FieldTag::Skip64 => {}
        }
    }
}

fn high_byte(bytes: &[u8]) -> u8 {
    (LittleEndian::read_u16(bytes) >> 8) as u8
}

/// Decode `schema.vertex_count` records from `reader`, which must be
/// positioned at the first body byte.
///
/// Progress is reported under [`LoadStage::Generating`] after every record.
/// `cancel` is polled once per record. Any short read fails the whole decode.
pub fn decode_body<R: Read>(
    reader: &mut R,
    schema: &Schema,
    progress: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> PlyResult<PointCloud> {
    let vertex_count = schema.vertex_count;
    let n = usize::try_from(vertex_count).map_err(|_| PlyError::InvalidVertexCount {
        found: vertex_count.to_string(),
    })?;

    let stride = schema.stride();
    let prealloc = n.min(MAX_PREALLOC_POINTS);
    let mut x = Vec::with_capacity(prealloc);
    let mut y = Vec::with_capacity(prealloc);
    let mut z = Vec::with_capacity(prealloc);
    let mut colors = Colors::with_capacity(prealloc);
    let mut extents = BoundingExtents::unset();

    let mut record = Record {
        position: [0.0; 3],
        rgba: [255; 4],
    };
    let mut buf = vec![0u8; stride];

    for i in 0..vertex_count {
        cancel.check()?;

        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => PlyError::UnexpectedEof {
                vertex: i,
                vertex_count,
            },
            _ => PlyError::Io(e),
        })?;

        let mut offset = 0;
        for &tag in &schema.fields {
            let width = tag.width();
            record.apply(tag, &buf[offset..offset + width]);
            offset += width;
        }

        let p = record.position;
        x.push(p[0]);
        y.push(p[1]);
        z.push(p[2]);
        colors.push_rgb8([record.rgba[0], record.rgba[1], record.rgba[2]]);
        extents.expand_with_point(p);

        progress.report(LoadStage::Generating, (i + 1) as f32 / vertex_count as f32);
    }

    debug!(points = n, stride, "decoded ply body");

    Ok(PointCloud {
        x,
        y,
        z,
        colors,
        extents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use plypick_core::NoProgress;
    use std::io::Cursor;
    use std::sync::Mutex;

    fn schema(fields: Vec<FieldTag>, vertex_count: u64) -> Schema {
        Schema {
            fields,
            vertex_count,
        }
    }

    fn decode(bytes: Vec<u8>, schema: &Schema) -> PlyResult<PointCloud> {
        decode_body(&mut Cursor::new(bytes), schema, &NoProgress, &CancelFlag::new())
    }

    #[test]
    fn decodes_xyz_rgb_records() {
        let s = schema(
            vec![
                FieldTag::SingleX,
                FieldTag::SingleY,
                FieldTag::SingleZ,
                FieldTag::R8,
                FieldTag::G8,
                FieldTag::B8,
            ],
            2,
        );
        let mut body = Vec::new();
        for (p, c) in [([1.0f32, -2.0, 3.0], [255u8, 0, 51]), ([-4.0, 5.0, 0.5], [0, 255, 102])] {
            for v in p {
                body.write_f32::<LittleEndian>(v).unwrap();
            }
            body.extend_from_slice(&c);
        }

        let cloud = decode(body, &s).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.point(0), [1.0, -2.0, 3.0]);
        assert_eq!(cloud.point(1), [-4.0, 5.0, 0.5]);
        assert_eq!(cloud.color(0), [1.0, 0.0, 0.2]);
        assert_eq!(cloud.color(1), [0.0, 1.0, 0.4]);
        assert_eq!(cloud.extents.min(), [-4.0, -2.0, 0.5]);
        assert_eq!(cloud.extents.max(), [1.0, 5.0, 3.0]);
    }

    #[test]
    fn sixteen_bit_color_keeps_high_byte() {
        let s = schema(vec![FieldTag::R16, FieldTag::G16, FieldTag::B16, FieldTag::A16], 1);
        let mut body = Vec::new();
        body.write_u16::<LittleEndian>(0xABCD).unwrap();
        body.write_u16::<LittleEndian>(0x00FF).unwrap();
        body.write_u16::<LittleEndian>(0xFF00).unwrap();
        body.write_u16::<LittleEndian>(0x1234).unwrap();

        let cloud = decode(body, &s).unwrap();
        let c = cloud.color(0);
        assert_eq!((c[0] * 255.0).round() as u8, 0xAB);
        assert_eq!(c[1], 0.0);
        assert_eq!(c[2], 1.0);
    }

    #[test]
    fn doubles_are_narrowed() {
        let s = schema(vec![FieldTag::DoubleX, FieldTag::DoubleY, FieldTag::DoubleZ], 1);
        let mut body = Vec::new();
        body.write_f64::<LittleEndian>(1.5).unwrap();
        body.write_f64::<LittleEndian>(-1e10).unwrap();
        body.write_f64::<LittleEndian>(0.1).unwrap();

        let cloud = decode(body, &s).unwrap();
        assert_eq!(cloud.point(0), [1.5, -1e10, 0.1f64 as f32]);
    }

    #[test]
    fn skips_and_normals_consume_their_width() {
        let s = schema(
            vec![
                FieldTag::Skip8,
                FieldTag::SingleX,
                FieldTag::Skip16,
                FieldTag::SingleY,
                FieldTag::Skip64,
                FieldTag::SingleNx,
                FieldTag::SingleZ,
                FieldTag::Skip32,
            ],
            1,
        );
        let mut body = vec![0xAA];
        body.write_f32::<LittleEndian>(7.0).unwrap();
        body.extend_from_slice(&[0xBB; 2]);
        body.write_f32::<LittleEndian>(8.0).unwrap();
        body.extend_from_slice(&[0xCC; 8]);
        body.write_f32::<LittleEndian>(0.577).unwrap();
        body.write_f32::<LittleEndian>(9.0).unwrap();
        body.extend_from_slice(&[0xDD; 4]);
        assert_eq!(body.len(), s.stride());

        let cloud = decode(body, &s).unwrap();
        assert_eq!(cloud.point(0), [7.0, 8.0, 9.0]);
        assert_eq!(cloud.color(0), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn missing_position_fields_stay_zero() {
        let s = schema(vec![FieldTag::SingleX], 2);
        let mut body = Vec::new();
        body.write_f32::<LittleEndian>(2.0).unwrap();
        body.write_f32::<LittleEndian>(-2.0).unwrap();
        let cloud = decode(body, &s).unwrap();
        assert_eq!(cloud.point(0), [2.0, 0.0, 0.0]);
        assert_eq!(cloud.extents.min(), [-2.0, 0.0, 0.0]);
        assert_eq!(cloud.extents.max(), [2.0, 0.0, 0.0]);
    }

    #[test]
    fn short_body_is_unexpected_eof() {
        let s = schema(vec![FieldTag::SingleX, FieldTag::SingleY, FieldTag::SingleZ], 3);
        let body = vec![0u8; 12 * 2 + 5];
        let err = decode(body, &s).unwrap_err();
        assert!(
            matches!(err, PlyError::UnexpectedEof { vertex: 2, vertex_count: 3 }),
            "{err:?}"
        );
    }

    #[test]
    fn zero_vertices_yield_empty_cloud() {
        let s = schema(vec![FieldTag::SingleX], 0);
        let cloud = decode(Vec::new(), &s).unwrap();
        assert!(cloud.is_empty());
        assert!(!cloud.extents.is_set());
    }

    #[test]
    fn progress_is_monotonic_and_ends_at_one() {
        let s = schema(vec![FieldTag::Skip8], 4);
        let seen = Mutex::new(Vec::new());
        let sink = |stage: LoadStage, f: f32| seen.lock().unwrap().push((stage, f));
        decode_body(&mut Cursor::new(vec![0u8; 4]), &s, &sink, &CancelFlag::new()).unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|(stage, _)| *stage == LoadStage::Generating));
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(seen.last().map(|s| s.1), Some(1.0));
    }

    #[test]
    fn cancelled_decode_stops() {
        let s = schema(vec![FieldTag::Skip8], 4);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = decode_body(&mut Cursor::new(vec![0u8; 4]), &s, &NoProgress, &cancel).unwrap_err();
        assert!(matches!(err, PlyError::Cancelled));
    }
}

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use plypick_core::{CancelFlag, LoadStage, NoProgress, PointCloud, ProgressSink};

use crate::body::decode_body;
use crate::error::PlyResult;
use crate::header::parse_header;

/// Read a `binary_little_endian` PLY file into memory.
pub fn read_ply(path: impl AsRef<Path>) -> PlyResult<PointCloud> {
    read_ply_with(path, &NoProgress, &CancelFlag::new())
}

pub fn read_ply_with(
    path: impl AsRef<Path>,
    progress: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> PlyResult<PointCloud> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    read_ply_from(&mut reader, progress, cancel)
}

/// Parse the header and decode the body from a reader positioned at the
/// start of the file. The body decoder is never reached if the header fails.
pub fn read_ply_from<R: BufRead>(
    reader: &mut R,
    progress: &dyn ProgressSink,
    cancel: &CancelFlag,
) -> PlyResult<PointCloud> {
    progress.report(LoadStage::Reading, 0.0);
    let header = parse_header(reader)?;
    progress.report(LoadStage::Reading, 1.0);

    cancel.check()?;
    decode_body(reader, &header.schema, progress, cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlyError;
    use crate::writer::write_ply_binary;
    use plypick_core::Colors;
    use proptest::prelude::*;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    #[test]
    fn ply_binary_roundtrip() {
        let mut colors = Colors::with_capacity(3);
        colors.push_rgb8([255, 0, 0]);
        colors.push_rgb8([0, 128, 0]);
        colors.push_rgb8([10, 20, 30]);
        let cloud = PointCloud::from_xyz_rgb(
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
            colors,
        );
        let tmp = NamedTempFile::new().unwrap();
        write_ply_binary(tmp.path(), &cloud).unwrap();
        let loaded = read_ply(tmp.path()).unwrap();
        assert_eq!(loaded, cloud);
    }

    #[test]
    fn ply_binary_empty() {
        let cloud = PointCloud::new();
        let tmp = NamedTempFile::new().unwrap();
        write_ply_binary(tmp.path(), &cloud).unwrap();
        let loaded = read_ply(tmp.path()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn missing_file_is_io_not_found() {
        let err = read_ply("/definitely/not/here.ply").unwrap_err();
        match err {
            PlyError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn bad_header_never_reports_generating() {
        let seen = Mutex::new(Vec::new());
        let sink = |stage: LoadStage, f: f32| seen.lock().unwrap().push((stage, f));
        let mut input = Cursor::new(b"ply\nformat ascii 1.0\nelement vertex 1\nend_header\n1 2 3\n".to_vec());
        let err = read_ply_from(&mut input, &sink, &CancelFlag::new()).unwrap_err();
        assert!(err.is_format_error());
        assert!(seen
            .into_inner()
            .unwrap()
            .iter()
            .all(|(stage, _)| *stage == LoadStage::Reading));
    }

    proptest! {
        #[test]
        fn ply_binary_roundtrip_preserves_data(
            pts in prop::collection::vec(
                (-1000.0f32..1000.0f32, -1000.0f32..1000.0f32, -1000.0f32..1000.0f32, any::<[u8; 3]>()),
                0..200
            )
        ) {
            let mut colors = Colors::with_capacity(pts.len());
            for p in &pts {
                colors.push_rgb8(p.3);
            }
            let cloud = PointCloud::from_xyz_rgb(
                pts.iter().map(|p| p.0).collect(),
                pts.iter().map(|p| p.1).collect(),
                pts.iter().map(|p| p.2).collect(),
                colors,
            );

            let mut bytes = Vec::new();
            crate::writer::write_ply_binary_to(&mut bytes, &cloud).unwrap();
            let loaded = read_ply_from(&mut Cursor::new(bytes), &NoProgress, &CancelFlag::new()).unwrap();

            prop_assert_eq!(loaded.len(), cloud.len());
            for i in 0..cloud.len() {
                // Binary roundtrip should be bit-exact for positions
                prop_assert_eq!(loaded.x[i].to_bits(), cloud.x[i].to_bits());
                prop_assert_eq!(loaded.y[i].to_bits(), cloud.y[i].to_bits());
                prop_assert_eq!(loaded.z[i].to_bits(), cloud.z[i].to_bits());
                let (a, b) = (loaded.color(i), cloud.color(i));
                for c in 0..3 {
                    prop_assert!((a[c] - b[c]).abs() <= 1.0 / 255.0);
                }
            }
            prop_assert_eq!(loaded.extents, cloud.extents);
        }
    }
}

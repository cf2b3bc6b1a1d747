use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use plypick_core::PointCloud;

use crate::error::PlyResult;

/// Write `cloud` as `binary_little_endian` PLY with float positions and
/// uchar colors.
pub fn write_ply_binary(path: impl AsRef<Path>, cloud: &PointCloud) -> PlyResult<()> {
    let file = fs::File::create(path)?;
    let mut w = BufWriter::new(file);
    write_ply_binary_to(&mut w, cloud)?;
    w.flush()?;
    Ok(())
}

pub fn write_ply_binary_to<W: Write>(w: &mut W, cloud: &PointCloud) -> PlyResult<()> {
    w.write_all(b"ply\n")?;
    w.write_all(b"format binary_little_endian 1.0\n")?;
    writeln!(w, "element vertex {}", cloud.len())?;
    w.write_all(b"property float x\n")?;
    w.write_all(b"property float y\n")?;
    w.write_all(b"property float z\n")?;
    w.write_all(b"property uchar red\n")?;
    w.write_all(b"property uchar green\n")?;
    w.write_all(b"property uchar blue\n")?;
    w.write_all(b"end_header\n")?;

    for i in 0..cloud.len() {
        w.write_f32::<LittleEndian>(cloud.x[i])?;
        w.write_f32::<LittleEndian>(cloud.y[i])?;
        w.write_f32::<LittleEndian>(cloud.z[i])?;
        for channel in cloud.color(i) {
            w.write_u8(to_channel_byte(channel))?;
        }
    }

    Ok(())
}

fn to_channel_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

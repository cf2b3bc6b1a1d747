use std::path::PathBuf;

use plypick::{write_ply_binary, Colors, PointCloud, PointCloudLoader, Ray};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // Load the file given on the command line, or a synthetic ring of points
    let scratch = tempfile::tempdir()?;
    let path = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => {
            let n = 720;
            let mut colors = Colors::with_capacity(n);
            let (mut x, mut y, mut z) = (Vec::new(), Vec::new(), Vec::new());
            for i in 0..n {
                let a = (i as f32).to_radians() * 0.5;
                x.push(10.0 * a.cos());
                y.push((i % 2) as f32 * 0.01);
                z.push(10.0 * a.sin());
                colors.push_rgb8([(i % 256) as u8, 64, 200]);
            }
            let path = scratch.path().join("ring.ply");
            write_ply_binary(&path, &PointCloud::from_xyz_rgb(x, y, z, colors))?;
            path
        }
    };

    let loader = PointCloudLoader::default();
    let loaded = loader.load(&path)?;
    let extents = loaded.cloud.extents;
    println!("Loaded {} points from {}", loaded.cloud.len(), path.display());
    println!("Extents: min={:?}, max={:?}", extents.min(), extents.max());
    println!(
        "Octree: {} nodes, depth {}, root edge {:.2}",
        loaded.index.node_count(),
        loaded.index.depth(),
        loaded.index.root_size()
    );

    // Cast rays from the center of the cloud outwards
    let origin = extents.center();
    for deg in (0..360).step_by(45) {
        let a = (deg as f32).to_radians();
        let Some(ray) = Ray::from_arrays(origin, [a.cos(), 0.0, a.sin()]) else {
            continue;
        };
        match loader.pick(&ray) {
            Some(hit) => println!(
                "{deg:>3}°: point #{} at [{:.3}, {:.3}, {:.3}]",
                hit.index, hit.world.x, hit.world.y, hit.world.z
            ),
            None => println!("{deg:>3}°: nothing within {}", loader.config().pick_tolerance),
        }
    }

    Ok(())
}

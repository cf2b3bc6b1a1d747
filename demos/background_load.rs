use plypick::{write_ply_binary, LoaderConfig, LoaderEvent, PointCloud, PointCloudLoader};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    // A synthetic 200k point slab
    let n = 200_000;
    let x: Vec<f32> = (0..n).map(|i| (i as f32 * 0.731) % 50.0).collect();
    let y: Vec<f32> = (0..n).map(|i| (i as f32 * 0.419) % 5.0).collect();
    let z: Vec<f32> = (0..n).map(|i| (i as f32 * 0.257) % 50.0).collect();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("slab.ply");
    write_ply_binary(&path, &PointCloud::from_xyz(x, y, z))?;

    let loader = PointCloudLoader::new(LoaderConfig {
        progress_granularity: 10,
        ..LoaderConfig::default()
    });
    let events = loader.subscribe();
    let task = loader.spawn_load(path);

    while let Ok(event) = events.recv_blocking() {
        match event {
            LoaderEvent::Progress { stage, fraction } => println!("{stage:<20} {:>5.1}%", fraction * 100.0),
            LoaderEvent::StateChanged(state) => println!("state: {state:?}"),
            LoaderEvent::Loaded { point_count, extents } => {
                println!("loaded {point_count} points, center {:?}", extents.center());
                break;
            }
            LoaderEvent::Failed { message } => {
                println!("failed: {message}");
                break;
            }
            LoaderEvent::Picked(_) => {}
        }
    }

    let loaded = task.wait()?;
    println!("octree holds {} points in {} nodes", loaded.index.len(), loaded.index.node_count());
    Ok(())
}

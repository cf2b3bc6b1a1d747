use nalgebra::{Point3, Vector3};
use plypick::{
    search_nearest, write_ply_binary, Colors, LoadStage, LoaderConfig, LoaderEvent, OctreeParams, Placement,
    PointCloud, PointCloudLoader, PointOctree, Ray,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::NamedTempFile;

fn grid_cloud(offset: f32) -> PointCloud {
    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut z = Vec::new();
    let mut colors = Colors::with_capacity(100);
    for i in 0..10 {
        for j in 0..10 {
            x.push(offset + i as f32);
            y.push(j as f32);
            z.push(((i + j) % 3) as f32 * 0.5);
            colors.push_rgb8([(i * 25) as u8, (j * 25) as u8, 128]);
        }
    }
    PointCloud::from_xyz_rgb(x, y, z, colors)
}

fn save(cloud: &PointCloud) -> NamedTempFile {
    let tmp = NamedTempFile::new().unwrap();
    write_ply_binary(tmp.path(), cloud).unwrap();
    tmp
}

fn down_ray(x: f32, y: f32) -> Ray {
    Ray::from_arrays([x, y, 50.0], [0.0, 0.0, -1.0]).unwrap()
}

/// End-to-end: write → load → index → pick every point from above.
#[test]
fn load_index_and_pick_every_point() {
    let cloud = grid_cloud(0.0);
    let file = save(&cloud);
    let loader = PointCloudLoader::default();
    let loaded = loader.load(file.path()).unwrap();
    assert_eq!(loaded.cloud.len(), 100);
    assert_eq!(loaded.index.len(), 100);

    for i in 0..cloud.len() {
        let [px, py, pz] = cloud.point(i);
        let hit = loader.pick(&down_ray(px, py)).unwrap();
        assert_eq!(hit.index, i);
        assert_eq!(hit.local, Point3::new(px, py, pz));
        assert_eq!(loaded.cloud.color(hit.index), cloud.color(i));
    }
    assert!(loader.pick(&down_ray(0.5, 0.5)).is_none());
}

#[test]
fn picks_follow_the_placement() {
    let file = save(&grid_cloud(0.0));
    let loader = PointCloudLoader::default();
    loader.load(file.path()).unwrap();

    let placement = Placement::new(
        Vector3::new(-3.0, 2.0, 7.0),
        Vector3::new(0.0, 90.0, 0.0),
        Vector3::new(2.0, 2.0, 2.0),
    );
    loader.set_placement(placement);

    let target = Point3::new(4.0, 6.0, 0.5);
    let world = placement.to_world(&target);
    let ray = Ray::new(world - Vector3::x() * 40.0, Vector3::x()).unwrap();
    let hit = loader.pick(&ray).unwrap();
    assert!((hit.local - target).norm() < 1e-4);
    assert!((hit.world - world).norm() < 1e-3);
}

#[test]
fn reload_replaces_every_result() {
    let first = grid_cloud(0.0);
    let second = grid_cloud(100.0);
    let (a, b) = (save(&first), save(&second));
    let loader = PointCloudLoader::default();

    loader.load(a.path()).unwrap();
    assert!(loader.search_nearest(&down_ray(3.0, 3.0), 0.05).is_some());

    loader.load(b.path()).unwrap();
    for i in 0..first.len() {
        let [px, py, _] = first.point(i);
        assert!(loader.search_nearest(&down_ray(px, py), 0.05).is_none());
    }
    for i in 0..second.len() {
        let [px, py, _] = second.point(i);
        let hit = loader.search_nearest(&down_ray(px, py), 0.05).unwrap();
        assert!(hit.local.x >= 100.0);
    }
    assert_eq!(loader.extents().map(|e| e.min()[0]), Some(100.0));
}

#[test]
fn background_load_streams_progress() {
    let file = save(&grid_cloud(0.0));
    let loader = PointCloudLoader::new(LoaderConfig {
        progress_granularity: 4,
        ..LoaderConfig::default()
    });
    let rx = loader.subscribe();
    let task = loader.spawn_load(file.path().to_path_buf());

    let mut progress: Vec<(LoadStage, f32)> = Vec::new();
    loop {
        match rx.recv_blocking().unwrap() {
            LoaderEvent::Progress { stage, fraction } => progress.push((stage, fraction)),
            LoaderEvent::Loaded { point_count, .. } => {
                assert_eq!(point_count, 100);
                break;
            }
            LoaderEvent::Failed { message } => panic!("load failed: {message}"),
            _ => {}
        }
    }
    task.wait().unwrap();

    for stage in [LoadStage::Reading, LoadStage::Generating, LoadStage::CalculatingOctree] {
        let fractions: Vec<f32> = progress.iter().filter(|p| p.0 == stage).map(|p| p.1).collect();
        assert!(!fractions.is_empty(), "no progress for {stage}");
        assert!(fractions.len() <= 5);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
        assert_eq!(fractions.last().copied(), Some(1.0));
    }
    let order: Vec<LoadStage> = progress.iter().map(|p| p.0).collect();
    assert!(order.windows(2).all(|w| stage_rank(w[0]) <= stage_rank(w[1])));
}

fn stage_rank(stage: LoadStage) -> u8 {
    match stage {
        LoadStage::Reading => 0,
        LoadStage::Generating => 1,
        LoadStage::CalculatingOctree => 2,
    }
}

/// The octree-backed search agrees with a linear scan for rays entering the
/// cloud from outside its bounds.
#[test]
fn search_nearest_matches_linear_scan() {
    let mut rng = StdRng::seed_from_u64(7);
    let n = 5_000;
    let x: Vec<f32> = (0..n).map(|_| rng.gen_range(-20.0f32..20.0)).collect();
    let y: Vec<f32> = (0..n).map(|_| rng.gen_range(-20.0f32..20.0)).collect();
    let z: Vec<f32> = (0..n).map(|_| rng.gen_range(-20.0f32..20.0)).collect();
    let cloud = PointCloud::from_xyz(x, y, z);
    let tree = PointOctree::build(&cloud, OctreeParams::default());
    let placement = Placement::identity();
    let tolerance = 0.3;

    for _ in 0..200 {
        let origin = [rng.gen_range(-20.0f32..20.0), rng.gen_range(-20.0f32..20.0), -60.0];
        let dir = [rng.gen_range(-0.2f32..0.2), rng.gen_range(-0.2f32..0.2), 1.0];
        let ray = Ray::from_arrays(origin, dir).unwrap();

        let expected = cloud
            .iter_points()
            .enumerate()
            .filter(|(_, p)| ray.squared_distance_to_line(&Point3::from(*p)) <= tolerance * tolerance)
            .map(|(i, p)| (i, (Point3::from(p) - ray.origin).norm_squared()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);

        let found = search_nearest(Some(&tree), &placement, &ray, tolerance).map(|h| h.index);
        assert_eq!(found, expected);
    }
}

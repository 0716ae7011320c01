//! Opens the viewer on the sample cube. Needs a GPU and a display, so it is
//! run by hand: `cargo test --test viz-viewer -- --ignored`.
use pcdtools::{io::read_point_cloud, logging::enable_tracing, viz::show_point_cloud};

#[test]
#[ignore]
fn test_show_cube() {
    enable_tracing(true);
    let pcl = read_point_cloud("tests/data/cube.ply").unwrap();
    show_point_cloud(&pcl).unwrap();
}

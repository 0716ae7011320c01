mod sphere3d;
pub use sphere3d::Sphere3Df;

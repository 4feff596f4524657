use nalgebra::{Isometry3, Rotation3, Translation3};
use uscal_core::synthetic::jitter_points;
use uscal_core::{Mat4, Pt3, Real, Vec3, transform_point, uniform_scaling};
use uscal_linear::{ImageDimensions, RegistrationMode};
use uscal_pipeline::imageless::{ImagelessConfig, ImagelessSession};
use uscal_pipeline::{CalibrationStatus, TransformHandle};

const WIDTH_PX: u32 = 512;
const HEIGHT_PX: u32 = 640;
const DEPTH_MM: Real = 80.0;
const THICKNESS_MM: Real = 12.0;

/// Image-mm → probe pose of a simulated transducer.
fn probe_pose() -> Isometry3<Real> {
    Isometry3::from_parts(
        Translation3::new(12.0, -30.0, 55.0),
        Rotation3::from_euler_angles(0.3, -0.2, 1.1).into(),
    )
}

/// Corner points on each side of a probe whose image plane sits at
/// `pose`. Returns `(marked, unmarked)`.
fn footprint(pose: &Isometry3<Real>) -> ([Pt3; 2], [Pt3; 2]) {
    let width_mm = Real::from(WIDTH_PX) * DEPTH_MM / Real::from(HEIGHT_PX);
    let normal = pose.rotation * Vec3::z() * (THICKNESS_MM / 2.0);
    let marked_near = pose * Pt3::new(width_mm, 0.0, 0.0);
    let unmarked_near = pose * Pt3::new(0.0, 0.0, 0.0);
    (
        [marked_near - normal, marked_near + normal],
        [unmarked_near - normal, unmarked_near + normal],
    )
}

fn calibrated(marked: [Pt3; 2], unmarked: [Pt3; 2]) -> ImagelessSession {
    let mut session = ImagelessSession::with_description("synthetic linear probe");
    session.set_image_dimensions(Some(ImageDimensions::new(WIDTH_PX, HEIGHT_PX)));
    session.set_depth(DEPTH_MM);
    for p in marked {
        session.append_marked_point(p);
    }
    for p in unmarked {
        session.append_unmarked_point(p);
    }
    session
}

fn expected_image_to_probe(pose: &Isometry3<Real>) -> Mat4 {
    let scale = DEPTH_MM / Real::from(HEIGHT_PX);
    pose.to_homogeneous() * uniform_scaling(scale)
}

#[test]
fn recovers_known_probe_geometry() {
    let pose = probe_pose();
    let (marked, unmarked) = footprint(&pose);
    let session = calibrated(marked, unmarked);

    assert_eq!(session.status(), Some(&CalibrationStatus::Success));
    let got = session.image_to_probe().unwrap();
    let want = expected_image_to_probe(&pose);
    assert!((got - want).norm() < 1e-9, "got {got}, want {want}");

    // Image corners land on the probe face and at depth.
    let corner = transform_point(&got, &Pt3::new(0.0, Real::from(HEIGHT_PX), 0.0));
    let expected = pose * Pt3::new(0.0, DEPTH_MM, 0.0);
    assert!((corner - expected).norm() < 1e-9);
}

#[test]
fn rigid_mode_matches_similarity_on_exact_footprint() {
    let pose = probe_pose();
    let (marked, unmarked) = footprint(&pose);
    let mut session = calibrated(marked, unmarked);
    let similarity = session.image_to_probe().unwrap();

    let out = session
        .set_config(ImagelessConfig {
            registration: RegistrationMode::Rigid,
            ..Default::default()
        })
        .unwrap();
    assert!(out.is_success());
    assert!((out.transform.unwrap() - similarity).norm() < 1e-9);
}

#[test]
fn noisy_corners_stay_close() {
    let pose = probe_pose();
    let (marked, unmarked) = footprint(&pose);
    let noisy_marked = jitter_points(7, &marked, 0.05);
    let noisy_unmarked = jitter_points(8, &unmarked, 0.05);
    let session = calibrated(
        [noisy_marked[0], noisy_marked[1]],
        [noisy_unmarked[0], noisy_unmarked[1]],
    );

    let got = session.image_to_probe().unwrap();
    let want = expected_image_to_probe(&pose);
    for px in [
        Pt3::new(0.0, 0.0, 0.0),
        Pt3::new(Real::from(WIDTH_PX), Real::from(HEIGHT_PX), 0.0),
    ] {
        let d = (transform_point(&got, &px) - transform_point(&want, &px)).norm();
        assert!(d < 5.0, "pixel {px} off by {d} mm");
    }
}

#[test]
fn output_target_follows_latest_success() {
    let pose = probe_pose();
    let (marked, unmarked) = footprint(&pose);
    let mut session = calibrated(marked, unmarked);

    let handle = TransformHandle::new();
    session.set_output_target(Some(handle.clone()));
    assert_eq!(handle.get(), session.image_to_probe());

    let reader = handle.clone();
    let seen = std::thread::spawn(move || reader.get()).join().unwrap();
    assert_eq!(seen, session.image_to_probe());

    // A failed recompute does not touch the published transform.
    let before = handle.get();
    session.set_image_dimensions(None);
    assert_eq!(handle.get(), before);
}

#[test]
fn session_json_roundtrip() {
    let pose = probe_pose();
    let (marked, unmarked) = footprint(&pose);
    let mut session = calibrated(marked, unmarked);
    session.set_output_target(Some(TransformHandle::new()));

    let json = session.to_json().unwrap();
    let mut restored = ImagelessSession::from_json(&json).unwrap();
    assert!(restored.output_target().is_none());
    assert_eq!(
        restored.marked_points().labels(),
        session.marked_points().labels()
    );
    for (a, b) in restored
        .unmarked_points()
        .iter()
        .zip(session.unmarked_points().iter())
    {
        assert!((a.position - b.position).norm() < 1e-12);
    }
    assert_eq!(restored.depth_mm(), Some(DEPTH_MM));
    let before = session.image_to_probe().unwrap();
    assert!((restored.image_to_probe().unwrap() - before).norm() < 1e-12);

    let out = restored.recompute();
    assert!(out.is_success());

    let pointer_json = uscal_pipeline::PointerSession::new().to_json().unwrap();
    assert!(ImagelessSession::from_json(&pointer_json).is_err());
}

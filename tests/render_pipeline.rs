//! End-to-end scenarios through the public engine API.

use std::sync::Arc;
use std::time::Duration;

use spekview::audio::synthetic;
use spekview::config::AppConfig;
use spekview::render::{render_pass, Geometry, RenderCoordinator, RenderPlan, RenderSnapshot};
use spekview::spectrum::{
    fft_context, fft_size_for_rate, hann_window, palette, transform, FrameExtractor,
};
use spekview::{InstanceStatus, SpectrogramEngine};

#[test]
fn tone_440_peaks_at_bin_20() {
    let source = synthetic::sine(440.0, 1.0, 1.0, 44_100).unwrap();
    let siz = fft_size_for_rate(source.sample_rate());
    assert_eq!(siz, 2048);

    let window = hann_window(siz);
    let ctx = fft_context(siz);
    let mut real = vec![0.0; siz];
    let mut imag = vec![0.0; siz];
    FrameExtractor::new(source.samples(), &window).fill(10_000, &mut real, &mut imag);
    transform(&ctx, &mut real, &mut imag);

    let power: Vec<f64> = (0..siz / 2)
        .map(|k| (real[k] as f64).powi(2) + (imag[k] as f64).powi(2))
        .collect();
    let peak = (0..power.len())
        .max_by(|&a, &b| power[a].total_cmp(&power[b]))
        .unwrap();
    assert_eq!(peak, 20);

    let outside = power
        .iter()
        .enumerate()
        .filter(|(k, _)| !(18..=22).contains(k))
        .map(|(_, p)| *p)
        .fold(0.0, f64::max);
    assert!(power[20] > 50.0 * outside);
}

#[test]
fn silent_audio_renders_palette_zero_everywhere() {
    let source = synthetic::silence(2.0, 96_000).unwrap();
    let plan = RenderPlan::for_sample_rate(96_000);
    for log_scale in [false, true] {
        let snapshot = RenderSnapshot {
            log_scale,
            ..RenderSnapshot::full_view(Geometry::new(0, 0, 50, 40, 50, 40))
        };
        let buffer = render_pass(&source, &plan, &snapshot, 4).unwrap();
        assert!(buffer.pixels().iter().all(|p| *p == palette()[0]));
    }
}

#[test]
fn burst_of_requests_renders_once() {
    let coordinator = RenderCoordinator::new(4);
    let id = spekview::InstanceId(1);
    let geometry = Geometry::new(0, 0, 40, 20, 40, 20);
    coordinator.register(id).unwrap();
    coordinator
        .attach_audio(id, Arc::new(synthetic::sine(1000.0, 0.5, 1.0, 22_050).unwrap()))
        .unwrap();
    coordinator.set_geometry(id, geometry).unwrap();

    for i in 0..50 {
        let snapshot = RenderSnapshot {
            zoom: 8.0,
            pan: (i as f64) / 100.0,
            coarse: i % 2 == 0,
            ..RenderSnapshot::full_view(geometry)
        };
        coordinator.request_render(id, snapshot).unwrap();
    }

    let report = coordinator.drain().unwrap();
    assert_eq!(report.rendered, 1);
    let frame = coordinator.latest_frame(id).unwrap().unwrap();
    assert_eq!(frame.snapshot.pan, 0.49);
    assert!(!frame.snapshot.coarse);
}

#[test]
fn worker_renders_without_manual_drain() {
    let config = AppConfig::default();
    let engine = SpectrogramEngine::with_config(config);
    let mut frames = engine.subscribe_frames();
    engine.start_worker().unwrap();

    let id = engine
        .create_instance(synthetic::white_noise(0.3, 1.0, 44_100, 9).unwrap())
        .unwrap();
    engine.layout(id, 0, 0, 32, 32, 32, 32).unwrap();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let _guard = rt.enter();
    let frame = rt
        .block_on(tokio::time::timeout(Duration::from_secs(5), frames.recv()))
        .expect("frame within timeout")
        .unwrap();
    assert_eq!(frame.instance, id);

    engine.stop_worker().unwrap();
    assert!(engine.latest_frame(id).unwrap().is_some());
}

#[test]
fn sibling_instances_survive_decode_failure() {
    let engine = SpectrogramEngine::with_config(AppConfig::default());
    let good = engine
        .create_instance(synthetic::sine(300.0, 0.5, 1.0, 16_000).unwrap())
        .unwrap();
    let (bad, status) = engine.open_bytes(b"RIFF....WAVEjunk", Some("wav")).unwrap();
    assert!(matches!(status, InstanceStatus::Failed { .. }));

    for id in [good, bad] {
        engine.layout(id, 0, 0, 24, 24, 24, 24).unwrap();
    }
    assert_eq!(engine.drain_now().unwrap().rendered, 1);

    let png = engine.export_composite(&[good, bad]).unwrap().unwrap();
    let image = image::load_from_memory(&png).unwrap();
    assert_eq!((image.width(), image.height()), (24, 24));
}

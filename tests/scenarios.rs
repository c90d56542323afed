//! End-to-end batch scenarios with the real codec.
//!
//! Every test builds its source images in memory with the `image` crate, so
//! no fixtures are needed.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use isolay::imaging::{
    CodecError, Dimensions, Encoded, ImageCodec, OutputFormat, RustCodec, TranscodeParams,
};
use isolay::export::{downloads, write_downloads};
use isolay::orchestrate::run_batch;
use isolay::registry::{JobState, SharedRegistry};
use isolay::settings::{OptimizeSettings, SettingsHandle};
use isolay::source::submit_images;
use isolay::wire::{RenditionRequest, ResponseBody, handle};
use std::collections::BTreeSet;
use std::io::Cursor;

fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(Cursor::new(&mut buf), 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

fn settings(widths: &[u32], format: OutputFormat) -> SettingsHandle {
    SettingsHandle::new(OptimizeSettings {
        format,
        widths: widths.iter().copied().collect::<BTreeSet<_>>(),
        custom_width: None,
        ..OptimizeSettings::default()
    })
}

/// Real codec that refuses to encode selected widths.
struct FailingAt {
    inner: RustCodec,
    widths: Vec<u32>,
}

impl ImageCodec for FailingAt {
    fn identify(&self, bytes: &[u8]) -> Result<Dimensions, CodecError> {
        self.inner.identify(bytes)
    }

    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Encoded, CodecError> {
        if self.widths.contains(&params.width) {
            return Err(CodecError::Encode(format!("refusing width {}", params.width)));
        }
        self.inner.transcode(bytes, params)
    }
}

/// Submit one image and run a batch over it.
fn run_single(
    bytes: Vec<u8>,
    settings: &SettingsHandle,
    codec: &impl ImageCodec,
) -> (SharedRegistry, isolay::registry::JobId) {
    let registry = SharedRegistry::default();
    let report = submit_images(&registry, vec![("photo.jpg", bytes)]);
    assert!(report.rejected.is_empty());
    run_batch(&registry, settings, codec, None);
    (registry, report.accepted[0])
}

#[test]
fn large_source_two_webp_widths() {
    let original = gradient_jpeg(3000, 2000);
    let original_size = original.len();
    let (registry, id) = run_single(
        original,
        &settings(&[400, 800], OutputFormat::WebP),
        &RustCodec::new(),
    );

    let job = registry.get(id).unwrap();
    assert_eq!(job.state, JobState::Complete);
    assert_eq!(job.progress, 100);

    let dims: Vec<(u32, u32)> = job.renditions.iter().map(|r| (r.width, r.height)).collect();
    assert_eq!(dims, vec![(400, 267), (800, 533)]);
    for r in &job.renditions {
        assert_eq!(r.mime_type(), "image/webp");
        assert_eq!(image::guess_format(&r.bytes).unwrap(), image::ImageFormat::WebP);
        assert!(r.byte_size() < original_size);
    }

    // Scenario E: dropping one rendition leaves the rest of the job alone
    let removed = registry.write(|r| r.remove_rendition(id, 800)).unwrap();
    assert_eq!(removed.width, 800);
    let job = registry.get(id).unwrap();
    assert_eq!(job.renditions.len(), 1);
    assert_eq!(job.renditions[0].width, 400);
    assert_eq!(job.state, JobState::Complete);
    assert_eq!(job.progress, 100);
}

#[test]
fn small_source_is_not_upscaled() {
    let (registry, id) = run_single(
        gradient_jpeg(300, 200),
        &settings(&[800], OutputFormat::Jpeg),
        &RustCodec::new(),
    );

    let job = registry.get(id).unwrap();
    assert_eq!(job.state, JobState::Complete);
    assert_eq!(job.renditions.len(), 1);
    let r = &job.renditions[0];
    assert_eq!((r.width, r.height), (300, 200));
    assert_eq!(r.requested_width, 800);

    let decoded = image::load_from_memory(&r.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 200));
}

#[test]
fn no_widths_plans_nothing() {
    let (registry, id) = run_single(
        gradient_jpeg(64, 64),
        &settings(&[], OutputFormat::WebP),
        &RustCodec::new(),
    );

    let job = registry.get(id).unwrap();
    assert_eq!(job.state, JobState::NothingPlanned);
    assert_eq!(job.progress, 0);
    assert!(job.renditions.is_empty());
    assert!(job.failures.is_empty());
}

#[test]
fn one_failed_width_still_completes() {
    let codec = FailingAt {
        inner: RustCodec::new(),
        widths: vec![80],
    };
    let (registry, id) = run_single(
        gradient_jpeg(200, 100),
        &settings(&[40, 80], OutputFormat::Png),
        &codec,
    );

    let job = registry.get(id).unwrap();
    assert_eq!(job.state, JobState::Complete);
    assert_eq!(job.progress, 100);
    assert_eq!(job.renditions.len(), 1);
    assert_eq!(job.renditions[0].width, 40);
    assert_eq!(job.failures.len(), 1);
    assert_eq!(job.failures[0].requested_width, 80);
}

#[test]
fn every_width_failing_is_an_error() {
    let codec = FailingAt {
        inner: RustCodec::new(),
        widths: vec![40, 80],
    };
    let (registry, id) = run_single(
        gradient_jpeg(200, 100),
        &settings(&[40, 80], OutputFormat::Png),
        &codec,
    );

    let job = registry.get(id).unwrap();
    assert_eq!(job.state, JobState::Error);
    assert_eq!(job.progress, 0);
    assert!(job.renditions.is_empty());
}

#[test]
fn rejected_files_never_enter_the_registry() {
    let registry = SharedRegistry::default();
    let report = submit_images(
        &registry,
        vec![
            ("good.jpg", gradient_jpeg(32, 32)),
            ("empty.jpg", Vec::new()),
            ("notes.txt", b"hello".to_vec()),
        ],
    );

    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.rejected.len(), 2);
    assert_eq!(registry.snapshot().len(), 1);

    let summary = run_batch(&registry, &settings(&[16], OutputFormat::Gif), &RustCodec::new(), None);
    assert_eq!(summary.complete, 1);
}

#[test]
fn renditions_write_under_download_names() {
    let (registry, _) = run_single(
        gradient_jpeg(120, 80),
        &settings(&[60, 100], OutputFormat::Avif),
        &RustCodec::new(),
    );
    let tmp = tempfile::TempDir::new().unwrap();

    let jobs = registry.snapshot();
    let list = downloads(&jobs, "isolay", true);
    write_downloads(tmp.path(), &list).unwrap();

    assert!(tmp.path().join("photo-isolay.jpg").exists());
    assert!(tmp.path().join("photo-60w-isolay.avif").exists());
    assert!(tmp.path().join("photo-100w-isolay.avif").exists());
}

#[test]
fn same_stem_inputs_do_not_overwrite_each_other() {
    let registry = SharedRegistry::default();
    let first = gradient_jpeg(200, 100);
    let second = gradient_jpeg(300, 100);
    submit_images(
        &registry,
        vec![("photo.jpg", first), ("photo.jpg", second)],
    );
    run_batch(&registry, &settings(&[50], OutputFormat::Png), &RustCodec::new(), None);
    let tmp = tempfile::TempDir::new().unwrap();

    let jobs = registry.snapshot();
    let list = downloads(&jobs, "isolay", false);
    let written = write_downloads(tmp.path(), &list).unwrap();
    assert_eq!(written.len(), 2);

    let heights: Vec<u32> = ["photo-50w-isolay.png", "photo-50w-isolay (1).png"]
        .iter()
        .map(|name| image::open(tmp.path().join(name)).unwrap().height())
        .collect();
    assert_eq!(heights, vec![25, 17]);
}

#[test]
fn wire_request_returns_decodable_data_url() {
    let request = RenditionRequest {
        file: Some(gradient_jpeg(400, 200)),
        width: Some("100".into()),
        format: Some("png".into()),
        preserve_aspect_ratio: Some("true".into()),
        prevent_upscaling: Some("true".into()),
        ..Default::default()
    };

    let response = handle(&RustCodec::new(), request);
    assert_eq!(response.status, 200);
    let ResponseBody::Success(body) = response.body else {
        panic!("expected success");
    };
    assert_eq!(body.format, "image/png");
    assert_eq!(body.width, 100);

    let encoded = body.data_url.strip_prefix("data:image/png;base64,").unwrap();
    let bytes = STANDARD.decode(encoded).unwrap();
    assert_eq!(bytes.len(), body.optimized_size);
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (100, 50));
}

#[test]
fn wire_request_with_garbage_is_500() {
    let request = RenditionRequest {
        file: Some(b"definitely not an image".to_vec()),
        ..Default::default()
    };
    let response = handle(&RustCodec::new(), request);
    assert_eq!(response.status, 500);
    let json = response.to_json().unwrap();
    assert!(json.contains("\"error\":\"Failed to optimize image\""));
    assert!(json.contains("\"details\""));
}

//! End-to-end pipeline scenarios with a fake background-removal service.

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use specimen_core::pipeline::target_size;
use specimen_core::{
    BackgroundRemover, BatchItem, BatchProcessor, Config, ImageProcessor, PipelineError,
    ProcessOptions,
};

/// How the fake service behaves on every call.
enum Behavior {
    Succeed(Vec<u8>),
    Fail,
    Hang,
}

struct FakeRemover {
    behavior: Behavior,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl BackgroundRemover for FakeRemover {
    fn name(&self) -> &str {
        "fake"
    }

    async fn remove(&self, _image: &[u8]) -> Result<Vec<u8>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Succeed(bytes) => Ok(bytes.clone()),
            Behavior::Fail => Err(PipelineError::Removal {
                message: "HTTP 500".to_string(),
                status_code: Some(500),
            }),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!("the pipeline timeout fires first")
            }
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(50)
    }
}

fn processor_with(behavior: Behavior) -> (ImageProcessor, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let remover = FakeRemover {
        behavior,
        calls: calls.clone(),
    };
    let processor = ImageProcessor::with_remover(&Config::default(), Some(Arc::new(remover)));
    (processor, calls)
}

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// 500x500 white photo with a dark 400x400 subject and a 50px margin.
fn white_studio_shot() -> Vec<u8> {
    let mut img = RgbImage::from_pixel(500, 500, Rgb([255, 255, 255]));
    for y in 50..450 {
        for x in 50..450 {
            img.put_pixel(x, y, Rgb([40, 40, 40]));
        }
    }
    encode_png(img)
}

fn red_backdrop() -> Vec<u8> {
    encode_png(RgbImage::from_pixel(800, 600, Rgb([255, 0, 0])))
}

fn assert_square_jpeg(bytes: &[u8], side: u32) {
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(bytes).unwrap();
    let (w, h) = decoded.dimensions();
    assert_eq!(w, h, "output must be square");
    assert!(w.abs_diff(side) <= 1, "expected ~{side}px, got {w}px");
}

#[tokio::test]
async fn white_studio_shot_skips_removal_and_repads() {
    let (processor, calls) = processor_with(Behavior::Succeed(red_backdrop()));

    let result = processor.process(white_studio_shot()).await.unwrap();

    assert!(result.assessment.is_white);
    assert!(result.assessment.white_ratio > 0.85);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!result.was_background_removed);
    assert_eq!(result.trimmed.width, 400);
    assert_eq!(result.trimmed.height, 400);
    assert_square_jpeg(&result.buffer, target_size(400, 0.10));
}

#[tokio::test]
async fn red_backdrop_with_failing_service_still_normalizes() {
    let (processor, calls) = processor_with(Behavior::Fail);

    let result = processor.process(red_backdrop()).await.unwrap();

    assert!(!result.assessment.is_white);
    assert_eq!(result.assessment.white_ratio, 0.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!result.was_background_removed);
    assert_eq!(result.trimmed.width, 800);
    assert_eq!(result.trimmed.height, 600);
    assert_square_jpeg(&result.buffer, 960);
}

#[tokio::test]
async fn hanging_service_times_out_and_degrades() {
    let (processor, calls) = processor_with(Behavior::Hang);

    let result = processor.process(red_backdrop()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!result.was_background_removed);
    assert_square_jpeg(&result.buffer, 960);
}

#[tokio::test]
async fn non_white_border_triggers_removal() {
    let cutout = {
        let mut img = RgbImage::from_pixel(600, 600, Rgb([255, 255, 255]));
        for y in 200..400 {
            for x in 150..450 {
                img.put_pixel(x, y, Rgb([200, 30, 30]));
            }
        }
        encode_png(img)
    };
    let (processor, calls) = processor_with(Behavior::Succeed(cutout));

    let result = processor.process(red_backdrop()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.was_background_removed);
    assert_eq!(result.trimmed.width, 300);
    assert_eq!(result.trimmed.height, 200);
    assert_square_jpeg(&result.buffer, 360);
}

#[tokio::test]
async fn missing_credential_never_touches_the_network() {
    let mut config = Config::default();
    config.removal.api_key = "${SPECIMEN_IT_UNSET_REMOVE_BG_KEY}".to_string();
    // Any request would have to go here and fail loudly in the logs
    config.removal.endpoint = "http://127.0.0.1:9/never".to_string();
    let processor = ImageProcessor::new(&config);
    assert!(!processor.has_remover());

    let result = processor.process(red_backdrop()).await.unwrap();
    assert!(!result.was_background_removed);
    assert_square_jpeg(&result.buffer, 960);
}

#[tokio::test]
async fn square_invariant_over_assorted_shapes() {
    let (processor, _) = processor_with(Behavior::Fail);
    let shapes = [(1, 1), (3, 200), (200, 3), (123, 77), (640, 640)];

    for (w, h) in shapes {
        let bytes = encode_png(RgbImage::from_pixel(w, h, Rgb([12, 200, 90])));
        let result = processor.process(bytes).await.unwrap();
        assert!(result.output.is_square(), "{w}x{h} -> {}", result.output);
        assert_eq!(result.output.width, target_size(w.max(h), 0.10));
    }
}

#[tokio::test]
async fn renormalizing_starts_from_a_fresh_trim() {
    let processor = ImageProcessor::with_remover(&Config::default(), None);

    let first = processor.process(white_studio_shot()).await.unwrap();
    let second = processor
        .process_with_options(first.buffer.clone(), &ProcessOptions::default())
        .await
        .unwrap();

    // The contained subject fills the first canvas edge to edge, so the second
    // pass trims nothing and pads again
    assert!(second.trimmed.width.abs_diff(first.output.width) <= 2);
    assert_eq!(
        second.output.width,
        target_size(second.trimmed.max_side(), 0.10)
    );
    assert!(second.output.width > first.output.width);
}

#[tokio::test]
async fn batch_isolates_unprocessable_items() {
    let (processor, _) = processor_with(Behavior::Fail);
    let batch = BatchProcessor::new(Arc::new(processor), 3, ProcessOptions::default());

    let items = vec![
        BatchItem::new("sample-1", white_studio_shot()),
        BatchItem::new("sample-2", b"\x89PNG\r\n\x1a\ntruncated".to_vec()),
        BatchItem::new("sample-3", red_backdrop()),
    ];
    let report = batch.run(items, |_| Ok(())).await;

    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert!(report.errors[0].starts_with("sample-2: "));
}

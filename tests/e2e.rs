mod common;

use common::init_logging;
use common::synthetic::{document_image, three_documents, FRAME_H, FRAME_W};
use doc_locator::diagnostics::render_overlay;
use doc_locator::features::{HarrisParams, HarrisPatchExtractor};
use doc_locator::image::io::{load_image, save_gray_png};
use doc_locator::index::{IndexOptions, MemorySource};
use doc_locator::verify::{project_corners, Quad};
use doc_locator::{DocumentLocator, Localization, LocatorParams, QueryOutcome, ReferenceIndex};

#[test]
fn warped_frame_is_identified_and_localized() {
    init_logging();
    let scenario = three_documents(60, 25, 11);
    let sources: Vec<MemorySource> = scenario
        .documents
        .iter()
        .map(|(id, img)| MemorySource::new(id.clone(), img.clone()))
        .collect();
    let build = ReferenceIndex::build(&sources, &scenario.extractor, &IndexOptions::default());
    assert!(build.warnings.is_empty());
    assert_eq!(build.index.len(), 3);

    let locator = DocumentLocator::new(LocatorParams::default(), scenario.extractor.clone());
    let report = locator
        .locate(&build.index, scenario.frame.as_view())
        .unwrap();

    assert_eq!(report.shortlist.len(), 3);
    let doc2_score = report
        .scores
        .iter()
        .find(|s| s.id == "doc2.png")
        .map(|s| s.score)
        .unwrap();
    assert!(doc2_score >= 50, "doc2 score {doc2_score}");
    for other in report.scores.iter().filter(|s| s.id != "doc2.png") {
        assert!(other.score < 10, "{} scored {}", other.id, other.score);
    }

    let QueryOutcome::Identified {
        id,
        score,
        localization,
    } = &report.outcome
    else {
        panic!("expected an identification, got {:?}", report.outcome);
    };
    assert_eq!(id, "doc2.png");
    assert_eq!(*score, doc2_score);

    let Localization::Located { transform, quad } = localization else {
        panic!("expected a localization, got {localization:?}");
    };
    assert!(transform.inliers.len() >= 50);
    let expected = project_corners(&scenario.frame_to_doc, FRAME_W, FRAME_H).unwrap();
    let err = quad.max_corner_distance(&expected);
    assert!(err < 1.0, "quad {quad:?} vs {expected:?} (max error {err:.3}px)");

    for stage in ["hash", "extract", "rank", "match", "verify"] {
        assert!(report.timing.stage_ms(stage).is_some(), "missing {stage}");
    }
}

#[test]
fn harris_features_locate_a_cropped_scan() {
    init_logging();
    let docs = [
        ("doc1.png", document_image(400, 300, 30, 101)),
        ("doc2.png", document_image(420, 320, 30, 102)),
        ("doc3.png", document_image(380, 300, 30, 103)),
    ];
    let sources: Vec<MemorySource> = docs
        .iter()
        .map(|(id, img)| MemorySource::new(*id, img.clone()))
        .collect();
    let extractor = HarrisPatchExtractor::new(HarrisParams::default());
    let build = ReferenceIndex::build(&sources, &extractor, &IndexOptions::default());

    let (x0, y0) = (40usize, 30usize);
    let frame = docs[1].1.crop(x0, y0, FRAME_W, FRAME_H);
    let locator = DocumentLocator::new(LocatorParams::default(), extractor);
    let report = locator.locate(&build.index, frame.as_view()).unwrap();

    assert_eq!(report.outcome.identified_id(), Some("doc2.png"));
    let quad = report.outcome.quad().expect("crop should be localized");
    let (x1, y1) = ((x0 + FRAME_W) as f64, (y0 + FRAME_H) as f64);
    let expected = Quad([
        [x0 as f64, y0 as f64],
        [x1, y0 as f64],
        [x1, y1],
        [x0 as f64, y1],
    ]);
    assert!(
        quad.max_corner_distance(&expected) < 1.0,
        "quad {quad:?} vs {expected:?}"
    );
}

#[test]
fn report_serializes_to_json() {
    let scenario = three_documents(40, 0, 5);
    let sources: Vec<MemorySource> = scenario
        .documents
        .iter()
        .map(|(id, img)| MemorySource::new(id.clone(), img.clone()))
        .collect();
    let build = ReferenceIndex::build(&sources, &scenario.extractor, &IndexOptions::default());
    let locator = DocumentLocator::new(LocatorParams::default(), scenario.extractor.clone());
    let report = locator
        .locate(&build.index, scenario.frame.as_view())
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"]["status"], "identified");
    assert_eq!(json["outcome"]["id"], "doc2.png");
    assert_eq!(json["outcome"]["localization"]["status"], "located");
    assert_eq!(
        json["frameFingerprint"].as_str().map(str::len),
        Some(16),
        "{json}"
    );
    assert_eq!(json["shortlist"].as_array().map(Vec::len), Some(3));
}

#[test]
fn overlay_outlines_the_localized_region_on_the_retained_document() {
    init_logging();
    let scenario = three_documents(40, 0, 14);
    let sources: Vec<MemorySource> = scenario
        .documents
        .iter()
        .map(|(id, img)| MemorySource::new(id.clone(), img.clone()))
        .collect();
    let options = IndexOptions {
        retain_images: true,
    };
    let build = ReferenceIndex::build(&sources, &scenario.extractor, &options);
    let locator = DocumentLocator::new(LocatorParams::default(), scenario.extractor.clone());
    let report = locator
        .locate(&build.index, scenario.frame.as_view())
        .unwrap();

    let id = report.outcome.identified_id().unwrap();
    let quad = report.outcome.quad().unwrap();
    let document = build.index.get(id).unwrap().image.as_ref().unwrap();
    let overlay = render_overlay(document, quad);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlay").join("doc2.png");
    save_gray_png(&overlay, &path).unwrap();
    let reloaded = load_image(&path).unwrap();
    assert_eq!(reloaded.data(), overlay.data());

    for &[x, y] in &quad.0 {
        let (x, y) = (x.round() as usize, y.round() as usize);
        assert_eq!(reloaded.get(x, y), 0, "corner ({x}, {y})");
    }
    let [a, b, ..] = quad.0;
    let mid = [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0];
    assert_eq!(reloaded.get(mid[0].round() as usize, mid[1].round() as usize), 0);
    let changed = overlay
        .data()
        .iter()
        .zip(document.data())
        .filter(|(o, d)| o != d)
        .count();
    assert!(changed > 0 && changed < document.data().len() / 10);
}

use doc_locator::config::locate::{self, LocateToolConfig, OutputFormat};
use doc_locator::diagnostics::render_overlay;
use doc_locator::features::HarrisPatchExtractor;
use doc_locator::frames::{middle_frame, open_frames};
use doc_locator::image::io::{list_images, load_image, save_gray_png, write_json_file};
use doc_locator::index::{IndexOptions, PathSource};
use doc_locator::{DocumentLocator, QueryOutcome, QueryReport, ReferenceIndex};
use std::env;
use std::path::Path;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let config_path = args.next().ok_or_else(usage)?;
    let index_only = match args.next().as_deref() {
        None => false,
        Some("--index-only") => true,
        Some(other) => return Err(format!("Unknown argument {other}\n{}", usage())),
    };
    let config = locate::load_config(Path::new(&config_path)).map_err(|e| e.to_string())?;

    let locator = DocumentLocator::new(
        config.locator.clone(),
        HarrisPatchExtractor::new(config.extractor.clone()),
    );

    if index_only {
        let index = build_index(&config, locator.extractor())?;
        let path = config
            .index_json
            .as_ref()
            .ok_or("--index-only requires index_json in the config")?;
        index.save_json(path).map_err(|e| e.to_string())?;
        println!("Indexed {} documents into {}", index.len(), path.display());
        return Ok(());
    }

    let index = match &config.index_json {
        Some(path) if path.is_file() => {
            let index = ReferenceIndex::load_json(path).map_err(|e| e.to_string())?;
            println!("Loaded {} documents from {}", index.len(), path.display());
            index
        }
        _ => build_index(&config, locator.extractor())?,
    };

    let frames = open_frames(&config.query).map_err(|e| e.to_string())?;
    let frame = middle_frame(&*frames).map_err(|e| e.to_string())?;
    let report = locator
        .locate(&index, frame.as_view())
        .map_err(|e| e.to_string())?;

    if config.output.format.includes_text() {
        print_text_summary(&report);
    }

    if config.output.format.includes_json() {
        if let Some(path) = &config.output.json_out {
            write_json_file(path, &report)?;
            println!("JSON report written to {}", path.display());
        } else {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
            if config.output.format == OutputFormat::Both {
                println!("\nJSON report:\n{json}");
            } else {
                println!("{json}");
            }
        }
    }

    if let Some(path) = &config.output.overlay_png {
        write_overlay(&config, &index, &report, path)?;
    }

    Ok(())
}

/// Outline the localized region on the matched document. Pixels come from
/// the index when it kept them, otherwise from `images_dir`.
fn write_overlay(
    config: &LocateToolConfig,
    index: &ReferenceIndex,
    report: &QueryReport,
    path: &Path,
) -> Result<(), String> {
    let QueryOutcome::Identified { id, .. } = &report.outcome else {
        println!("No overlay: no document identified");
        return Ok(());
    };
    let Some(quad) = report.outcome.quad() else {
        println!("No overlay: {id} identified but not localized");
        return Ok(());
    };
    let document = match index.get(id).and_then(|entry| entry.image.clone()) {
        Some(image) => image,
        None => load_image(&config.images_dir.join(id)).map_err(|e| e.to_string())?,
    };
    let overlay = render_overlay(&document, quad);
    save_gray_png(&overlay, path)?;
    println!("Overlay written to {}", path.display());
    Ok(())
}

fn build_index(
    config: &LocateToolConfig,
    extractor: &HarrisPatchExtractor,
) -> Result<ReferenceIndex, String> {
    let paths = list_images(&config.images_dir)
        .map_err(|e| format!("Failed to list {}: {e}", config.images_dir.display()))?;
    let sources: Vec<PathSource> = paths.into_iter().map(PathSource::new).collect();
    let options = IndexOptions {
        retain_images: config.output.overlay_png.is_some(),
    };
    let build = ReferenceIndex::build(&sources, extractor, &options);
    for warning in &build.warnings {
        eprintln!("Warning: {warning}");
    }
    println!(
        "Indexed {} of {} images in {:.1} ms",
        build.index.len(),
        sources.len(),
        build.elapsed_ms
    );
    Ok(build.index)
}

fn print_text_summary(report: &QueryReport) {
    println!("Query summary");
    for line in report.summary_lines() {
        println!("  {line}");
    }
    println!("  shortlist:");
    for (candidate, score) in report.shortlist.iter().zip(&report.scores) {
        println!(
            "    {:<32} distance={:<20} score={}",
            candidate.id, candidate.distance, score.score
        );
    }
}

fn usage() -> String {
    "Usage: doc_locate <config.json> [--index-only]".to_string()
}

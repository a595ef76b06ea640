//! Renders a finished challenge ledger into a PNG: one tile per level with its
//! pose thumbnail and a score bar, plus an overall bar along the bottom.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use image::{imageops, imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::hold::{LevelLedger, LevelOutcome};
use crate::scoring::{score_to_grade, Grade};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

const TILE: u32 = 128;
const GAP: u32 = 16;
const MARGIN: u32 = 16;
const BAR_HEIGHT: u32 = 16;
const SUMMARY_HEIGHT: u32 = 24;

const BACKGROUND: Rgba<u8> = Rgba([250, 250, 247, 255]);
const TRACK: Rgba<u8> = Rgba([220, 220, 220, 255]);
const PLACEHOLDER: Rgba<u8> = Rgba([200, 200, 205, 255]);
const PLACEHOLDER_MARK: Rgba<u8> = Rgba([150, 150, 160, 255]);
const SKIP_HATCH: Rgba<u8> = Rgba([170, 170, 170, 255]);

/// Where pose thumbnails come from. Any error is treated as "no image".
pub trait ThumbnailSource {
    fn fetch(&self, key: &str) -> Result<DynamicImage>;
}

/// Thumbnails stored as image files under one directory.
pub struct FsThumbnails {
    root: PathBuf,
}

impl FsThumbnails {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ThumbnailSource for FsThumbnails {
    fn fetch(&self, key: &str) -> Result<DynamicImage> {
        let path = self.root.join(key);
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read thumbnail {}", path.display()))?;
        image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode thumbnail {}", path.display()))
    }
}

pub fn grade_color(grade: Grade) -> Rgba<u8> {
    match grade {
        Grade::NeedsFocus => Rgba([214, 69, 65, 255]),
        Grade::Improving => Rgba([235, 149, 50, 255]),
        Grade::Healthy => Rgba([230, 200, 60, 255]),
        Grade::Great => Rgba([92, 184, 92, 255]),
        Grade::Superb => Rgba([52, 120, 220, 255]),
    }
}

pub fn render_report(ledger: &LevelLedger, thumbnails: &dyn ThumbnailSource) -> RgbaImage {
    let columns = ledger.len().max(1) as u32;
    let width = MARGIN * 2 + columns * TILE + (columns - 1) * GAP;
    let height = MARGIN * 2 + TILE + GAP + BAR_HEIGHT + GAP + SUMMARY_HEIGHT;
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

    for (index, level) in ledger.levels.iter().enumerate() {
        let x = MARGIN + index as u32 * (TILE + GAP);

        let tile = level
            .thumbnail
            .as_deref()
            .and_then(|key| match thumbnails.fetch(key) {
                Ok(image) => Some(imageops::resize(&image.to_rgba8(), TILE, TILE, FilterType::Triangle)),
                Err(err) => {
                    log_warn!("thumbnail for level {} unavailable: {err:#}", index);
                    None
                }
            })
            .unwrap_or_else(placeholder_tile);
        imageops::overlay(&mut canvas, &tile, x as i64, MARGIN as i64);

        let bar_y = MARGIN + TILE + GAP;
        fill_rect(&mut canvas, x, bar_y, TILE, BAR_HEIGHT, TRACK);
        match &level.outcome {
            LevelOutcome::Skipped => hatch_rect(&mut canvas, x, bar_y, TILE, BAR_HEIGHT, SKIP_HATCH),
            LevelOutcome::Scored { result } => {
                let filled = TILE * result.overall.min(100) / 100;
                fill_rect(&mut canvas, x, bar_y, filled, BAR_HEIGHT, grade_color(result.grade));
            }
        }
    }

    let average = ledger.average();
    let summary_y = MARGIN + TILE + GAP + BAR_HEIGHT + GAP;
    let track_width = width - MARGIN * 2;
    fill_rect(&mut canvas, MARGIN, summary_y, track_width, SUMMARY_HEIGHT, TRACK);
    fill_rect(
        &mut canvas,
        MARGIN,
        summary_y,
        track_width * average.min(100) / 100,
        SUMMARY_HEIGHT,
        grade_color(score_to_grade(average)),
    );

    canvas
}

pub fn write_report(
    ledger: &LevelLedger,
    thumbnails: &dyn ThumbnailSource,
    path: &Path,
) -> Result<()> {
    render_report(ledger, thumbnails)
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn placeholder_tile() -> RgbaImage {
    let mut tile = RgbaImage::from_pixel(TILE, TILE, PLACEHOLDER);
    for i in 0..TILE {
        tile.put_pixel(i, i, PLACEHOLDER_MARK);
        tile.put_pixel(TILE - 1 - i, i, PLACEHOLDER_MARK);
    }
    tile
}

fn fill_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for py in y..(y + h).min(canvas.height()) {
        for px in x..(x + w).min(canvas.width()) {
            canvas.put_pixel(px, py, color);
        }
    }
}

fn hatch_rect(canvas: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for py in y..(y + h).min(canvas.height()) {
        for px in x..(x + w).min(canvas.width()) {
            if (px + py) % 6 < 2 {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hold::LevelRecord;
    use crate::scoring::SessionResult;
    use anyhow::anyhow;

    struct MemoryThumbnails;

    impl ThumbnailSource for MemoryThumbnails {
        fn fetch(&self, key: &str) -> Result<DynamicImage> {
            match key {
                "red.png" => Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    32,
                    32,
                    Rgba([255, 0, 0, 255]),
                ))),
                _ => Err(anyhow!("no thumbnail named {key}")),
            }
        }
    }

    fn level(thumbnail: Option<&str>, outcome: LevelOutcome) -> LevelRecord {
        LevelRecord {
            pose_id: "p".into(),
            pose_name: "P".into(),
            thumbnail: thumbnail.map(str::to_string),
            outcome,
        }
    }

    fn scored(overall: u32) -> LevelOutcome {
        LevelOutcome::Scored {
            result: SessionResult {
                accuracy: overall,
                stability: 1.0,
                symmetry: 100,
                grade: score_to_grade(overall),
                feedback: Vec::new(),
                overall,
            },
        }
    }

    fn ledger() -> LevelLedger {
        let mut ledger = LevelLedger::new();
        ledger.record(level(Some("red.png"), scored(80)));
        ledger.record(level(Some("missing.png"), LevelOutcome::Skipped));
        ledger.record(level(None, scored(50)));
        ledger
    }

    #[test]
    fn missing_thumbnails_become_placeholders() {
        let image = render_report(&ledger(), &MemoryThumbnails);

        assert_eq!(image.width(), MARGIN * 2 + 3 * TILE + 2 * GAP);
        // fetched thumbnail is drawn
        let Rgba([r, g, _, _]) = *image.get_pixel(MARGIN + 5, MARGIN + 10);
        assert!(r > 200 && g < 50);
        // failed fetch and no thumbnail both fall back to the placeholder
        let second = MARGIN + TILE + GAP;
        assert_eq!(*image.get_pixel(second + 5, MARGIN + 10), PLACEHOLDER);
        assert_eq!(*image.get_pixel(second + 5, MARGIN + 5), PLACEHOLDER_MARK);
        let third = MARGIN + 2 * (TILE + GAP);
        assert_eq!(*image.get_pixel(third + 5, MARGIN + 10), PLACEHOLDER);
    }

    #[test]
    fn score_bars_follow_grade_and_skip() {
        let image = render_report(&ledger(), &MemoryThumbnails);
        let bar_y = MARGIN + TILE + GAP + 1;

        // 80 -> Great, filled up to 80% of the tile
        assert_eq!(*image.get_pixel(MARGIN + 1, bar_y), grade_color(Grade::Great));
        assert_eq!(*image.get_pixel(MARGIN + TILE - 1, bar_y), TRACK);

        // skipped level is hatched, never filled with a grade colour
        let second = MARGIN + TILE + GAP;
        let row: Vec<Rgba<u8>> = (second..second + TILE).map(|x| *image.get_pixel(x, bar_y)).collect();
        assert!(row.contains(&SKIP_HATCH));
        assert!(!row.contains(&grade_color(Grade::NeedsFocus)));
    }

    #[test]
    fn empty_ledger_still_renders() {
        let image = render_report(&LevelLedger::new(), &MemoryThumbnails);
        assert_eq!(image.width(), MARGIN * 2 + TILE);
    }

    #[test]
    fn writes_png_to_disk() {
        let path = std::env::temp_dir().join(format!("posehold-report-{}.png", uuid::Uuid::new_v4()));
        write_report(&ledger(), &FsThumbnails::new(std::env::temp_dir()), &path).unwrap();

        let reopened = image::open(&path).unwrap();
        assert_eq!(reopened.height(), MARGIN * 2 + TILE + GAP + BAR_HEIGHT + GAP + SUMMARY_HEIGHT);
        let _ = fs::remove_file(path);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet pipeline — resize, decode the marker, correct skew, binarize, find
// and classify content regions, then crop and rectify each one.
//
// Every stage allocates fresh buffers, so a pipeline can be shared across
// threads and one sheet's failure never touches another.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use markwerk_core::config::PipelineConfig;
use markwerk_core::error::Result;
use markwerk_core::{MarkerDetection, RegionRole, SheetIssue, SkewStatus};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::correct::{PerspectiveRectifier, RectifiedRegion, RectifyOutcome, SkewCorrector};
use crate::detect::{EdgeContourExtractor, RegionCandidate, RegionClassifier};
use crate::fill::FillRatioSensor;
use crate::marker::MarkerDecoder;
use crate::raster::{SheetImage, crop};

/// One accepted content region.
#[derive(Debug, Clone, Serialize)]
pub struct SheetRegion {
    pub role: RegionRole,
    pub candidate: RegionCandidate,
    /// Bounding-box crop of the binary sheet.
    #[serde(skip)]
    pub crop: Option<GrayImage>,
    /// Upright version of the region.
    #[serde(skip)]
    pub rectified: Option<RectifiedRegion>,
}

/// Everything recovered from one sheet.
#[derive(Debug, Clone, Serialize)]
pub struct SheetReport {
    /// Marker payload; empty for an unmarked sheet.
    pub identifier: String,
    pub skew: SkewStatus,
    /// Marker width in pixels, before the region scale is applied.
    pub reference_width: u32,
    /// Accepted regions in discovery order.
    pub regions: Vec<SheetRegion>,
    pub issues: Vec<SheetIssue>,
    /// The skew-corrected, binarized sheet the regions were read from.
    #[serde(skip)]
    pub binary: GrayImage,
}

impl SheetReport {
    /// True when the sheet produced the expected regions with no issues.
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn region(&self, role: RegionRole) -> Option<&SheetRegion> {
        self.regions.iter().find(|r| r.role == role)
    }
}

/// The configured chain of stages.
#[derive(Debug, Clone)]
pub struct SheetPipeline {
    config: PipelineConfig,
    skew: SkewCorrector,
    extractor: EdgeContourExtractor,
    classifier: RegionClassifier,
    rectifier: PerspectiveRectifier,
    sensor: FillRatioSensor,
}

impl SheetPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            skew: SkewCorrector::new(config.skew),
            extractor: EdgeContourExtractor::new(config.edges)?,
            classifier: RegionClassifier::new(config.classifier),
            rectifier: PerspectiveRectifier::new(config.rectifier),
            sensor: FillRatioSensor::new(config.fill),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fill sensor configured for this pipeline, for reading bubbles out of
    /// [`SheetReport::binary`] or a rectified region.
    pub fn fill_sensor(&self) -> &FillRatioSensor {
        &self.sensor
    }

    /// Load a sheet from disk and process it. Only a failed load is an error.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn process_path(
        &self,
        path: impl AsRef<Path>,
        decoder: &dyn MarkerDecoder,
    ) -> Result<SheetReport> {
        let sheet = SheetImage::open(path)?;
        Ok(self.process(sheet.as_dynamic(), decoder))
    }

    /// Run every stage on an in-memory sheet.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: &DynamicImage, decoder: &dyn MarkerDecoder) -> SheetReport {
        let mut issues = Vec::new();

        let mut sheet = SheetImage::from_dynamic(image.clone());
        if let Some(width) = self.config.working_width {
            sheet = sheet.resize_to_width(width);
        }

        let marker: MarkerDetection = decoder.decode(sheet.as_dynamic());
        if !marker.is_decoded() {
            warn!("Marker not found; continuing without skew correction");
            issues.push(SheetIssue::MarkerNotFound);
        }
        let reference_width = marker.reference_width();

        let corrected = self.skew.correct(sheet.as_dynamic(), &marker);
        let binary =
            SheetImage::from_dynamic(corrected.image).binarize(self.config.binary_threshold);

        let contours = self.extractor.extract(&binary);
        let scaled_width = f64::from(reference_width) * self.config.region_scale;
        let classification = self.classifier.classify(contours, scaled_width);

        let expected = self.classifier.config().expected_regions;
        let found = classification.accepted_count();
        let build_outputs = found == expected;
        if !build_outputs {
            warn!(expected, found, "Unexpected region count; regions left uncropped");
            issues.push(SheetIssue::RegionCountMismatch { expected, found });
        }

        let regions: Vec<SheetRegion> = classification
            .accepted
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let role = RegionRole::for_index(index);
                if !build_outputs {
                    return SheetRegion {
                        role,
                        candidate,
                        crop: None,
                        rectified: None,
                    };
                }

                let cropped = crop(&binary, candidate.bounding);
                let rectified = if self.config.rectify_regions {
                    let outcome = self.rectifier.rectify_contour(&binary, &candidate.contour);
                    rectified_or_issue(index, outcome, &mut issues)
                } else {
                    None
                };

                SheetRegion {
                    role,
                    candidate,
                    crop: Some(cropped),
                    rectified,
                }
            })
            .collect();

        info!(
            identifier = %marker.payload,
            regions = regions.len(),
            issues = issues.len(),
            "Sheet processed"
        );

        SheetReport {
            identifier: marker.payload,
            skew: corrected.status,
            reference_width,
            regions,
            issues,
            binary,
        }
    }
}

/// The rectified region, or `None` with the matching issue recorded against
/// region `index`.
fn rectified_or_issue(
    index: usize,
    outcome: RectifyOutcome,
    issues: &mut Vec<SheetIssue>,
) -> Option<RectifiedRegion> {
    match outcome {
        RectifyOutcome::Rectified(region) => Some(region),
        RectifyOutcome::Degenerate { vertices } => {
            issues.push(SheetIssue::DegenerateApproximation {
                region: index,
                vertices,
            });
            None
        }
        RectifyOutcome::Singular => {
            issues.push(SheetIssue::SingularTransform { region: index });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{FixedMarker, NoMarker};
    use image::Luma;
    use markwerk_core::PointF;

    const BLOCK_W: u32 = 220;
    const BLOCK_H: u32 = 90;
    const FOUR_BLOCKS: [(u32, u32); 4] = [(100, 100), (500, 100), (100, 400), (500, 400)];

    /// White sheet with dark content blocks at the given top-left corners.
    fn synthetic_sheet(width: u32, height: u32, blocks: &[(u32, u32)]) -> DynamicImage {
        let mut gray = GrayImage::from_pixel(width, height, Luma([255]));
        for &(x0, y0) in blocks {
            for y in y0..y0 + BLOCK_H {
                for x in x0..x0 + BLOCK_W {
                    gray.put_pixel(x, y, Luma([0]));
                }
            }
        }
        DynamicImage::ImageLuma8(gray)
    }

    fn abc123() -> FixedMarker {
        FixedMarker(MarkerDetection::new(
            "ABC123",
            Some([
                PointF::new(100.0, 50.0),
                PointF::new(300.0, 50.0),
                PointF::new(300.0, 250.0),
                PointF::new(100.0, 250.0),
            ]),
        ))
    }

    fn small_pipeline() -> SheetPipeline {
        SheetPipeline::new(PipelineConfig {
            working_width: None,
            ..PipelineConfig::default()
        })
        .unwrap()
    }

    // -- End to end -----------------------------------------------------------

    /// A full-width sheet with four well-formed blocks and an upright marker.
    #[test]
    fn full_sheet_yields_identifier_and_four_regions() {
        let image = synthetic_sheet(
            2684,
            1400,
            &[(300, 400), (900, 400), (300, 800), (900, 800)],
        );
        let pipeline = SheetPipeline::new(PipelineConfig::default()).unwrap();
        let report = pipeline.process(&image, &abc123());

        assert_eq!(report.identifier, "ABC123");
        assert_eq!(report.reference_width, 200);
        assert_eq!(report.skew, SkewStatus::Corrected { angle_degrees: 0.0 });
        assert!(report.is_complete(), "issues: {:?}", report.issues);
        assert_eq!(report.regions.len(), 4);

        let roles: Vec<_> = report.regions.iter().map(|r| r.role).collect();
        assert_eq!(
            roles,
            vec![
                RegionRole::Questions,
                RegionRole::Subject,
                RegionRole::Grade,
                RegionRole::Auxiliary
            ]
        );

        let questions = report.region(RegionRole::Questions).unwrap();
        assert!((questions.candidate.bounding.x - 300).abs() <= 3);
        assert!((questions.candidate.bounding.y - 400).abs() <= 3);

        for region in &report.regions {
            let crop = region.crop.as_ref().unwrap();
            assert_eq!(
                crop.dimensions(),
                (region.candidate.bounding.width, region.candidate.bounding.height)
            );
            let rectified = region.rectified.as_ref().unwrap();
            assert!((215..=230).contains(&rectified.width), "width {}", rectified.width);
            assert!((85..=100).contains(&rectified.height), "height {}", rectified.height);
        }
    }

    #[test]
    fn unmarked_sheet_reports_marker_and_count_issues() {
        let image = synthetic_sheet(1200, 800, &FOUR_BLOCKS);
        let report = small_pipeline().process(&image, &NoMarker);

        assert_eq!(report.identifier, "");
        assert_eq!(report.skew, SkewStatus::Skipped);
        assert_eq!(report.reference_width, 0);
        assert_eq!(report.issues[0], SheetIssue::MarkerNotFound);
        assert!(matches!(
            report.issues[1],
            SheetIssue::RegionCountMismatch { expected: 4, found: 0 }
        ));
        assert!(report.regions.is_empty());
    }

    #[test]
    fn wrong_region_count_skips_crops() {
        let image = synthetic_sheet(1200, 800, &[(100, 100), (500, 100), (100, 400)]);
        let report = small_pipeline().process(&image, &abc123());

        assert_eq!(
            report.issues,
            vec![SheetIssue::RegionCountMismatch { expected: 4, found: 3 }]
        );
        assert_eq!(report.regions.len(), 3);
        assert!(report.regions.iter().all(|r| r.crop.is_none() && r.rectified.is_none()));
    }

    /// One block with its top-right corner cut off approximates to a
    /// pentagon: it is still cropped, but left unrectified with an issue.
    #[test]
    fn clipped_corner_is_reported_and_left_unrectified() {
        let mut gray = synthetic_sheet(1200, 800, &FOUR_BLOCKS).into_luma8();
        let (x0, y0) = FOUR_BLOCKS[0];
        for y in y0..y0 + BLOCK_H {
            for x in x0..x0 + BLOCK_W {
                if (x - x0) > (y - y0) + 180 {
                    gray.put_pixel(x, y, Luma([255]));
                }
            }
        }
        let report = small_pipeline().process(&DynamicImage::ImageLuma8(gray), &abc123());

        assert_eq!(report.regions.len(), 4);
        let clipped = report
            .regions
            .iter()
            .position(|r| {
                let bounding = &r.candidate.bounding;
                (bounding.x - 100).abs() <= 3 && (bounding.y - 100).abs() <= 3
            })
            .unwrap();
        assert_eq!(
            report.issues,
            vec![SheetIssue::DegenerateApproximation {
                region: clipped,
                vertices: 5
            }]
        );

        for (index, region) in report.regions.iter().enumerate() {
            assert!(region.crop.is_some());
            assert_eq!(region.rectified.is_none(), index == clipped, "region {index}");
        }
    }

    #[test]
    fn singular_outcome_becomes_an_issue() {
        let mut issues = Vec::new();
        assert!(rectified_or_issue(2, RectifyOutcome::Singular, &mut issues).is_none());
        let degenerate = RectifyOutcome::Degenerate { vertices: 3 };
        assert!(rectified_or_issue(3, degenerate, &mut issues).is_none());

        assert_eq!(
            issues,
            vec![
                SheetIssue::SingularTransform { region: 2 },
                SheetIssue::DegenerateApproximation {
                    region: 3,
                    vertices: 3
                },
            ]
        );
    }

    #[test]
    fn rectification_can_be_disabled() {
        let image = synthetic_sheet(1200, 800, &FOUR_BLOCKS);
        let pipeline = SheetPipeline::new(PipelineConfig {
            working_width: None,
            rectify_regions: false,
            ..PipelineConfig::default()
        })
        .unwrap();
        let report = pipeline.process(&image, &abc123());

        assert!(report.is_complete(), "issues: {:?}", report.issues);
        assert!(report.regions.iter().all(|r| r.crop.is_some() && r.rectified.is_none()));
    }

    #[test]
    fn filled_blocks_read_as_filled() {
        let image = synthetic_sheet(1200, 800, &FOUR_BLOCKS);
        let pipeline = small_pipeline();
        let report = pipeline.process(&image, &abc123());

        let block = markwerk_core::Rect::new(110, 110, 100, 50);
        let reading = pipeline.fill_sensor().read(&report.binary, block).unwrap();
        assert_eq!(reading.rate, 1.0);
        assert!(reading.filled);
    }

    #[test]
    fn report_serializes_without_buffers() {
        let image = synthetic_sheet(1200, 800, &[(100, 100), (500, 100), (100, 400)]);
        let report = small_pipeline().process(&image, &abc123());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["identifier"], "ABC123");
        assert_eq!(json["regions"].as_array().unwrap().len(), 3);
        assert!(json.get("binary").is_none());
        assert!(json["regions"][0].get("crop").is_none());
    }

    // -- Construction and loading ---------------------------------------------

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.edges.aperture_size = 7;
        assert!(SheetPipeline::new(config).is_err());
    }

    #[test]
    fn process_path_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.png");
        synthetic_sheet(600, 400, &[(50, 50)]).save(&path).unwrap();

        let report = small_pipeline().process_path(&path, &NoMarker).unwrap();
        assert_eq!(report.binary.dimensions(), (600, 400));
        assert_eq!(report.issues[0], SheetIssue::MarkerNotFound);
    }

    #[test]
    fn process_path_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.png");
        let err = small_pipeline().process_path(&missing, &NoMarker).unwrap_err();
        assert!(matches!(err, markwerk_core::MarkwerkError::InputUnavailable(_)));
    }
}

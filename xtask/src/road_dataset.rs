use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use thiserror::Error;

use burn::data::dataset::transform::{Mapper, MapperDataset};
use burn::data::dataset::vision::PixelDepth;
use burn::data::dataset::{Dataset, InMemDataset};

use burn_fcn::{SegmentationImageItem, SegmentationImageItemRaw};

pub const SUPPORTED_FILES: [&str; 4] = ["bmp", "jpg", "jpeg", "png"];

/// Ground-truth color of non-road pixels in the KITTI road annotations.
const BACKGROUND_COLOR: [u8; 3] = [255, 0, 0];

/// Maps a ground-truth pixel to its class index: pure red is background,
/// any other color marks road.
pub fn road_class(rgb: [u8; 3]) -> usize {
    if rgb == BACKGROUND_COLOR { 0 } else { 1 }
}

/// Derives the ground-truth file stem for an image stem, e.g.
/// `um_000042` -> `um_road_000042`.
pub fn groundtruth_stem(image_stem: &str) -> Option<String> {
    let (prefix, id) = image_stem.split_once('_')?;
    Some(format!("{prefix}_road_{id}"))
}

struct PathToRoadItem {
    image_size: [usize; 2],
}

impl Mapper<SegmentationImageItemRaw, SegmentationImageItem> for PathToRoadItem {
    fn map(&self, item: &SegmentationImageItemRaw) -> SegmentationImageItem {
        let [height, width] = self.image_size;

        let image = image::open(&item.image_path)
            .unwrap()
            .resize_exact(width as u32, height as u32, FilterType::Triangle)
            .into_rgb8();
        let image = image.iter().map(|&x| PixelDepth::U8(x)).collect();

        // Nearest-neighbor keeps the annotation colors exact.
        let groundtruth = image::open(&item.mask_path)
            .unwrap()
            .resize_exact(width as u32, height as u32, FilterType::Nearest)
            .into_rgb8();
        let mask = groundtruth.pixels().map(|p| road_class(p.0)).collect();

        SegmentationImageItem { image, mask }
    }
}

#[derive(Error, Debug)]
pub enum RoadDatasetError {
    #[error("I/O error: `{0}`")]
    IOError(String),

    #[error("Invalid file extension: `{0}`")]
    InvalidFileExtensionError(String),
}

type RoadDatasetMapper =
    MapperDataset<InMemDataset<SegmentationImageItemRaw>, PathToRoadItem, SegmentationImageItemRaw>;

/// KITTI road training data: `image_2/` camera frames paired with
/// `gt_image_2/` color-coded annotations.
pub struct RoadDataset {
    dataset: RoadDatasetMapper,
}

impl Dataset<SegmentationImageItem> for RoadDataset {
    fn get(&self, index: usize) -> Option<SegmentationImageItem> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl RoadDataset {
    /// Loads every image/ground-truth pair under `root`.
    pub fn new_from_folders<P: AsRef<Path>>(
        root: P,
        image_size: [usize; 2],
    ) -> Result<Self, RoadDatasetError> {
        let pairs = Self::collect_pairs(root.as_ref())?;
        Self::with_items(pairs, image_size)
    }

    /// Creates a dataset from explicit image/ground-truth path pairs.
    pub fn new_with_pairs<P: AsRef<Path>>(
        pairs: Vec<(P, P)>,
        image_size: [usize; 2],
    ) -> Result<Self, RoadDatasetError> {
        let items = pairs
            .into_iter()
            .map(|(image_path, mask_path)| {
                let image_path = image_path.as_ref().to_path_buf();
                let mask_path = mask_path.as_ref().to_path_buf();

                Self::check_extension(
                    &image_path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .unwrap_or(""),
                )?;

                Ok(SegmentationImageItemRaw {
                    image_path,
                    mask_path,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::with_items(items, image_size)
    }

    /// Loads the pairs under `root` and splits them into training and
    /// validation datasets. The pair list is sorted by path, so the split
    /// is deterministic across runs.
    pub fn split<P: AsRef<Path>>(
        root: P,
        image_size: [usize; 2],
        train_ratio: f64,
    ) -> Result<(Self, Self), RoadDatasetError> {
        let pairs = Self::collect_pairs(root.as_ref())?;

        if pairs.len() < 2 {
            return Err(RoadDatasetError::IOError(
                "Need at least two samples to split into train and validation".to_string(),
            ));
        }

        let split_at = ((pairs.len() as f64 * train_ratio) as usize).clamp(1, pairs.len() - 1);
        let (train, valid) = pairs.split_at(split_at);

        Ok((
            Self::with_items(train.to_vec(), image_size)?,
            Self::with_items(valid.to_vec(), image_size)?,
        ))
    }

    fn collect_pairs(root: &Path) -> Result<Vec<SegmentationImageItemRaw>, RoadDatasetError> {
        let images_dir = root.join("image_2");
        let groundtruth_dir = root.join("gt_image_2");

        if !images_dir.is_dir() {
            return Err(RoadDatasetError::IOError(format!(
                "Images directory does not exist: {:?}",
                images_dir
            )));
        }

        if !groundtruth_dir.is_dir() {
            return Err(RoadDatasetError::IOError(format!(
                "Groundtruth directory does not exist: {:?}",
                groundtruth_dir
            )));
        }

        let mut pairs = Vec::new();

        let entries = std::fs::read_dir(&images_dir)
            .map_err(|e| RoadDatasetError::IOError(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| RoadDatasetError::IOError(e.to_string()))?;
            let path = entry.path();

            if !path.is_file()
                || !path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        SUPPORTED_FILES
                            .iter()
                            .any(|&valid_ext| valid_ext.eq_ignore_ascii_case(ext))
                    })
            {
                continue;
            }

            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            let Some(gt_stem) = groundtruth_stem(&stem) else {
                continue;
            };

            let gt_path = SUPPORTED_FILES.iter().find_map(|ext| {
                let candidate = groundtruth_dir.join(format!("{gt_stem}.{ext}"));
                candidate.exists().then_some(candidate)
            });

            if let Some(gt_path) = gt_path {
                pairs.push(SegmentationImageItemRaw {
                    image_path: path,
                    mask_path: gt_path,
                });
            }
        }

        if pairs.is_empty() {
            return Err(RoadDatasetError::IOError(
                "No valid image-groundtruth pairs found".to_string(),
            ));
        }

        pairs.sort_by(|a, b| a.image_path.cmp(&b.image_path));

        Ok(pairs)
    }

    fn with_items(
        items: Vec<SegmentationImageItemRaw>,
        image_size: [usize; 2],
    ) -> Result<Self, RoadDatasetError> {
        let dataset = InMemDataset::new(items);
        let mapper = PathToRoadItem { image_size };
        let dataset = MapperDataset::new(dataset, mapper);

        Ok(Self { dataset })
    }

    fn check_extension<S: AsRef<str>>(extension: &S) -> Result<String, RoadDatasetError> {
        let extension = extension.as_ref();
        if !SUPPORTED_FILES.contains(&extension) && !extension.is_empty() {
            Err(RoadDatasetError::InvalidFileExtensionError(
                extension.to_string(),
            ))
        } else {
            Ok(extension.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_red_is_class_zero() {
        assert_eq!(road_class([255, 0, 0]), 0);
    }

    #[test]
    fn road_colors_are_class_one() {
        // Magenta marks road in the annotations; anything not pure red counts.
        assert_eq!(road_class([255, 0, 255]), 1);
        assert_eq!(road_class([0, 0, 0]), 1);
        assert_eq!(road_class([254, 0, 0]), 1);
    }

    #[test]
    fn groundtruth_stem_inserts_road_marker() {
        assert_eq!(
            groundtruth_stem("um_000042").as_deref(),
            Some("um_road_000042")
        );
        assert_eq!(
            groundtruth_stem("umm_000001").as_deref(),
            Some("umm_road_000001")
        );
        assert_eq!(groundtruth_stem("noseparator"), None);
    }
}

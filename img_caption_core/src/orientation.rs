use image::DynamicImage;

use crate::error::ClassifyError;

/// Orientation stored alongside an image, as reported by the image source.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageOrientation {
    #[default]
    Up,
    Down,
    Left,
    Right,
    UpMirrored,
    DownMirrored,
    LeftMirrored,
    RightMirrored,
}

/// Orientation tag handed to the inference engine, numbered the EXIF way.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrientationTag {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl ImageOrientation {
    pub const ALL: [Self; 8] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::UpMirrored,
        Self::DownMirrored,
        Self::LeftMirrored,
        Self::RightMirrored,
    ];

    pub const fn raw(self) -> u32 {
        match self {
            Self::Up => 0,
            Self::Down => 1,
            Self::Left => 2,
            Self::Right => 3,
            Self::UpMirrored => 4,
            Self::DownMirrored => 5,
            Self::LeftMirrored => 6,
            Self::RightMirrored => 7,
        }
    }

    /// Fixed mapping from the stored orientation to the engine's tag.
    pub const fn tag(self) -> OrientationTag {
        match self {
            Self::Up => OrientationTag::Up,
            Self::Down => OrientationTag::Down,
            Self::Left => OrientationTag::Left,
            Self::Right => OrientationTag::Right,
            Self::UpMirrored => OrientationTag::UpMirrored,
            Self::DownMirrored => OrientationTag::DownMirrored,
            Self::LeftMirrored => OrientationTag::LeftMirrored,
            Self::RightMirrored => OrientationTag::RightMirrored,
        }
    }
}

impl TryFrom<u32> for ImageOrientation {
    type Error = ClassifyError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|o| o.raw() == value)
            .ok_or(ClassifyError::InvalidOrientation(value))
    }
}

impl OrientationTag {
    /// EXIF orientation value, 1 through 8.
    pub const fn exif(self) -> u32 {
        match self {
            Self::Up => 1,
            Self::UpMirrored => 2,
            Self::Down => 3,
            Self::DownMirrored => 4,
            Self::LeftMirrored => 5,
            Self::Right => 6,
            Self::RightMirrored => 7,
            Self::Left => 8,
        }
    }

    /// Reinterprets raw pixels so they display upright.
    #[must_use]
    pub fn upright(self, img: DynamicImage) -> DynamicImage {
        match self {
            Self::Up => img,
            Self::UpMirrored => img.fliph(),
            Self::Down => img.rotate180(),
            Self::DownMirrored => img.flipv(),
            Self::LeftMirrored => img.fliph().rotate270(),
            Self::Right => img.rotate90(),
            Self::RightMirrored => img.fliph().rotate90(),
            Self::Left => img.rotate270(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_orientation_maps_to_a_distinct_tag() {
        let tags: HashSet<_> = ImageOrientation::ALL.iter().map(|o| o.tag()).collect();
        assert_eq!(tags.len(), 8);

        let exif: HashSet<_> = tags.iter().map(|t| t.exif()).collect();
        assert_eq!(exif, (1..=8).collect::<HashSet<u32>>());
    }

    #[test]
    fn mapping_table_is_stable() {
        let expected = [
            (0, 1),
            (1, 3),
            (2, 8),
            (3, 6),
            (4, 2),
            (5, 4),
            (6, 5),
            (7, 7),
        ];
        for (raw, exif) in expected {
            let orientation = ImageOrientation::try_from(raw).unwrap();
            assert_eq!(orientation.raw(), raw);
            assert_eq!(orientation.tag().exif(), exif);
        }
    }

    #[test]
    fn undefined_raw_value_is_rejected() {
        assert_eq!(
            ImageOrientation::try_from(8),
            Err(ClassifyError::InvalidOrientation(8))
        );
        assert!(ImageOrientation::try_from(u32::MAX).is_err());
    }

    #[test]
    fn right_is_turned_upright_by_a_quarter_turn() {
        let img = DynamicImage::new_rgb8(4, 2);
        let upright = OrientationTag::Right.upright(img);
        assert_eq!((upright.width(), upright.height()), (2, 4));

        let img = DynamicImage::new_rgb8(4, 2);
        let upright = OrientationTag::UpMirrored.upright(img);
        assert_eq!((upright.width(), upright.height()), (4, 2));
    }
}

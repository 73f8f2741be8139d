//! Placement of secondary images within an article's blocks

use serde::Serialize;

use super::ImageRef;

/// Highest block index the first secondary image may target
pub const FIRST_SLOT_CAP: usize = 2;
/// Highest block index the second secondary image may target
pub const SECOND_SLOT_CAP: usize = 5;

/// A secondary image placed after a given block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSlot {
    pub image: ImageRef,
    /// Index of the block this image follows
    pub target: usize,
}

/// Target indices for the two secondary images, or `None` for an empty article
///
/// `min(N/3, 2)` and `min(2N/3, 5)` with floor division. Existing articles
/// were laid out with exactly these formulas, so they must not change.
pub fn slot_targets(block_count: usize) -> Option<[usize; 2]> {
    if block_count == 0 {
        return None;
    }
    Some([
        (block_count / 3).min(FIRST_SLOT_CAP),
        (block_count * 2 / 3).min(SECOND_SLOT_CAP),
    ])
}

/// Compute the active slots for an article's secondary images
///
/// Absent images produce no slot. Output order is slot order, so when both
/// targets coincide the first image still comes first.
pub fn interleave(block_count: usize, images: &[Option<ImageRef>; 2]) -> Vec<ImageSlot> {
    let Some(targets) = slot_targets(block_count) else {
        return Vec::new();
    };

    images
        .iter()
        .zip(targets)
        .filter_map(|(image, target)| {
            image.as_ref().map(|image| ImageSlot {
                image: image.clone(),
                target,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str) -> Option<ImageRef> {
        Some(ImageRef {
            url: url.to_string(),
            alt: None,
        })
    }

    #[test]
    fn test_slot_targets() {
        assert_eq!(slot_targets(0), None);
        assert_eq!(slot_targets(1), Some([0, 0]));
        assert_eq!(slot_targets(3), Some([1, 2]));
        assert_eq!(slot_targets(9), Some([2, 5]));
        assert_eq!(slot_targets(30), Some([2, 5]));
    }

    #[test]
    fn test_interleave_nine_blocks() {
        let slots = interleave(9, &[image("a.png"), image("b.png")]);
        let targets: Vec<usize> = slots.iter().map(|s| s.target).collect();
        assert_eq!(targets, vec![2, 5]);
    }

    #[test]
    fn test_interleave_single_block_keeps_order() {
        let slots = interleave(1, &[image("first.png"), image("second.png")]);
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].target, 0);
        assert_eq!(slots[1].target, 0);
        assert_eq!(slots[0].image.url, "first.png");
        assert_eq!(slots[1].image.url, "second.png");
    }

    #[test]
    fn test_absent_images_are_omitted() {
        let slots = interleave(6, &[None, image("b.png")]);
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].target, 4);

        assert!(interleave(0, &[image("a.png"), image("b.png")]).is_empty());
    }
}

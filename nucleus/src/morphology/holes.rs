//! Component-level cleanup: hole filling, small-object removal and border
//! clearing, all expressed through the labeler.

use common::BitBuffer2;

use crate::config::Connectivity;
use crate::labeling::LabelMap;

/// Connectivity of the background complementary to a foreground connectivity.
#[inline]
fn background_connectivity(connectivity: Connectivity) -> Connectivity {
    match connectivity {
        Connectivity::Four => Connectivity::Eight,
        Connectivity::Eight => Connectivity::Four,
    }
}

/// Per-label flag: does the label reach the image frame.
fn labels_touching_border(labels: &LabelMap) -> Vec<bool> {
    let width = labels.width();
    let height = labels.height();
    let mut touches = vec![false; labels.num_labels() + 1];
    if width == 0 || height == 0 {
        return touches;
    }

    for x in 0..width {
        touches[labels.get(x, 0) as usize] = true;
        touches[labels.get(x, height - 1) as usize] = true;
    }
    for y in 0..height {
        touches[labels.get(0, y) as usize] = true;
        touches[labels.get(width - 1, y) as usize] = true;
    }
    touches[0] = false;
    touches
}

/// Fill enclosed background regions of at most `max_area` pixels.
///
/// Background regions reaching the frame are never holes. `max_area == 0`
/// disables filling.
pub fn fill_holes(mask: &BitBuffer2, max_area: usize, connectivity: Connectivity) -> BitBuffer2 {
    if max_area == 0 {
        return mask.clone();
    }

    let background = LabelMap::from_mask(&mask.inverted(), background_connectivity(connectivity));
    let areas = background.areas();
    let open = labels_touching_border(&background);

    let holes = background.select(|label| {
        let label = label as usize;
        !open[label] && areas[label] <= max_area
    });

    let mut filled = mask.clone();
    for (x, y) in holes.iter_set() {
        filled.set_xy(x, y, true);
    }
    filled
}

/// Drop foreground components with fewer than `min_area` pixels.
pub fn remove_small(mask: &BitBuffer2, min_area: usize, connectivity: Connectivity) -> BitBuffer2 {
    if min_area <= 1 {
        return mask.clone();
    }
    let labels = LabelMap::from_mask(mask, connectivity);
    let areas = labels.areas();
    labels.select(|label| areas[label as usize] >= min_area)
}

/// Drop foreground components touching the image frame.
pub fn clear_border(mask: &BitBuffer2, connectivity: Connectivity) -> BitBuffer2 {
    let labels = LabelMap::from_mask(mask, connectivity);
    let touches = labels_touching_border(&labels);
    labels.select(|label| !touches[label as usize])
}

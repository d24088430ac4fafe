//! Aspect-ratio normalization for generation directives.
//!
//! Out-of-range values are coerced silently; a bad ratio from the analysis
//! stage must never abort an otherwise successful generation.

pub const IMAGE_ASPECT_RATIOS: [&str; 5] = ["1:1", "3:4", "4:3", "9:16", "16:9"];
pub const DEFAULT_IMAGE_ASPECT_RATIO: &str = "1:1";

pub const VIDEO_PORTRAIT: &str = "9:16";
pub const VIDEO_LANDSCAPE: &str = "16:9";

/// Returns the ratio itself when it is on the image allow-list, `1:1` otherwise.
pub fn normalize_image_aspect_ratio(aspect_ratio: &str) -> &'static str {
    IMAGE_ASPECT_RATIOS
        .iter()
        .copied()
        .find(|allowed| *allowed == aspect_ratio)
        .unwrap_or(DEFAULT_IMAGE_ASPECT_RATIO)
}

/// Video only knows portrait and landscape. Anything but an exact `9:16` is landscape.
pub fn normalize_video_aspect_ratio(aspect_ratio: &str) -> &'static str {
    if aspect_ratio == VIDEO_PORTRAIT {
        VIDEO_PORTRAIT
    } else {
        VIDEO_LANDSCAPE
    }
}

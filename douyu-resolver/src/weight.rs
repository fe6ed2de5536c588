//! Stream weights for "best available" selection

use crate::types::StreamDescriptor;

/// Group name reported next to platform weights
pub const WEIGHT_GROUP: &str = "douyutv";

const STREAM_WEIGHTS: [(&str, u32); 4] = [
    ("low", 540),
    ("medium", 720),
    ("high", 900),
    ("source", 1080),
];

/// Weight of a quality label, `None` for labels the platform policy does not
/// know (callers fall back to their generic ranking).
#[must_use]
pub fn stream_weight(quality: &str) -> Option<(u32, &'static str)> {
    STREAM_WEIGHTS
        .iter()
        .find(|(name, _)| *name == quality)
        .map(|&(_, weight)| (weight, WEIGHT_GROUP))
}

/// Stable sort: known labels by descending weight, then unknown labels in
/// their original order.
pub fn sort_best_first(streams: &mut [StreamDescriptor]) {
    streams.sort_by_key(|s| std::cmp::Reverse(stream_weight(&s.quality).map(|(w, _)| w)));
}

/// Highest-weighted stream, if any stream has a known label.
#[must_use]
pub fn best(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    streams
        .iter()
        .filter_map(|s| stream_weight(&s.quality).map(|(w, _)| (w, s)))
        .max_by_key(|(w, _)| *w)
        .map(|(_, s)| s)
}

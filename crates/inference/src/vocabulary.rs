use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `0: 'person'` or `5: "Baker's dozen"` inside an Ultralytics `names` entry.
static NAME_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("valid regex")
});

pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Fixed index -> class name map of a loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    names: Vec<String>,
}

impl ClassVocabulary {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn coco() -> Self {
        Self::new(COCO_CLASSES)
    }

    /// Parse the `names` metadata string written by Ultralytics exports.
    ///
    /// Returns `None` when nothing parses or the indices are not contiguous
    /// from zero.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let entries: BTreeMap<usize, String> = NAME_ENTRY
            .captures_iter(raw)
            .filter_map(|caps| {
                let index = caps.get(1)?.as_str().parse().ok()?;
                let name = caps.get(2).or_else(|| caps.get(3))?.as_str();
                Some((index, name.to_string()))
            })
            .collect();

        if entries.is_empty() {
            return None;
        }

        let contiguous = entries.keys().enumerate().all(|(i, &index)| i == index);
        if !contiguous {
            tracing::warn!(classes = entries.len(), "Model class names are not contiguous");
            return None;
        }

        Some(Self::new(entries.into_values()))
    }

    pub fn name(&self, index: u32) -> Option<&str> {
        self.names.get(index as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `(index, name)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| (i as u32, name.as_str()))
    }
}

/// Default network input (width, height) for Ultralytics YOLO exports.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Padding value used by Ultralytics letterboxing.
pub const LETTERBOX_COLOR: u8 = 114;

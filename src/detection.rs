use serde::Serialize;

use crate::ffi::RawDetection;

/// Axis-aligned bounding box in original-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BBox {
    /// X coordinate of the top-left corner.
    pub x: i32,
    /// Y coordinate of the top-left corner.
    pub y: i32,
    /// Box width in pixels.
    pub width: i32,
    /// Box height in pixels.
    pub height: i32,
}

/// One detected object instance reported by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Detection {
    /// Class identifier of the detected object.
    pub class_id: i32,
    /// Confidence score of the detection.
    pub confidence: f32,
    /// Bounding box of the detected object.
    pub bbox: BBox,
}

impl From<RawDetection> for Detection {
    fn from(raw: RawDetection) -> Self {
        let [x, y, width, height] = raw.bbox;
        Self {
            class_id: raw.class_id,
            confidence: raw.confidence,
            bbox: BBox {
                x,
                y,
                width,
                height,
            },
        }
    }
}

impl std::fmt::Display for Detection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Class ID: {}, Confidence: {}, Box: ({}, {}, {}, {})",
            self.class_id,
            self.confidence,
            self.bbox.x,
            self.bbox.y,
            self.bbox.width,
            self.bbox.height
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_detection() {
        let raw = RawDetection {
            class_id: 5,
            confidence: 0.87,
            bbox: [12, 34, 56, 78],
        };

        let detection = Detection::from(raw);

        assert_eq!(detection.class_id, 5);
        assert_eq!(detection.confidence, 0.87);
        assert_eq!(
            detection.bbox,
            BBox {
                x: 12,
                y: 34,
                width: 56,
                height: 78,
            }
        );
    }

    #[test]
    fn test_display_format() {
        let detection = Detection {
            class_id: 0,
            confidence: 0.91,
            bbox: BBox {
                x: 50,
                y: 400,
                width: 200,
                height: 500,
            },
        };

        assert_eq!(
            detection.to_string(),
            "Class ID: 0, Confidence: 0.91, Box: (50, 400, 200, 500)"
        );
    }
}

use std::ffi::{CString, c_int};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, error, trace};

use crate::detection::Detection;
use crate::ffi::{RawConfig, RawDetection, RawHandle, SdkLibrary};

/// Capacity of the caller-owned detection buffer handed to the SDK.
///
/// The count the SDK writes back is validated against this capacity
/// before any entry is read; see [`Yolov8::detections`].
pub const MAX_DETECTIONS: usize = 100;

/// YOLOv8 SDK error enum.
#[derive(thiserror::Error, Debug)]
pub enum Yolov8Error {
    /// The shared library could not be loaded or a symbol is missing.
    #[error(transparent)]
    Library(#[from] libloading::Error),

    /// The model path contains an interior NUL byte and cannot cross the
    /// C boundary.
    #[error("model path is not a valid C string: {0}")]
    ModelPath(#[from] std::ffi::NulError),

    /// The SDK returned a null detector handle.
    #[error("native library returned a null detector handle")]
    CreateFailed,

    /// The SDK reported a detection count outside the buffer it was given.
    #[error("native library reported {count} detections, buffer capacity is {capacity}")]
    DetectionOverflow {
        /// Count written by the SDK.
        count: i32,
        /// Capacity of the buffer the SDK was given.
        capacity: usize,
    },

    /// The image buffer is longer than the SDK's 32-bit length field.
    #[error("image of {0} bytes exceeds the native length field")]
    ImageTooLarge(usize),

    /// Failed to read a configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a configuration file.
    #[error("failed to parse config file: {0}")]
    Config(#[from] toml::de::Error),
}

/// YOLOv8 SDK configuration struct.
///
/// Deserializable from TOML; missing fields fall back to the defaults
/// below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Yolov8Config {
    /// The detection confidence threshold.
    pub conf_threshold: f32,
    /// The non-maximum suppression threshold.
    pub nms_threshold: f32,
    /// The class score threshold.
    pub score_threshold: f32,
    /// Model input width in pixels.
    pub input_width: i32,
    /// Model input height in pixels.
    pub input_height: i32,
    /// Path to the ONNX model file the SDK should load.
    pub onnx_path: PathBuf,
}

/// Default configuration for the SDK.
impl Default for Yolov8Config {
    fn default() -> Self {
        Self {
            conf_threshold: 0.5,
            nms_threshold: 0.4,
            score_threshold: 0.3,
            input_width: 640,
            input_height: 640,
            onnx_path: PathBuf::from("models/yolov8n.onnx"),
        }
    }
}

impl Yolov8Config {
    /// Load a configuration from a TOML file.
    pub fn from_file<P>(path: P) -> Result<Self, Yolov8Error>
    where
        P: AsRef<Path> + std::fmt::Debug,
    {
        trace!("Reading content from file {:?}...", path);
        let content = fs::read_to_string(&path).map_err(|e| {
            error!("Failed to read config from file {:?}: {e}", path);
            e
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            error!("Failed to parse config: {e}");
            e
        })?;

        debug!("Configuration: {:#?}", config);
        Ok(config)
    }
}

/// An owned YOLOv8 detector handle.
///
/// Wraps the opaque pointer returned by the SDK's create call and
/// guarantees the matching destroy call runs exactly once, on every exit
/// path, when the value is dropped. The raw pointer keeps this type
/// `!Send` and `!Sync`; the SDK makes no thread-safety promises.
pub struct Yolov8 {
    sdk: SdkLibrary,
    handle: RawHandle,
}

impl Yolov8 {
    /// Load the shared library at `sdk_path` and create a detector from
    /// `config`.
    pub fn load<P: AsRef<Path>>(
        sdk_path: P,
        config: &Yolov8Config,
    ) -> Result<Self, Yolov8Error> {
        let sdk = SdkLibrary::open(sdk_path)?;
        Self::with_sdk(sdk, config)
    }

    /// Create a detector on an already-loaded [`SdkLibrary`].
    pub fn with_sdk(sdk: SdkLibrary, config: &Yolov8Config) -> Result<Self, Yolov8Error> {
        debug!(
            "Creating detector: conf_threshold={}, nms_threshold={}, score_threshold={}, input={}x{}, onnx_path={:?}",
            config.conf_threshold,
            config.nms_threshold,
            config.score_threshold,
            config.input_width,
            config.input_height,
            config.onnx_path
        );

        let onnx_path = CString::new(config.onnx_path.as_os_str().as_encoded_bytes())?;
        let raw = RawConfig {
            conf_threshold: config.conf_threshold,
            nms_threshold: config.nms_threshold,
            score_threshold: config.score_threshold,
            input_width: config.input_width,
            input_height: config.input_height,
            onnx_path: onnx_path.as_ptr(),
        };

        // `onnx_path` outlives the create call; the SDK copies the string
        // before returning.
        let handle = unsafe { sdk.create(raw) };
        if handle.is_null() {
            error!("SDK returned a null detector handle.");
            return Err(Yolov8Error::CreateFailed);
        }

        trace!("Detector handle created.");
        Ok(Self { sdk, handle })
    }

    /// Run detection on a raw encoded image buffer.
    ///
    /// `image` is handed to the SDK as-is; this layer does not decode or
    /// validate it. `original_width` and `original_height` are the pixel
    /// dimensions of the source image, used by the SDK to scale boxes back
    /// to original coordinates; they must describe the real image for the
    /// boxes to be meaningful.
    ///
    /// Blocks the calling thread until the SDK returns, with no bound on
    /// duration.
    pub fn detect(
        &mut self,
        image: &[u8],
        original_width: i32,
        original_height: i32,
    ) -> Result<(), Yolov8Error> {
        let len = c_int::try_from(image.len())
            .map_err(|_| Yolov8Error::ImageTooLarge(image.len()))?;

        trace!(
            "Running detection on {len} bytes, original size {original_width}x{original_height}"
        );
        unsafe {
            self.sdk.detect(
                self.handle,
                image.as_ptr(),
                len,
                original_width,
                original_height,
            )
        };
        Ok(())
    }

    /// Collect the results of the most recent [`Self::detect`] call.
    ///
    /// Hands the SDK a buffer of [`MAX_DETECTIONS`] entries and validates
    /// the count it writes back before reading any of them: a negative
    /// count or one above capacity yields
    /// [`Yolov8Error::DetectionOverflow`] instead of an out-of-bounds read.
    pub fn detections(&self) -> Result<Vec<Detection>, Yolov8Error> {
        let mut buffer = [RawDetection::default(); MAX_DETECTIONS];
        let mut reported: c_int = 0;

        unsafe {
            self.sdk
                .get_detections(self.handle, buffer.as_mut_ptr(), &mut reported)
        };

        let count = usize::try_from(reported)
            .ok()
            .filter(|&count| count <= MAX_DETECTIONS)
            .ok_or(Yolov8Error::DetectionOverflow {
                count: reported,
                capacity: MAX_DETECTIONS,
            })?;

        trace!("SDK reported {count} detections.");
        Ok(buffer[..count]
            .iter()
            .copied()
            .map(Detection::from)
            .collect())
    }
}

impl Drop for Yolov8 {
    fn drop(&mut self) {
        // The handle was null-checked at construction and is never handed
        // out, so it is still live here.
        unsafe { self.sdk.destroy(self.handle) };
        trace!("Detector handle destroyed.");
    }
}

use std::ffi::{c_char, c_int, c_uchar, c_void};
use std::path::Path;

use tracing::{debug, trace};

use crate::yolov8::Yolov8Error;

/// Opaque pointer to detector state living inside the native library.
pub type RawHandle = *mut c_void;

/// Configuration record passed by value into `CreateYOLOV8`.
///
/// Field order and types mirror the `Config` struct of the SDK's C header.
/// The string behind `onnx_path` is only required to stay alive for the
/// duration of the create call; the library copies what it needs.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawConfig {
    /// Detection confidence threshold.
    pub conf_threshold: f32,
    /// Non-maximum suppression threshold.
    pub nms_threshold: f32,
    /// Class score threshold.
    pub score_threshold: f32,
    /// Model input width in pixels.
    pub input_width: c_int,
    /// Model input height in pixels.
    pub input_height: c_int,
    /// NUL-terminated path to the ONNX model file.
    pub onnx_path: *const c_char,
}

/// One detection entry as written by `GetDetectionsYOLOV8`.
///
/// The box is `[x, y, width, height]` in original-image pixels.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawDetection {
    /// Class identifier.
    pub class_id: c_int,
    /// Confidence score.
    pub confidence: f32,
    /// Bounding box as `[x, y, width, height]`.
    pub bbox: [c_int; 4],
}

pub(crate) type CreateFn = unsafe extern "C" fn(RawConfig) -> RawHandle;
pub(crate) type DestroyFn = unsafe extern "C" fn(RawHandle);
pub(crate) type DetectFn =
    unsafe extern "C" fn(RawHandle, *const c_uchar, c_int, c_int, c_int);
pub(crate) type GetDetectionsFn =
    unsafe extern "C" fn(RawHandle, *mut RawDetection, *mut c_int);

const SYM_CREATE: &[u8] = b"CreateYOLOV8\0";
const SYM_DESTROY: &[u8] = b"DestroyYOLOV8\0";
const SYM_DETECT: &[u8] = b"DetectYOLOV8\0";
const SYM_GET_DETECTIONS: &[u8] = b"GetDetectionsYOLOV8\0";

/// The four entry points of the SDK, resolved by name from a shared library.
///
/// The library mapping is kept alive alongside the resolved function
/// pointers; they dangle the moment the mapping is unloaded.
pub struct SdkLibrary {
    create: CreateFn,
    destroy: DestroyFn,
    detect: DetectFn,
    get_detections: GetDetectionsFn,
    _library: Option<libloading::Library>,
}

impl std::fmt::Debug for SdkLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkLibrary")
            .field(
                "library",
                &if self._library.is_some() {
                    "Loaded"
                } else {
                    "Stub"
                },
            )
            .finish()
    }
}

impl SdkLibrary {
    /// Load the shared library at `path` and resolve the four entry points.
    ///
    /// Fails with [`Yolov8Error::Library`] when the file cannot be loaded
    /// or any symbol is missing.
    ///
    /// # Safety contract
    ///
    /// The library is trusted to export symbols matching the declared
    /// signatures; a mismatched ABI is undefined behavior that no check in
    /// this crate can catch.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Yolov8Error> {
        let path = path.as_ref();
        debug!("Loading YOLOv8 SDK from {:?}", path);

        let library = unsafe { libloading::Library::new(path) }?;

        let create = unsafe { *library.get::<CreateFn>(SYM_CREATE)? };
        let destroy = unsafe { *library.get::<DestroyFn>(SYM_DESTROY)? };
        let detect = unsafe { *library.get::<DetectFn>(SYM_DETECT)? };
        let get_detections =
            unsafe { *library.get::<GetDetectionsFn>(SYM_GET_DETECTIONS)? };

        trace!("Resolved all four SDK entry points.");
        Ok(Self {
            create,
            destroy,
            detect,
            get_detections,
            _library: Some(library),
        })
    }

    /// Assemble an [`SdkLibrary`] from bare function pointers, bypassing the
    /// dynamic loader. Used by tests to stand in a stub SDK.
    #[cfg(test)]
    pub(crate) fn from_raw(
        create: CreateFn,
        destroy: DestroyFn,
        detect: DetectFn,
        get_detections: GetDetectionsFn,
    ) -> Self {
        Self {
            create,
            destroy,
            detect,
            get_detections,
            _library: None,
        }
    }

    /// # Safety
    ///
    /// `config.onnx_path` must point to a valid NUL-terminated string.
    pub(crate) unsafe fn create(&self, config: RawConfig) -> RawHandle {
        unsafe { (self.create)(config) }
    }

    /// # Safety
    ///
    /// `handle` must have been returned by [`Self::create`] on this library
    /// and not destroyed yet.
    pub(crate) unsafe fn destroy(&self, handle: RawHandle) {
        unsafe { (self.destroy)(handle) }
    }

    /// # Safety
    ///
    /// `handle` must be live and `image` valid for `len` bytes.
    pub(crate) unsafe fn detect(
        &self,
        handle: RawHandle,
        image: *const c_uchar,
        len: c_int,
        width: c_int,
        height: c_int,
    ) {
        unsafe { (self.detect)(handle, image, len, width, height) }
    }

    /// # Safety
    ///
    /// `handle` must be live, `out` valid for [`crate::MAX_DETECTIONS`]
    /// entries and `count` valid for writes.
    pub(crate) unsafe fn get_detections(
        &self,
        handle: RawHandle,
        out: *mut RawDetection,
        count: *mut c_int,
    ) {
        unsafe { (self.get_detections)(handle, out, count) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn test_raw_detection_layout_matches_c_header() {
        // int + float + int[4]
        assert_eq!(size_of::<RawDetection>(), 24);
        assert_eq!(align_of::<RawDetection>(), 4);
        assert_eq!(offset_of!(RawDetection, class_id), 0);
        assert_eq!(offset_of!(RawDetection, confidence), 4);
        assert_eq!(offset_of!(RawDetection, bbox), 8);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_raw_config_layout_matches_c_header() {
        // 3 floats + 2 ints, padded to pointer alignment, then the path.
        assert_eq!(size_of::<RawConfig>(), 32);
        assert_eq!(offset_of!(RawConfig, conf_threshold), 0);
        assert_eq!(offset_of!(RawConfig, nms_threshold), 4);
        assert_eq!(offset_of!(RawConfig, score_threshold), 8);
        assert_eq!(offset_of!(RawConfig, input_width), 12);
        assert_eq!(offset_of!(RawConfig, input_height), 16);
        assert_eq!(offset_of!(RawConfig, onnx_path), 24);
    }

    #[test]
    fn test_open_missing_library_fails() {
        let result = SdkLibrary::open("/nonexistent/yolov8_sdk.so");
        assert!(matches!(result, Err(Yolov8Error::Library(_))));
    }
}

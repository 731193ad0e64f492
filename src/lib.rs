#![deny(missing_docs)]

//! Safe bindings to the prebuilt YOLOv8_SDK native detection library.
//!
//! The SDK ships as an opaque shared library exporting four C entry points
//! that create a detector, run it on encoded image bytes, report results
//! and tear it down. This crate resolves those entry points at runtime and
//! wraps the raw handle in an owned type that validates everything the
//! library reports before trusting it.
//!
//! # Examples
//!
//! ```no_run
//! use yolov8_sdk::{Yolov8, Yolov8Config};
//!
//! let config = Yolov8Config {
//!     onnx_path: "models/yolov8n.onnx".into(),
//!     ..Yolov8Config::default()
//! };
//!
//! let mut model = Yolov8::load("dll/libyolov8_sdk.so", &config)
//!     .expect("Failed to load the YOLOv8 SDK");
//!
//! let image = std::fs::read("images/bus.jpg").expect("Failed to read image");
//! model.detect(&image, 810, 1080).expect("Detection failed");
//!
//! for detection in model.detections().expect("Failed to collect detections") {
//!     println!("{detection}");
//! }
//! ```

/// Detection result types reported by the SDK
mod detection;

/// Raw record layouts and entry-point binding for the native library
mod ffi;

/// YOLOv8 SDK high level interface
mod yolov8;

pub use detection::{BBox, Detection};
pub use ffi::{RawConfig, RawDetection, RawHandle, SdkLibrary};
pub use yolov8::{MAX_DETECTIONS, Yolov8, Yolov8Config, Yolov8Error};

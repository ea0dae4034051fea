//! Face quality scoring, descriptor extraction, and similarity.
//!
//! The analytic core behind an enrollment/verification workflow: decode an
//! image payload, locate faces with a classical cascade-style detector,
//! score the canonical face on four quality metrics, extract a fixed 64-value
//! descriptor, and compare descriptors by cosine similarity. Transport,
//! persistence, and record management live with external callers.

pub mod decode;
pub mod detect;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod quality;
pub mod similarity;

pub use detect::{largest_face, BoundingBox, CascadeDetector, DetectorParams, FaceDetector};
pub use error::VisionError;
pub use features::FEATURE_LEN;
pub use pipeline::Pipeline;
pub use quality::{QualityScore, QualitySubscores};

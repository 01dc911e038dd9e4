//! Classification detectors, run in a fixed order until a fixed point.

mod bit;
mod brk;
mod jsr;
mod label;

pub use bit::BitDetector;
pub use brk::BrkDetector;
pub use jsr::JsrDetector;
pub use label::LabelDetector;

use crate::command_buffer::CommandBuffer;

/// A code type detector.
///
/// Detectors must be idempotent: a second run without intervening
/// classification changes reports no change.
pub trait Detector {
    /// Stable identifier used for persistence.
    fn id(&self) -> &'static str;

    /// Detect code types. Returns whether any classification, label or
    /// subroutine changed.
    fn detect(&self, buffer: &mut CommandBuffer) -> bool;
}

/// The standard detector pipeline in its fixed order.
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(LabelDetector),
        Box::new(BrkDetector),
        Box::new(BitDetector),
        Box::new(JsrDetector),
    ]
}

/// Rebuild a detector from its persistent identifier.
pub fn detector_by_id(id: &str) -> Result<Box<dyn Detector>, String> {
    match id {
        "label" => Ok(Box::new(LabelDetector)),
        "brk" => Ok(Box::new(BrkDetector)),
        "bit" => Ok(Box::new(BitDetector)),
        "jsr" => Ok(Box::new(JsrDetector)),
        _ => Err(format!("unknown detector id: {}", id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pipeline_order() {
        let ids: Vec<&str> = default_detectors().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["label", "brk", "bit", "jsr"]);
    }

    #[test]
    fn test_detector_by_id_round_trip() {
        for detector in default_detectors() {
            assert_eq!(detector_by_id(detector.id()).unwrap().id(), detector.id());
        }
        assert!(detector_by_id("nope").is_err());
    }
}

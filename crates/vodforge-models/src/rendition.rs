//! The fixed rendition format table.

use serde::Serialize;

/// Bandwidth estimate per pixel row of output height.
///
/// The master playlist advertises `BANDWIDTH_FACTOR * height` bits per
/// second for each rendition, so the value is a deterministic function of
/// the declared resolution.
pub const BANDWIDTH_FACTOR: u64 = 800;

/// One target output variant of the source video.
///
/// Read-only for the lifetime of the process; renditions are configuration,
/// not per-job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenditionFormat {
    /// Display name, also the per-rendition output directory ("720P")
    pub name: &'static str,
    /// ffmpeg scale filter argument ("w=1280:h=720")
    pub scale: &'static str,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

impl RenditionFormat {
    /// `WIDTHxHEIGHT` as advertised in the master playlist.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

const RENDITIONS: [RenditionFormat; 4] = [
    RenditionFormat { name: "360P", scale: "w=640:h=360", width: 640, height: 360 },
    RenditionFormat { name: "480P", scale: "w=842:h=480", width: 842, height: 480 },
    RenditionFormat { name: "720P", scale: "w=1280:h=720", width: 1280, height: 720 },
    RenditionFormat { name: "1080P", scale: "w=1920:h=1080", width: 1920, height: 1080 },
];

/// The fixed set of target renditions, lowest to highest.
pub fn renditions() -> &'static [RenditionFormat] {
    &RENDITIONS
}

/// Bandwidth estimate for a rendition, in bits per second.
pub fn rendition_bandwidth(format: &RenditionFormat) -> u64 {
    BANDWIDTH_FACTOR * u64::from(format.height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_fixed_renditions() {
        let all = renditions();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].name, "360P");
        assert_eq!(all[3].resolution(), "1920x1080");
    }

    #[test]
    fn bandwidth_is_deterministic_in_height() {
        let hd = renditions().iter().find(|r| r.name == "720P").unwrap();
        assert_eq!(rendition_bandwidth(hd), BANDWIDTH_FACTOR * 720);
        let fhd = renditions().iter().find(|r| r.name == "1080P").unwrap();
        assert_eq!(rendition_bandwidth(fhd), 800 * 1080);
    }
}

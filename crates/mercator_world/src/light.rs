//! # Combined Light And The Light Curve
//!
//! Every layer stores one byte of light: `block_light + sky_light * 16`,
//! both channels clamped to `0..=15`. The compositor turns that byte into a
//! color multiplier through a 256-entry [`LightCurve`], which the host
//! renderer may replace wholesale (day/night cycle, gamma settings).

use mercator_core::Argb;

/// Minimum block light reported for lava and magma columns. Keeps glowing
/// terrain visible on the map even under a midnight light curve.
pub const LAVA_LIGHT_FLOOR: u8 = 14;

/// Packs block and sky light into the stored one-byte form.
#[must_use]
pub fn combined_light(block_light: u8, sky_light: u8) -> u8 {
    block_light.min(15) + sky_light.min(15) * 16
}

/// 256-entry table mapping a combined light value to a color multiplier.
#[derive(Clone, PartialEq, Eq)]
pub struct LightCurve {
    entries: Box<[Argb; 256]>,
}

impl LightCurve {
    /// Builds a curve from raw ARGB entries.
    #[must_use]
    pub fn from_colors(colors: [u32; 256]) -> Self {
        let mut entries = Box::new([Argb::TRANSPARENT; 256]);
        for (slot, raw) in entries.iter_mut().zip(colors) {
            *slot = Argb(raw);
        }
        Self { entries }
    }

    /// Multiplier for one combined light value.
    #[must_use]
    pub fn get(&self, light: u8) -> Argb {
        self.entries[usize::from(light)]
    }

    /// True when the two curves differ along the sky column (block light 0,
    /// sky light 0..=15). The sky column is what day/night transitions move,
    /// so comparing 16 entries detects a lighting change without scanning
    /// all 256.
    #[must_use]
    pub fn sky_profile_differs(&self, other: &Self) -> bool {
        (0..16).any(|sky| self.entries[sky * 16] != other.entries[sky * 16])
    }
}

impl Default for LightCurve {
    /// Neutral grayscale ramp: brightness follows the stronger of the two
    /// light channels, from black at 0 to white at 15.
    fn default() -> Self {
        let mut entries = Box::new([Argb::TRANSPARENT; 256]);
        for (value, slot) in entries.iter_mut().enumerate() {
            let block = (value & 0xF) as u8;
            let sky = (value >> 4) as u8;
            let level = block.max(sky) * 17;
            *slot = Argb::opaque(level, level, level);
        }
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_light_packs_and_clamps() {
        assert_eq!(combined_light(0, 0), 0);
        assert_eq!(combined_light(15, 15), 255);
        assert_eq!(combined_light(3, 7), 3 + 7 * 16);
        // Out-of-range channels clamp instead of wrapping.
        assert_eq!(combined_light(200, 200), 255);
    }

    #[test]
    fn test_default_curve_endpoints() {
        let curve = LightCurve::default();
        assert_eq!(curve.get(0), Argb::BLACK);
        assert_eq!(curve.get(255), Argb::WHITE);
        // Full sky light alone is already white.
        assert_eq!(curve.get(combined_light(0, 15)), Argb::WHITE);
    }

    #[test]
    fn test_sky_profile_change_detection() {
        let day = LightCurve::default();
        let mut colors = [0u32; 256];
        for (i, c) in colors.iter_mut().enumerate() {
            let block = (i & 0xF) as u32 * 17;
            // Night: sky contributes nothing.
            *c = 0xFF00_0000 | (block << 16) | (block << 8) | block;
        }
        let night = LightCurve::from_colors(colors);
        assert!(day.sky_profile_differs(&night));
        assert!(!day.sky_profile_differs(&day.clone()));
    }

    #[test]
    fn test_torch_only_change_is_not_a_sky_change() {
        let base = LightCurve::default();
        let mut colors = [0u32; 256];
        for (i, c) in colors.iter_mut().enumerate() {
            *c = base.get(i as u8).0;
        }
        // Perturb a block-light-only entry (block 5, sky 0 stays put; block
        // light varies within a sky row).
        colors[5] = 0xFFFF_0000;
        let tweaked = LightCurve::from_colors(colors);
        assert!(!base.sky_profile_differs(&tweaked));
    }
}

//! # Packed ARGB Color
//!
//! The compositor works on 32-bit ARGB pixels. Three operations cover all of
//! its blending needs:
//!
//! - `multiply`: per-channel modulation (biome tints, light curve)
//! - `blend_over`: additive-over layering (terrain layers, overlays)
//! - `shade`: signed lighten/darken (height and slope shading)
//!
//! All channel arithmetic clamps to `0..=255` before repacking. Alpha is
//! real data here: translucent materials (water, glass) carry their alpha
//! into the layer blend, which is what lets the ocean floor show through.

use bytemuck::{Pod, Zeroable};

/// A packed 32-bit ARGB color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Argb(pub u32);

impl Argb {
    /// Fully transparent black; also the "nothing sampled here" pixel.
    pub const TRANSPARENT: Self = Self(0);
    /// Opaque black.
    pub const BLACK: Self = Self(0xFF00_0000);
    /// Opaque white.
    pub const WHITE: Self = Self(0xFFFF_FFFF);

    /// Builds a color from the four channels.
    #[must_use]
    pub const fn new(alpha: u8, red: u8, green: u8, blue: u8) -> Self {
        Self(
            ((alpha as u32) << 24) | ((red as u32) << 16) | ((green as u32) << 8) | (blue as u32),
        )
    }

    /// Builds an opaque color.
    #[must_use]
    pub const fn opaque(red: u8, green: u8, blue: u8) -> Self {
        Self::new(0xFF, red, green, blue)
    }

    /// Alpha channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Red channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    /// Same color with a replaced alpha channel.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        Self((self.0 & 0x00FF_FFFF) | ((alpha as u32) << 24))
    }

    /// True for the all-zero pixel.
    #[must_use]
    pub const fn is_transparent(self) -> bool {
        self.0 == 0
    }

    /// Per-channel multiply, `(a * b) / 255` on all four channels.
    ///
    /// Used for biome tinting and light-curve attenuation. Both inputs
    /// usually carry alpha `0xFF` on one side, which leaves the other
    /// side's alpha untouched.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn multiply(self, other: Self) -> Self {
        let a = (self.0 >> 24 & 0xFF) * (other.0 >> 24 & 0xFF) / 255;
        let r = (self.0 >> 16 & 0xFF) * (other.0 >> 16 & 0xFF) / 255;
        let g = (self.0 >> 8 & 0xFF) * (other.0 >> 8 & 0xFF) / 255;
        let b = (self.0 & 0xFF) * (other.0 & 0xFF) / 255;
        Self((a << 24) | (r << 16) | (g << 8) | b)
    }

    /// Additive-over blend: `over`'s channels, scaled by `over`'s alpha, are
    /// added on top of `self`, saturating at 255. The result is opaque.
    ///
    /// This is deliberately not a plain alpha lerp: stacked translucent
    /// layers brighten rather than replace, so a thin water surface still
    /// reveals the floor beneath it.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn blend_over(self, over: Self) -> Self {
        let alpha = u32::from(over.alpha());
        let add = |top: u8, base: u8| -> u32 {
            (u32::from(top) * alpha / 255 + u32::from(base)).min(255)
        };
        let r = add(over.red(), self.red());
        let g = add(over.green(), self.green());
        let b = add(over.blue(), self.blue());
        Self(0xFF00_0000 | (r << 16) | (g << 8) | b)
    }

    /// Signed shade: positive `sc` moves RGB toward white by `sc * (255-c)`,
    /// negative moves toward black by `|sc| * c`. Alpha is preserved and the
    /// channels are clamped, so no wraparound is possible for any `sc`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn shade(self, sc: f64) -> Self {
        if sc == 0.0 {
            return self;
        }
        let apply = |c: u8| -> u8 {
            let c = i64::from(c);
            let shifted = if sc > 0.0 {
                c + (sc * (255 - c) as f64) as i64
            } else {
                c - (-sc * c as f64) as i64
            };
            shifted.clamp(0, 255) as u8
        };
        Self::new(self.alpha(), apply(self.red()), apply(self.green()), apply(self.blue()))
    }
}

impl From<u32> for Argb {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Argb> for u32 {
    fn from(color: Argb) -> Self {
        color.0
    }
}

//! # Color Compositing
//!
//! Turns one sampled column into one map pixel:
//!
//! 1. each layer's base color is tinted by the column biome
//! 2. height and slope shading lighten or darken each layer
//! 3. the light curve attenuates each layer by its stored light
//! 4. the layers blend bottom-up with the additive-over operator
//! 5. biome wash, navigation path and chunk grid overlays go on top
//!
//! Slope shading compares against one diagonal neighbor, `(lx-1, lz+1)`
//! in the interior and the mirrored `(lx+1, lz-1)` with an inverted sign at
//! the low edges. The asymmetry gives terrain its fixed light direction.

use std::sync::Arc;

use mercator_core::{Argb, BiomeOverlay, RenderOptions};
use mercator_world::{
    BiomeId, BiomeRegistry, LightCurve, MaterialId, MaterialRegistry, NO_HEIGHT,
};

use crate::overlay::{GridOverlay, PathOverlay};
use crate::tile::{Layer, LayerView};

/// Reference height for height shading; terrain above reads brighter,
/// below darker.
const SHADE_PIVOT: f64 = 80.0;
/// Height substituted for solid (unscannable) columns.
const SOLID_HEIGHT: i16 = 80;

/// Stateless pixel compositor over the material and biome registries.
pub struct ColorCompositor {
    materials: Arc<MaterialRegistry>,
    biomes: Arc<BiomeRegistry>,
}

/// Everything one [`crate::tile::RegionTile::render`] pass needs.
pub struct RenderContext<'a> {
    /// The compositor.
    pub compositor: &'a ColorCompositor,
    /// Render-time toggles.
    pub options: &'a RenderOptions,
    /// Light-to-color curve.
    pub curve: &'a LightCurve,
    /// Navigation path overlay.
    pub path: &'a PathOverlay,
    /// Chunk grid overlay.
    pub grid: &'a GridOverlay,
    /// Lowest buildable world Y.
    pub bottom_y: i16,
    /// One above the highest buildable world Y.
    pub top_y: i16,
}

impl RenderContext<'_> {
    /// Composites one pixel, overlays included. Unrenderable columns yield
    /// the transparent pixel; everything else comes out opaque.
    #[must_use]
    pub fn composite(
        &self,
        view: LayerView<'_>,
        lx: usize,
        lz: usize,
        block_x: i32,
        block_z: i32,
    ) -> Argb {
        let Some(mut color) =
            self.compositor
                .pixel(view, lx, lz, self.options, self.curve, self.bottom_y, self.top_y)
        else {
            return Argb::TRANSPARENT;
        };
        color = self.path.blend(color, block_x, block_z);
        if self.options.chunk_grid {
            color = self.grid.apply(color, block_x, block_z);
        }
        if color.is_transparent() {
            // Solid columns with no overlay stay blank.
            return Argb::TRANSPARENT;
        }
        color.with_alpha(0xFF)
    }
}

impl ColorCompositor {
    /// Creates a compositor over the given registries.
    #[must_use]
    pub fn new(materials: Arc<MaterialRegistry>, biomes: Arc<BiomeRegistry>) -> Self {
        Self { materials, biomes }
    }

    /// Base color of one layer: material color times biome tint. With
    /// biomes disabled the material's default tint applies instead.
    #[must_use]
    pub fn layer_color(
        &self,
        material: MaterialId,
        biome: BiomeId,
        options: &RenderOptions,
    ) -> Argb {
        let props = self.materials.get(material);
        let mut color = props.base_color;
        let tint = if options.biomes {
            self.biomes.tint_for(biome, props.tint)
        } else {
            self.biomes.default_tint(props.tint)
        };
        if let Some(tint) = tint {
            color = color.multiply(tint.with_alpha(0xFF));
        }
        color
    }

    /// Composites the terrain color of one column, without overlays.
    /// `None` means the column is not renderable (never sampled, or its
    /// chunk was absent).
    #[must_use]
    #[allow(clippy::too_many_arguments, clippy::similar_names)]
    pub fn pixel(
        &self,
        view: LayerView<'_>,
        lx: usize,
        lz: usize,
        options: &RenderOptions,
        curve: &LightCurve,
        bottom_y: i16,
        top_y: i16,
    ) -> Option<Argb> {
        let surface = view.layer(Layer::Surface, lx, lz);
        let biome = view.biome(lx, lz);
        let renderable = (!self.materials.is_air(surface.material)
            || surface.light != 0
            || surface.height != NO_HEIGHT)
            && !biome.is_sentinel();
        if !renderable {
            return None;
        }
        if options.biome_overlay == BiomeOverlay::Replace {
            return Some(self.biomes.map_color(biome));
        }

        // Columns whose surface escaped the world's build range are solid
        // rock from the map's point of view. Lava is exempt so lava seas
        // in roofed worlds still glow.
        let mut solid = false;
        let mut surface_height = surface.height;
        if surface_height < bottom_y || surface_height == top_y {
            surface_height = SOLID_HEIGHT;
            solid = true;
        }
        if surface.material == MaterialId::LAVA {
            solid = false;
        }

        let mut surface_color = self.layer_color(surface.material, biome, options);
        surface_color = self.apply_shading(
            view,
            surface_color,
            lx,
            lz,
            surface_height,
            solid,
            Layer::Surface,
            options,
        );
        if solid {
            surface_color = Argb::TRANSPARENT;
        } else if options.lightmap {
            surface_color = surface_color.multiply(curve.get(surface.light));
        }

        let mut floor_color = Argb::TRANSPARENT;
        let mut floor_height = bottom_y;
        if options.water_transparency && !solid {
            let floor = view.layer(Layer::OceanFloor, lx, lz);
            if floor.height > bottom_y {
                floor_height = floor.height;
                if !self.materials.is_air(floor.material) {
                    floor_color = self.layer_color(floor.material, biome, options);
                    floor_color = self.apply_shading(
                        view,
                        floor_color,
                        lx,
                        lz,
                        floor.height,
                        solid,
                        Layer::OceanFloor,
                        options,
                    );
                    if options.lightmap {
                        floor_color = floor_color.multiply(curve.get(floor.light));
                    }
                }
            }
        }

        let mut transparent_color = Argb::TRANSPARENT;
        let mut transparent_height = bottom_y;
        let mut foliage_color = Argb::TRANSPARENT;
        let mut foliage_height = bottom_y;
        if options.block_transparency && !solid {
            let transparent = view.layer(Layer::Transparent, lx, lz);
            if transparent.height > bottom_y && !self.materials.is_air(transparent.material) {
                transparent_height = transparent.height;
                transparent_color = self.layer_color(transparent.material, biome, options);
                transparent_color = self.apply_shading(
                    view,
                    transparent_color,
                    lx,
                    lz,
                    transparent.height,
                    solid,
                    Layer::Transparent,
                    options,
                );
                if options.lightmap {
                    transparent_color = transparent_color.multiply(curve.get(transparent.light));
                }
            }

            let foliage = view.layer(Layer::Foliage, lx, lz);
            if foliage.height > bottom_y && !self.materials.is_air(foliage.material) {
                foliage_height = foliage.height;
                foliage_color = self.layer_color(foliage.material, biome, options);
                foliage_color = self.apply_shading(
                    view,
                    foliage_color,
                    lx,
                    lz,
                    foliage.height,
                    solid,
                    Layer::Foliage,
                    options,
                );
                if options.lightmap {
                    foliage_color = foliage_color.multiply(curve.get(foliage.light));
                }
            }
        }

        // Bottom-up additive-over blend. Under-surface layers go beneath
        // the surface, above-surface layers on top.
        let mut color;
        if options.water_transparency && floor_height > bottom_y {
            color = floor_color;
            if !foliage_color.is_transparent() && foliage_height <= surface_height {
                color = color.blend_over(foliage_color);
            }
            if !transparent_color.is_transparent() && transparent_height <= surface_height {
                color = color.blend_over(transparent_color);
            }
            color = color.blend_over(surface_color);
        } else {
            color = surface_color;
        }
        if !foliage_color.is_transparent() && foliage_height > surface_height {
            color = color.blend_over(foliage_color);
        }
        if !transparent_color.is_transparent() && transparent_height > surface_height {
            color = color.blend_over(transparent_color);
        }

        if options.biome_overlay == BiomeOverlay::Wash {
            let wash = self.biomes.map_color(biome).with_alpha(0x7F);
            color = color.blend_over(wash);
        }
        Some(color)
    }

    /// Height and slope shading for one layer.
    #[allow(clippy::too_many_arguments)]
    fn apply_shading(
        &self,
        view: LayerView<'_>,
        color: Argb,
        lx: usize,
        lz: usize,
        height: i16,
        solid: bool,
        layer: Layer,
        options: &RenderOptions,
    ) -> Argb {
        if color.is_transparent() || solid || (!options.heightmap && !options.slopemap) {
            return color;
        }

        let mut sc;
        if options.slopemap {
            let mut invert = false;
            let neighbor = if lx > 0 && lz < 255 {
                Some((lx - 1, lz + 1))
            } else if lx < 255 && lz > 0 {
                invert = true;
                Some((lx + 1, lz - 1))
            } else {
                None
            };

            let mut comp = match neighbor {
                None => height,
                Some((nx, nz)) => match layer {
                    Layer::OceanFloor => view.height(Layer::OceanFloor, nx, nz),
                    Layer::Surface => view.height(Layer::Surface, nx, nz),
                    // Foliage gets no slope: a leaf sits flat on the map.
                    Layer::Foliage => height,
                    Layer::Transparent => {
                        let mut h = view.height(Layer::Transparent, nx, nz);
                        if h == NO_HEIGHT {
                            // Glass panes slope against the neighbor's
                            // surface when the neighbor has no pane.
                            let own = view.layer(Layer::Transparent, lx, lz);
                            if self.materials.is_glass(own.material) {
                                h = view.height(Layer::Surface, nx, nz);
                            }
                        }
                        h
                    }
                },
            };
            if comp == NO_HEIGHT {
                comp = height;
            }

            let diff = if invert {
                i32::from(height) - i32::from(comp)
            } else {
                i32::from(comp) - i32::from(height)
            };
            sc = match diff.signum() {
                1 => 1.0 / 8.0,
                -1 => -1.0 / 8.0,
                _ => 0.0,
            };
            if options.heightmap {
                let hdiff = f64::from(height) - SHADE_PIVOT;
                let heightsc = (hdiff.abs() / 8.0 + 1.0).log10() / 3.0;
                sc = if hdiff > 0.0 { sc + heightsc } else { sc - heightsc };
            }
        } else {
            let diff = f64::from(height) - SHADE_PIVOT;
            sc = (diff.abs() / 8.0 + 1.0).log10() / 1.8;
            if diff < 0.0 {
                sc = -sc;
            }
        }
        color.shade(sc)
    }
}

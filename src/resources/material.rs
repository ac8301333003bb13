use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::math::Color;
use crate::resources::image::Image;

/// Texture minification/magnification filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    Nearest,
    Linear,
}

/// Texture addressing outside the `[0, 1]` UV range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureWrap {
    #[default]
    Repeat,
    Clamp,
}

/// Per-meshpart triangle ordering before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriangleSort {
    /// Farthest triangles first; the default for correct transparency.
    #[default]
    BackToFront,
    /// Nearest first, to maximize early depth rejection on opaque parts.
    FrontToBack,
    /// Emission order as authored.
    None,
}

/// How a material resolves transparency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transparency {
    /// Transparent when the material color's alpha is below ~1 or the
    /// composite mode is not source-over.
    #[default]
    Auto,
    Opaque,
    /// Texture alpha below one half discards the fragment.
    AlphaClip,
    Transparent,
}

/// Fragment composite/blend mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Composite {
    #[default]
    SourceOver,
    Additive,
    Subtractive,
    Multiply,
}

/// Camera-facing adjustment applied to a model's rotation per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BillboardMode {
    #[default]
    None,
    /// Rotates about +Y only, keeping the model upright.
    Horizontal,
    /// Faces the camera but keeps the world up axis fixed.
    FixedVertical,
    /// Fully faces the camera.
    All,
}

/// A post-rasterization image shader run over the camera's color target
/// once per frame for each material that defines one.
pub type ImageShader = Arc<dyn Fn(&mut Image, &FxHashMap<String, f32>) + Send + Sync>;

/// Surface description for a mesh part.
#[derive(Clone)]
pub struct Material {
    pub name: String,
    pub(crate) id: u32,
    /// Diffuse color, multiplied with texture and lighting.
    pub color: Color,
    pub texture: Option<Arc<Image>>,
    pub filter: TextureFilter,
    pub wrap: TextureWrap,

    pub backface_culling: bool,
    pub sort: TriangleSort,
    pub transparency: Transparency,
    pub composite: Composite,
    pub billboard: BillboardMode,
    /// Use the unbillboarded position for depth so billboards sort like
    /// their anchor point.
    pub unbillboarded_depth: bool,
    /// Skip lighting entirely; vertices render fully lit.
    pub shadeless: bool,

    pub shader: Option<ImageShader>,
    pub shader_uniforms: FxHashMap<String, f32>,
}

impl Material {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: 0,
            color: Color::WHITE,
            texture: None,
            filter: TextureFilter::default(),
            wrap: TextureWrap::default(),
            backface_culling: true,
            sort: TriangleSort::default(),
            transparency: Transparency::default(),
            composite: Composite::default(),
            billboard: BillboardMode::default(),
            unbillboarded_depth: false,
            shadeless: false,
            shader: None,
            shader_uniforms: FxHashMap::default(),
        }
    }

    /// Whether fragments of this material must render in the transparent
    /// pass.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        match self.transparency {
            Transparency::Transparent => true,
            Transparency::Opaque | Transparency::AlphaClip => false,
            Transparency::Auto => self.color.a < 0.999 || self.composite != Composite::SourceOver,
        }
    }

    #[must_use]
    pub fn is_alpha_clip(&self) -> bool {
        self.transparency == Transparency::AlphaClip
    }

    /// Library-stable id; zero until registered with a library.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new("material")
    }
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("color", &self.color)
            .field("texture", &self.texture.as_ref().map(|t| t.bounds()))
            .field("sort", &self.sort)
            .field("transparency", &self.transparency)
            .field("composite", &self.composite)
            .field("billboard", &self.billboard)
            .field("shadeless", &self.shadeless)
            .field("shader", &self.shader.is_some())
            .finish_non_exhaustive()
    }
}

/// Texture trait and format types

/// Texture formats used by the presentation path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_SRGB,
    B8G8R8A8_UNORM,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
    D32_FLOAT_S8_UINT,
}

impl TextureFormat {
    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_FLOAT_S8_UINT
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_FLOAT_S8_UINT)
    }
}

/// Optimized clear value attached to a texture at creation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Opaque, backend-defined identity of a GPU resource
///
/// Stable for the lifetime of the resource; used as the key for resource
/// state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub u64);

/// Read-only texture properties
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub clear_value: Option<ClearValue>,
}

/// GPU texture (swapchain color buffer or depth/stencil buffer)
pub trait Texture: Send + Sync {
    fn info(&self) -> &TextureInfo;

    fn handle(&self) -> ResourceHandle;
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;

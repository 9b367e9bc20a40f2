/// Conversions between engine types and Vulkan enums
///
/// Everything here is pure, so the mapping rules are unit tested without a GPU.

use ash::vk;
use clearframe::cf::render::{ResourceState, TextureFormat};

/// Convert TextureFormat to Vulkan format
pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32_FLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Convert Vulkan format back to TextureFormat (None for formats the engine does not use)
pub(crate) fn vk_to_format(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        vk::Format::D32_SFLOAT_S8_UINT => Some(TextureFormat::D32_FLOAT_S8_UINT),
        _ => None,
    }
}

/// Image aspects covered by a view or barrier on a texture of this format
pub(crate) fn aspect_mask(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Depth formats tried in order when the requested one has no optimal-tiling support
pub(crate) fn depth_format_candidates(requested: TextureFormat) -> Vec<TextureFormat> {
    let mut candidates = vec![requested];
    for fallback in [TextureFormat::D32_FLOAT_S8_UINT, TextureFormat::D24_UNORM_S8_UINT] {
        if !candidates.contains(&fallback) {
            candidates.push(fallback);
        }
    }
    candidates
}

// ===== RESOURCE STATES =====

/// Layout an image is in while in `state`
///
/// `Common` has no Vulkan counterpart: as a source it is `UNDEFINED`
/// (contents are discarded), as a destination it is `GENERAL`.
/// `Present` as a source is also `UNDEFINED`: an acquired image is not
/// guaranteed to be in `PRESENT_SRC_KHR`, and every frame clears it.
pub(crate) fn state_to_layout(state: ResourceState, is_source: bool) -> vk::ImageLayout {
    match state {
        ResourceState::Common | ResourceState::Present if is_source => vk::ImageLayout::UNDEFINED,
        ResourceState::Common => vk::ImageLayout::GENERAL,
        ResourceState::Present => vk::ImageLayout::PRESENT_SRC_KHR,
        ResourceState::RenderTarget => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ResourceState::DepthWrite => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    }
}

/// Whether a transition needs a Vulkan image barrier
///
/// Moving into `Present` from an undefined layout only happens to swapchain
/// images that are not acquired yet, which must not be touched.
pub(crate) fn needs_image_barrier(before: ResourceState, after: ResourceState) -> bool {
    if before == after {
        return false;
    }
    !(after == ResourceState::Present && state_to_layout(before, true) == vk::ImageLayout::UNDEFINED)
}

pub(crate) fn state_to_access(state: ResourceState) -> vk::AccessFlags {
    match state {
        ResourceState::Common | ResourceState::Present => vk::AccessFlags::empty(),
        ResourceState::RenderTarget => {
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
        }
        ResourceState::DepthWrite => {
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE
        }
    }
}

pub(crate) fn state_to_stage(state: ResourceState, is_source: bool) -> vk::PipelineStageFlags {
    match state {
        ResourceState::Common | ResourceState::Present => {
            if is_source {
                vk::PipelineStageFlags::TOP_OF_PIPE
            } else {
                vk::PipelineStageFlags::BOTTOM_OF_PIPE
            }
        }
        ResourceState::RenderTarget => vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ResourceState::DepthWrite => {
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
                | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS
        }
    }
}

/// Memory barrier between two rendering scopes on the same color attachment
///
/// Consecutive dynamic-rendering scopes are not ordered against each other:
/// the STORE of one must be made visible to the LOAD of the next. Both sides
/// are in the COLOR_ATTACHMENT_OUTPUT stage.
pub(crate) fn color_attachment_barrier() -> vk::MemoryBarrier<'static> {
    vk::MemoryBarrier::default()
        .src_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
        .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
}

// ===== SWAPCHAIN SELECTION =====

/// Present mode for a sync interval
///
/// Interval 0 asks for no vsync: IMMEDIATE if available, then MAILBOX.
/// Anything else, or no tearing mode available, is FIFO (always supported).
pub(crate) fn choose_present_mode(
    sync_interval: u32,
    available: &[vk::PresentModeKHR],
) -> vk::PresentModeKHR {
    if sync_interval == 0 {
        for preferred in [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX] {
            if available.contains(&preferred) {
                return preferred;
            }
        }
    }
    vk::PresentModeKHR::FIFO
}

/// Surface format matching `requested`, else the first one the surface offers
pub(crate) fn choose_surface_format(
    requested: vk::Format,
    available: &[vk::SurfaceFormatKHR],
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| f.format == requested)
        .or_else(|| available.first())
        .copied()
}

/// Requested image count clamped to what the surface allows (max 0 means unbounded)
pub(crate) fn clamp_image_count(requested: u32, caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = requested.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// Swapchain extent: the surface's current extent when it dictates one,
/// otherwise the requested size (or the window size for 0x0) clamped to the limits
pub(crate) fn choose_extent(
    requested: (u32, u32),
    window_size: (u32, u32),
    caps: &vk::SurfaceCapabilitiesKHR,
) -> vk::Extent2D {
    let (width, height) = if requested == (0, 0) { window_size } else { requested };

    if requested == (0, 0) && caps.current_extent.width != u32::MAX {
        return caps.current_extent;
    }

    vk::Extent2D {
        width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width.max(caps.min_image_extent.width)),
        height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height.max(caps.min_image_extent.height)),
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;

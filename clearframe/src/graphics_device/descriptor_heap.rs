/// DescriptorHeap trait - CPU-visible render-target and depth-stencil views

use crate::error::Result;
use crate::graphics_device::Texture;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorHeapType {
    /// Render-target views
    Rtv,
    /// Depth-stencil views
    Dsv,
}

/// A view slot inside a descriptor heap
///
/// `raw` is backend-defined (the Vulkan backend stores the image view handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorHandle {
    pub heap_type: DescriptorHeapType,
    pub index: u32,
    pub raw: u64,
}

/// Fixed-capacity array of views
pub trait DescriptorHeap: Send {
    fn heap_type(&self) -> DescriptorHeapType;

    fn capacity(&self) -> u32;

    /// Create (or replace) the view at `index` for `texture`
    ///
    /// Fails with `Error::InvalidResource` if `index >= capacity()`.
    fn create_view(&mut self, index: u32, texture: &dyn Texture) -> Result<DescriptorHandle>;

    /// Handle of an already created view
    fn handle(&self, index: u32) -> Option<DescriptorHandle>;
}

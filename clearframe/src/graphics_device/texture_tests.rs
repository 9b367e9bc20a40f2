//! Unit tests for texture.rs

use crate::graphics_device::{ClearValue, ResourceHandle, TextureFormat};

#[test]
fn test_depth_formats() {
    assert!(TextureFormat::D32_FLOAT.is_depth());
    assert!(TextureFormat::D24_UNORM_S8_UINT.is_depth());
    assert!(TextureFormat::D32_FLOAT_S8_UINT.is_depth());
    assert!(!TextureFormat::B8G8R8A8_UNORM.is_depth());
    assert!(!TextureFormat::R8G8B8A8_SRGB.is_depth());
}

#[test]
fn test_stencil_formats() {
    assert!(TextureFormat::D24_UNORM_S8_UINT.has_stencil());
    assert!(TextureFormat::D32_FLOAT_S8_UINT.has_stencil());
    assert!(!TextureFormat::D32_FLOAT.has_stencil());
    assert!(!TextureFormat::B8G8R8A8_UNORM.has_stencil());
}

#[test]
fn test_resource_handle_ordering_and_equality() {
    assert_eq!(ResourceHandle(3), ResourceHandle(3));
    assert!(ResourceHandle(1) < ResourceHandle(2));
}

#[test]
fn test_clear_value_depth_stencil() {
    let value = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };
    assert_eq!(value, ClearValue::DepthStencil { depth: 1.0, stencil: 0 });
    assert_ne!(value, ClearValue::Color([0.0; 4]));
}

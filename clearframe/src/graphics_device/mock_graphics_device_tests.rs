/// Unit tests for MockGraphicsDevice and the mock object types
///
/// The mock is the reference the renderer tests rely on, so its checks
/// (barrier pairing, closed-list guards, fence simulation) are tested here.

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    DepthStencilDesc, DescriptorHeapType, GraphicsDevice, ResourceBarrier, ResourceState,
    SwapchainDesc, TextureFormat, Viewport,
};

fn swapchain_desc() -> SwapchainDesc {
    SwapchainDesc {
        width: 0,
        height: 0,
        buffer_count: 2,
        format: TextureFormat::B8G8R8A8_UNORM,
        sync_interval: 0,
    }
}

// ============================================================================
// Swapchain Tests
// ============================================================================

#[test]
fn test_swapchain_matches_window_size() {
    let mut device = MockGraphicsDevice::new(800, 600);
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    assert_eq!(swapchain.width(), 800);
    assert_eq!(swapchain.height(), 600);
    assert_eq!(swapchain.buffer_count(), 2);
    assert_eq!(swapchain.format(), TextureFormat::B8G8R8A8_UNORM);
}

#[test]
fn test_swapchain_explicit_size() {
    let mut device = MockGraphicsDevice::new(800, 600);
    let desc = SwapchainDesc { width: 320, height: 200, ..swapchain_desc() };
    let swapchain = device.create_swapchain(&desc).unwrap();
    assert_eq!((swapchain.width(), swapchain.height()), (320, 200));
}

#[test]
fn test_swapchain_buffers_start_common() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let recorder = device.recorder();
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();

    let rec = recorder.lock().unwrap();
    assert_eq!(rec.color_buffers.len(), 2);
    for index in 0..2 {
        let handle = swapchain.buffer(index).unwrap().handle();
        assert_eq!(rec.state_of(handle), Some(ResourceState::Common));
    }
    assert!(swapchain.buffer(2).is_err());
}

#[test]
fn test_sequential_acquire() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let mut swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let indices: Vec<u32> = (0..5).map(|_| swapchain.acquire_next_buffer().unwrap()).collect();
    assert_eq!(indices, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_acquire_override_is_used_once() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let recorder = device.recorder();
    let mut swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    recorder.lock().unwrap().acquire_override = Some(1);
    assert_eq!(swapchain.acquire_next_buffer().unwrap(), 1);
    assert_eq!(swapchain.acquire_next_buffer().unwrap(), 0);
}

#[test]
fn test_present_requires_present_state() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let mut swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    // Buffers are still Common
    assert!(matches!(swapchain.present(0), Err(Error::InvalidState(_))));
}

// ============================================================================
// CommandList Tests
// ============================================================================

#[test]
fn test_command_list_starts_closed() {
    let mut device = MockGraphicsDevice::new(64, 64);
    assert!(!device.command_list().is_recording());
    let result = device.command_list().set_viewport(Viewport::full(64, 64));
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_barrier_updates_tracked_state() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let recorder = device.recorder();
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let buffer = swapchain.buffer(0).unwrap();

    device.command_list().reset().unwrap();
    device
        .command_list()
        .resource_barrier(&[ResourceBarrier::transition(buffer, ResourceState::Common, ResourceState::Present)])
        .unwrap();

    assert_eq!(recorder.lock().unwrap().state_of(buffer.handle()), Some(ResourceState::Present));
}

#[test]
fn test_barrier_with_wrong_before_state_fails() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let buffer = swapchain.buffer(0).unwrap();

    device.command_list().reset().unwrap();
    let result = device
        .command_list()
        .resource_barrier(&[ResourceBarrier::transition(buffer, ResourceState::Present, ResourceState::RenderTarget)]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[test]
fn test_close_rejects_color_buffer_left_in_render_target() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let buffer = swapchain.buffer(1).unwrap();

    let cmd = device.command_list();
    cmd.reset().unwrap();
    cmd.resource_barrier(&[ResourceBarrier::transition(buffer, ResourceState::Common, ResourceState::RenderTarget)])
        .unwrap();
    assert!(matches!(cmd.close(), Err(Error::InvalidState(_))));

    cmd.resource_barrier(&[ResourceBarrier::transition(buffer, ResourceState::RenderTarget, ResourceState::Present)])
        .unwrap();
    assert!(cmd.close().is_ok());
    assert!(!cmd.is_recording());
}

#[test]
fn test_clear_requires_render_target_state() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let mut heap = device.create_descriptor_heap(DescriptorHeapType::Rtv, 2).unwrap();
    let rtv = heap.create_view(0, swapchain.buffer(0).unwrap()).unwrap();

    device.command_list().reset().unwrap();
    let result = device.command_list().clear_render_target_view(rtv, [0.0; 4]);
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

// ============================================================================
// DescriptorHeap Tests
// ============================================================================

#[test]
fn test_descriptor_heap_views() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let swapchain = device.create_swapchain(&swapchain_desc()).unwrap();
    let mut heap = device.create_descriptor_heap(DescriptorHeapType::Rtv, 2).unwrap();

    assert_eq!(heap.heap_type(), DescriptorHeapType::Rtv);
    assert_eq!(heap.capacity(), 2);
    assert!(heap.handle(0).is_none());

    let handle = heap.create_view(1, swapchain.buffer(1).unwrap()).unwrap();
    assert_eq!(handle.index, 1);
    assert_eq!(handle.raw, swapchain.buffer(1).unwrap().handle().0);
    assert_eq!(heap.handle(1), Some(handle));

    let out_of_range = heap.create_view(2, swapchain.buffer(0).unwrap());
    assert!(matches!(out_of_range, Err(Error::InvalidResource(_))));
}

// ============================================================================
// Depth/Stencil Tests
// ============================================================================

#[test]
fn test_depth_stencil_carries_clear_value() {
    let mut device = MockGraphicsDevice::new(64, 64);
    let depth = device
        .create_depth_stencil(&DepthStencilDesc {
            width: 64,
            height: 32,
            format: TextureFormat::D24_UNORM_S8_UINT,
            clear_depth: 1.0,
            clear_stencil: 0,
        })
        .unwrap();
    let info = depth.info();
    assert_eq!((info.width, info.height), (64, 32));
    assert_eq!(
        info.clear_value,
        Some(crate::graphics_device::ClearValue::DepthStencil { depth: 1.0, stencil: 0 })
    );
}

// ============================================================================
// Fence Tests
// ============================================================================

#[test]
fn test_fence_lags_until_waited() {
    let mut device = MockGraphicsDevice::new(64, 64);
    device.signal(1).unwrap();
    assert_eq!(device.completed_value().unwrap(), 0);
    device.wait_for_value(1).unwrap();
    assert_eq!(device.completed_value().unwrap(), 1);
}

#[test]
fn test_stalled_fence_does_not_advance() {
    let mut device = MockGraphicsDevice::new(64, 64);
    device.recorder().lock().unwrap().stall_fence = true;
    device.signal(1).unwrap();
    device.wait_for_value(1).unwrap();
    assert_eq!(device.completed_value().unwrap(), 0);
}

#[test]
fn test_reset_rejected_while_gpu_busy() {
    let mut device = MockGraphicsDevice::new(64, 64);
    device.signal(1).unwrap();
    assert!(matches!(device.command_list().reset(), Err(Error::InvalidState(_))));
}

#[test]
fn test_failure_injection() {
    let mut device = MockGraphicsDevice::new(64, 64);
    device.recorder().lock().unwrap().fail_on = Some(MockFailure::Signal);
    assert!(matches!(device.signal(1), Err(Error::BackendError(_))));
    assert!(device.wait_for_value(1).is_ok());
}

#[test]
fn test_execute_rejects_open_list() {
    let mut device = MockGraphicsDevice::new(64, 64);
    device.command_list().reset().unwrap();
    assert!(matches!(device.execute_command_list(), Err(Error::InvalidState(_))));
    device.command_list().close().unwrap();
    assert!(device.execute_command_list().is_ok());
}

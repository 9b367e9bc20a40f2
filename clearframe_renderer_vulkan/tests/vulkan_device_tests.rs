//! Integration tests for VulkanGraphicsDevice
//!
//! These tests verify that VulkanGraphicsDevice correctly implements the GraphicsDevice
//! trait and drives the renderer end to end. All tests require a GPU and are marked
//! with #[ignore].
//!
//! Run with: cargo test --test vulkan_device_tests -- --ignored
//! (add `--features vulkan-validation` for the synchronization-validation case)

use clearframe::cf::render::{
    ClearValue, DepthStencilDesc, DescriptorHeapType, GraphicsDevice, TextureFormat,
};
use clearframe::cf::scene::EmptyScene;
use clearframe::cf::{Config, Error, Renderer, DEPTH_STENCIL_FORMAT};
#[cfg(feature = "vulkan-validation")]
use clearframe::cf::DebugSeverity;
#[cfg(feature = "vulkan-validation")]
use clearframe_renderer_vulkan::get_validation_stats;
use clearframe_renderer_vulkan::VulkanGraphicsDevice;
use serial_test::serial;
use std::sync::OnceLock;
use winit::event_loop::EventLoop;
use winit::window::Window;

#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
#[cfg(target_os = "linux")]
use winit::platform::x11::EventLoopBuilderExtX11;

/// Hidden window shared by all tests (a process may only create one event loop)
static TEST_WINDOW: OnceLock<Window> = OnceLock::new();

/// Get the shared test window
///
/// The event loop is intentionally leaked with mem::forget to keep the window valid,
/// since an EventLoop cannot be stored in a static.
#[allow(deprecated)]
fn test_window() -> &'static Window {
    TEST_WINDOW.get_or_init(|| {
        let mut builder = EventLoop::builder();
        // Tests do not run on the main thread
        #[cfg(any(target_os = "windows", target_os = "linux"))]
        builder.with_any_thread(true);
        let event_loop = builder.build().unwrap();

        let window_attrs = Window::default_attributes()
            .with_title("Clearframe GPU Test")
            .with_inner_size(winit::dpi::PhysicalSize::new(800, 600))
            .with_resizable(false)
            .with_visible(false); // Hidden window for tests
        let window = event_loop.create_window(window_attrs).unwrap();
        std::mem::forget(event_loop);
        window
    })
}

/// Create a fresh device on the shared window
///
/// Each test owns its device (and so its surface): the renderer takes the
/// device by value, and a device only ever creates one swapchain. Tests are
/// `#[serial]`, so the previous device and its surface are destroyed before
/// the next surface is created on the window. The window and its event loop
/// are the part that must not be created twice.
fn create_device() -> VulkanGraphicsDevice {
    create_device_with(Config::default())
}

fn create_device_with(config: Config) -> VulkanGraphicsDevice {
    VulkanGraphicsDevice::new(test_window(), config).unwrap()
}

// ============================================================================
// DEVICE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_device_creation() {
    let device = create_device();
    assert!(!device.adapter_name().is_empty());
    assert_eq!(device.completed_value().unwrap(), 0);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_fence_signal_and_wait() {
    let mut device = create_device();
    device.signal(1).unwrap();
    device.wait_for_value(1).unwrap();
    assert_eq!(device.completed_value().unwrap(), 1);

    device.signal(2).unwrap();
    device.wait_for_value(2).unwrap();
    assert_eq!(device.completed_value().unwrap(), 2);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_empty_command_list_executes() {
    let mut device = create_device();
    device.command_list().reset().unwrap();
    assert!(device.command_list().is_recording());
    assert!(matches!(device.execute_command_list(), Err(Error::InvalidState(_))));

    device.command_list().close().unwrap();
    device.execute_command_list().unwrap();
    device.signal(1).unwrap();
    device.wait_for_value(1).unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_device_recreated_on_same_window() {
    let first = create_device();
    let adapter = first.adapter_name();
    drop(first);

    // The first surface is gone, so the window can take a new one
    let mut second = create_device();
    assert_eq!(second.adapter_name(), adapter);
    let swapchain = second.create_swapchain(&Config::default().surface_desc()).unwrap();
    assert_eq!((swapchain.width(), swapchain.height()), (800, 600));
}

// ============================================================================
// SWAPCHAIN TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_swapchain_matches_window() {
    let mut device = create_device();
    let swapchain = device.create_swapchain(&Config::default().surface_desc()).unwrap();

    assert_eq!((swapchain.width(), swapchain.height()), (800, 600));
    assert!(swapchain.buffer_count() >= 2);
    for index in 0..swapchain.buffer_count() {
        let info = swapchain.buffer(index).unwrap().info();
        assert_eq!((info.width, info.height), (800, 600));
        assert!(!info.format.is_depth());
    }
    assert!(swapchain.buffer(swapchain.buffer_count()).is_err());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_second_swapchain_rejected() {
    let mut device = create_device();
    let _swapchain = device.create_swapchain(&Config::default().surface_desc()).unwrap();
    let second = device.create_swapchain(&Config::default().surface_desc());
    assert!(matches!(second, Err(Error::InvalidState(_))));
}

// ============================================================================
// DEPTH/STENCIL AND VIEW TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_create_depth_stencil() {
    let mut device = create_device();
    let depth = device
        .create_depth_stencil(&DepthStencilDesc {
            width: 800,
            height: 600,
            format: DEPTH_STENCIL_FORMAT,
            clear_depth: 1.0,
            clear_stencil: 0,
        })
        .unwrap();

    let info = depth.info();
    assert_eq!((info.width, info.height), (800, 600));
    assert!(info.format.has_stencil());
    assert_eq!(info.clear_value, Some(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }));

    let mut heap = device.create_descriptor_heap(DescriptorHeapType::Dsv, 1).unwrap();
    let handle = heap.create_view(0, depth.as_ref()).unwrap();
    assert_ne!(handle.raw, 0);
    assert_eq!(heap.handle(0), Some(handle));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_color_format_rejected_by_depth_heap() {
    let mut device = create_device();
    let swapchain = device.create_swapchain(&Config::default().surface_desc()).unwrap();
    let mut heap = device.create_descriptor_heap(DescriptorHeapType::Dsv, 1).unwrap();
    let result = heap.create_view(0, swapchain.buffer(0).unwrap());
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_depth_format_must_be_depth() {
    let mut device = create_device();
    let result = device.create_depth_stencil(&DepthStencilDesc {
        width: 16,
        height: 16,
        format: TextureFormat::R8G8B8A8_UNORM,
        clear_depth: 1.0,
        clear_stencil: 0,
    });
    assert!(result.is_err());
}

// ============================================================================
// END-TO-END TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_renderer_presents_frames() {
    let config = Config::default();
    let mut renderer = Renderer::new(&config);
    renderer.initialize(Box::new(create_device()), &config).unwrap();

    let buffer_count = renderer.surface().unwrap().buffer_count();
    for _ in 0..3 {
        renderer.render_frame(&mut EmptyScene).unwrap();
    }

    assert_eq!(renderer.frames_rendered(), 3);
    // Initial transition flush plus one flush per frame
    assert_eq!(renderer.device_context().unwrap().fence_value(), 4);
    assert!(renderer.surface().unwrap().back_buffer_index() < buffer_count);

    renderer.shutdown().unwrap();
    assert!(!renderer.is_initialized());
}

#[cfg(feature = "vulkan-validation")]
#[test]
#[ignore] // Requires GPU and the Khronos validation layer
#[serial]
fn test_vulkan_frames_free_of_sync_hazards() {
    let config = Config {
        enable_validation: true,
        sync_validation: true,
        debug_severity: DebugSeverity::ErrorsAndWarnings,
        ..Config::default()
    };
    let mut renderer = Renderer::new(&config);
    renderer.initialize(Box::new(create_device_with(config.clone())), &config).unwrap();

    // Enough frames to reuse every swapchain image
    for _ in 0..6 {
        renderer.render_frame(&mut EmptyScene).unwrap();
    }
    renderer.shutdown().unwrap();

    // Clear then load of the back buffer must not be reported as a hazard
    let stats = get_validation_stats();
    assert_eq!(stats.errors, 0, "validation reported {} error(s)", stats.errors);
}

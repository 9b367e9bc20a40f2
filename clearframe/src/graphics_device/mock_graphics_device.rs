/// Mock graphics device for unit tests (no GPU required)
///
/// Every object created by a `MockGraphicsDevice` shares one `MockRecorder`.
/// Tests keep a clone of the recorder to inspect recorded commands, resource
/// states, fence traffic and presents, and to inject failures.

use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    ClearValue, CommandList, DepthStencilDesc, DescriptorHandle, DescriptorHeap,
    DescriptorHeapType, GraphicsDevice, Rect2D, ResourceBarrier, ResourceHandle, ResourceState,
    Swapchain, SwapchainDesc, Texture, TextureFormat, TextureInfo, Viewport,
};

// ============================================================================
// Recorder
// ============================================================================

/// Operations that can be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    CreateSwapchain,
    CreateDescriptorHeap,
    CreateDepthStencil,
    Reset,
    Close,
    Execute,
    Signal,
    Wait,
    Acquire,
    Present,
}

/// A recorded command list entry
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Reset,
    Barrier(ResourceBarrier),
    SetViewport(Viewport),
    SetScissor(Rect2D),
    Clear { resource: ResourceHandle, color: [f32; 4] },
    SetRenderTargets { rtvs: Vec<ResourceHandle>, dsv: Option<ResourceHandle> },
    Close,
}

/// Shared state of a mock device and everything it created
#[derive(Debug)]
pub struct MockRecorder {
    pub commands: Vec<MockCommand>,
    pub resource_states: FxHashMap<ResourceHandle, ResourceState>,
    pub color_buffers: Vec<ResourceHandle>,
    pub executions: u32,
    pub signals: Vec<u64>,
    pub waits: Vec<u64>,
    pub acquires: Vec<u32>,
    pub presents: Vec<u32>,
    /// Last fence value the simulated GPU reached
    pub completed_value: u64,
    /// When set, waits return without the fence advancing
    pub stall_fence: bool,
    pub fail_on: Option<MockFailure>,
    /// Client area reported for `matches_window` swapchains
    pub window_size: (u32, u32),
    /// Buffer count the swapchain creates regardless of the request
    pub forced_buffer_count: Option<u32>,
    /// Index the next acquire returns instead of the sequential one
    pub acquire_override: Option<u32>,
    next_handle: u64,
}

impl MockRecorder {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            commands: Vec::new(),
            resource_states: FxHashMap::default(),
            color_buffers: Vec::new(),
            executions: 0,
            signals: Vec::new(),
            waits: Vec::new(),
            acquires: Vec::new(),
            presents: Vec::new(),
            completed_value: 0,
            stall_fence: false,
            fail_on: None,
            window_size: (window_width, window_height),
            forced_buffer_count: None,
            acquire_override: None,
            next_handle: 1,
        }
    }

    fn allocate_handle(&mut self) -> ResourceHandle {
        let handle = ResourceHandle(self.next_handle);
        self.next_handle += 1;
        self.resource_states.insert(handle, ResourceState::Common);
        handle
    }

    fn check(&self, op: MockFailure) -> Result<()> {
        if self.fail_on == Some(op) {
            return Err(Error::BackendError(format!("mock failure: {:?}", op)));
        }
        Ok(())
    }

    pub fn state_of(&self, handle: ResourceHandle) -> Option<ResourceState> {
        self.resource_states.get(&handle).copied()
    }

    /// Commands recorded since the last `Reset`
    pub fn commands_since_last_reset(&self) -> &[MockCommand] {
        let start = self
            .commands
            .iter()
            .rposition(|c| *c == MockCommand::Reset)
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.commands[start..]
    }
}

pub type SharedRecorder = Arc<Mutex<MockRecorder>>;

fn lock(recorder: &SharedRecorder) -> MutexGuard<'_, MockRecorder> {
    recorder.lock().unwrap()
}

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
    pub handle: ResourceHandle,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn handle(&self) -> ResourceHandle {
        self.handle
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    recorder: SharedRecorder,
    recording: bool,
}

impl MockCommandList {
    fn require_recording(&self, what: &str) -> Result<()> {
        if !self.recording {
            return Err(Error::InvalidState(format!("{} on a closed command list", what)));
        }
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn reset(&mut self) -> Result<()> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Reset)?;
        // Resetting the allocator while the GPU still owns its memory is a bug
        if rec.signals.last().copied().unwrap_or(0) > rec.completed_value {
            return Err(Error::InvalidState("command allocator reset while GPU work is in flight".to_string()));
        }
        rec.commands.push(MockCommand::Reset);
        self.recording = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.require_recording("close")?;
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Close)?;
        let stranded: Vec<ResourceHandle> = rec
            .color_buffers
            .iter()
            .copied()
            .filter(|h| rec.state_of(*h) == Some(ResourceState::RenderTarget))
            .collect();
        if !stranded.is_empty() {
            return Err(Error::InvalidState(format!(
                "command list closed with color buffers in RenderTarget: {:?}",
                stranded
            )));
        }
        rec.commands.push(MockCommand::Close);
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrier]) -> Result<()> {
        self.require_recording("resource_barrier")?;
        let mut rec = lock(&self.recorder);
        for barrier in barriers {
            let current = rec.state_of(barrier.resource).ok_or_else(|| {
                Error::InvalidResource(format!("unknown resource {:?}", barrier.resource))
            })?;
            if current != barrier.before {
                return Err(Error::InvalidState(format!(
                    "barrier expects {:?} in {:?} but it is in {:?}",
                    barrier.resource, barrier.before, current
                )));
            }
            rec.resource_states.insert(barrier.resource, barrier.after);
            rec.commands.push(MockCommand::Barrier(*barrier));
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.require_recording("set_viewport")?;
        lock(&self.recorder).commands.push(MockCommand::SetViewport(viewport));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.require_recording("set_scissor")?;
        lock(&self.recorder).commands.push(MockCommand::SetScissor(scissor));
        Ok(())
    }

    fn clear_render_target_view(&mut self, rtv: DescriptorHandle, color: [f32; 4]) -> Result<()> {
        self.require_recording("clear_render_target_view")?;
        let mut rec = lock(&self.recorder);
        let resource = ResourceHandle(rtv.raw);
        if rec.state_of(resource) != Some(ResourceState::RenderTarget) {
            return Err(Error::InvalidState(format!(
                "clear of {:?} outside RenderTarget state",
                resource
            )));
        }
        rec.commands.push(MockCommand::Clear { resource, color });
        Ok(())
    }

    fn set_render_targets(
        &mut self,
        rtvs: &[DescriptorHandle],
        dsv: Option<DescriptorHandle>,
    ) -> Result<()> {
        self.require_recording("set_render_targets")?;
        lock(&self.recorder).commands.push(MockCommand::SetRenderTargets {
            rtvs: rtvs.iter().map(|h| ResourceHandle(h.raw)).collect(),
            dsv: dsv.map(|h| ResourceHandle(h.raw)),
        });
        Ok(())
    }
}

// ============================================================================
// Mock DescriptorHeap
// ============================================================================

pub struct MockDescriptorHeap {
    heap_type: DescriptorHeapType,
    views: Vec<Option<DescriptorHandle>>,
}

impl DescriptorHeap for MockDescriptorHeap {
    fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    fn capacity(&self) -> u32 {
        self.views.len() as u32
    }

    fn create_view(&mut self, index: u32, texture: &dyn Texture) -> Result<DescriptorHandle> {
        let slot = self.views.get_mut(index as usize).ok_or_else(|| {
            Error::InvalidResource(format!("descriptor index {} out of range", index))
        })?;
        let handle = DescriptorHandle {
            heap_type: self.heap_type,
            index,
            raw: texture.handle().0,
        };
        *slot = Some(handle);
        Ok(handle)
    }

    fn handle(&self, index: u32) -> Option<DescriptorHandle> {
        self.views.get(index as usize).copied().flatten()
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    recorder: SharedRecorder,
    buffers: Vec<MockTexture>,
    width: u32,
    height: u32,
    format: TextureFormat,
    next_buffer: u32,
}

impl Swapchain for MockSwapchain {
    fn buffer_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn buffer(&self, index: u32) -> Result<&dyn Texture> {
        self.buffers
            .get(index as usize)
            .map(|b| b as &dyn Texture)
            .ok_or_else(|| Error::InvalidResource(format!("swapchain buffer {} out of range", index)))
    }

    fn acquire_next_buffer(&mut self) -> Result<u32> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Acquire)?;
        let index = rec.acquire_override.take().unwrap_or(self.next_buffer);
        self.next_buffer = (index + 1) % self.buffers.len() as u32;
        rec.acquires.push(index);
        Ok(index)
    }

    fn present(&mut self, index: u32) -> Result<()> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Present)?;
        let handle = self
            .buffers
            .get(index as usize)
            .map(|b| b.handle)
            .ok_or_else(|| Error::InvalidResource(format!("present of unknown buffer {}", index)))?;
        if rec.state_of(handle) != Some(ResourceState::Present) {
            return Err(Error::InvalidState(format!("present of buffer {} not in Present state", index)));
        }
        rec.presents.push(index);
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    recorder: SharedRecorder,
    command_list: MockCommandList,
}

impl MockGraphicsDevice {
    /// Device whose window client area is `window_width` x `window_height`
    pub fn new(window_width: u32, window_height: u32) -> Self {
        let recorder = Arc::new(Mutex::new(MockRecorder::new(window_width, window_height)));
        Self {
            command_list: MockCommandList {
                recorder: Arc::clone(&recorder),
                recording: false,
            },
            recorder,
        }
    }

    pub fn recorder(&self) -> SharedRecorder {
        Arc::clone(&self.recorder)
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::CreateSwapchain)?;
        let (width, height) = if desc.matches_window() {
            rec.window_size
        } else {
            (desc.width, desc.height)
        };
        let count = rec.forced_buffer_count.unwrap_or(desc.buffer_count);
        let mut buffers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let handle = rec.allocate_handle();
            rec.color_buffers.push(handle);
            buffers.push(MockTexture {
                info: TextureInfo { width, height, format: desc.format, clear_value: None },
                handle,
            });
        }
        Ok(Box::new(MockSwapchain {
            recorder: Arc::clone(&self.recorder),
            buffers,
            width,
            height,
            format: desc.format,
            next_buffer: 0,
        }))
    }

    fn create_descriptor_heap(
        &mut self,
        heap_type: DescriptorHeapType,
        capacity: u32,
    ) -> Result<Box<dyn DescriptorHeap>> {
        lock(&self.recorder).check(MockFailure::CreateDescriptorHeap)?;
        Ok(Box::new(MockDescriptorHeap {
            heap_type,
            views: vec![None; capacity as usize],
        }))
    }

    fn create_depth_stencil(&mut self, desc: &DepthStencilDesc) -> Result<Box<dyn Texture>> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::CreateDepthStencil)?;
        let handle = rec.allocate_handle();
        Ok(Box::new(MockTexture {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                clear_value: Some(ClearValue::DepthStencil {
                    depth: desc.clear_depth,
                    stencil: desc.clear_stencil,
                }),
            },
            handle,
        }))
    }

    fn command_list(&mut self) -> &mut dyn CommandList {
        &mut self.command_list
    }

    fn execute_command_list(&mut self) -> Result<()> {
        if self.command_list.recording {
            return Err(Error::InvalidState("execute of an open command list".to_string()));
        }
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Execute)?;
        rec.executions += 1;
        Ok(())
    }

    fn signal(&mut self, value: u64) -> Result<()> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Signal)?;
        rec.signals.push(value);
        Ok(())
    }

    fn completed_value(&self) -> Result<u64> {
        Ok(lock(&self.recorder).completed_value)
    }

    fn wait_for_value(&mut self, value: u64) -> Result<()> {
        let mut rec = lock(&self.recorder);
        rec.check(MockFailure::Wait)?;
        rec.waits.push(value);
        if !rec.stall_fence && rec.signals.contains(&value) {
            rec.completed_value = rec.completed_value.max(value);
        }
        Ok(())
    }

    fn adapter_name(&self) -> String {
        "Mock Adapter".to_string()
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;

//! Recording panel libraries for host tests and simulators
//!
//! [`MockEpdiy`] and [`MockFastEpd`] implement the native library traits
//! without hardware. Every native call is appended to a shared [`CallLog`],
//! which also carries the fault knobs, so a test keeps its own handle to the
//! log after the mock has moved into the device.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::Backend;
use crate::backend::epdiy::Epdiy;
use crate::backend::fastepd::{FastEpd, FastEpdMode};
use crate::config::{DrawMode, PanelId, RenderMode};
use crate::error::Error;
use crate::hal::{Compositor, SurfaceSpec, TouchDevice};
use crate::rect::Rect;
use crate::rotation::{EpdiyRotation, Rotation};
use crate::sink::FrameSink;
use crate::transcode::PixelFormat;

/// Native width of the mock panels, landscape
pub const MOCK_WIDTH: u16 = 960;
/// Native height of the mock panels, landscape
pub const MOCK_HEIGHT: u16 = 540;

/// One recorded native call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    /// EPDiy `init`
    Init { code: i32 },
    /// FastEPD `init_panel`
    InitPanel { code: i32, bus_speed_hz: u32 },
    HlInit,
    Deinit,
    /// Native rotation: EPDiy enum discriminant or FastEPD degrees
    SetRotation(i32),
    SetMode(FastEpdMode),
    SetPasses { partial: u8, full: u8 },
    DrawPixel { x: i32, y: i32, color: u8 },
    Clear,
    ClearArea(Rect),
    SetAllWhite,
    Fill(u8),
    FillRect { area: Rect, color: u8 },
    UpdateScreen { mode: u32, temperature: i32 },
    UpdateArea { mode: u32, temperature: i32, area: Rect },
    FullUpdate { clear_mode: u32, keep_on: bool, area: Option<Rect> },
    PartialUpdate { keep_on: bool, start_row: u16, end_row: u16 },
    PowerOn,
    PowerOff,
}

/// Failure the mock libraries can be told to report
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockError {
    Init,
    Alloc,
    Refresh,
}

#[derive(Default)]
struct LogInner {
    calls: Vec<Call>,
    fail_init: bool,
    fail_alloc: bool,
    fail_refresh: bool,
}

/// Shared record of native calls plus fault injection
#[derive(Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<LogInner>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, call: Call) {
        self.lock().calls.push(call);
    }

    /// Snapshot of every call so far
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().calls.is_empty()
    }

    /// Forget recorded calls; injected failures stay set
    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    /// Last color drawn at `(x, y)`, if any
    pub fn last_pixel(&self, x: i32, y: i32) -> Option<u8> {
        self.lock().calls.iter().rev().find_map(|call| match *call {
            Call::DrawPixel { x: px, y: py, color } if px == x && py == y => Some(color),
            _ => None,
        })
    }

    /// Make panel init fail
    pub fn set_fail_init(&self, fail: bool) {
        self.lock().fail_init = fail;
    }

    /// Make framebuffer allocation fail
    pub fn set_fail_alloc(&self, fail: bool) {
        self.lock().fail_alloc = fail;
    }

    /// Make every refresh fail
    pub fn set_fail_refresh(&self, fail: bool) {
        self.lock().fail_refresh = fail;
    }

    fn check(&self, error: MockError) -> Result<(), MockError> {
        let inner = self.lock();
        let fail = match error {
            MockError::Init => inner.fail_init,
            MockError::Alloc => inner.fail_alloc,
            MockError::Refresh => inner.fail_refresh,
        };
        if fail { Err(error) } else { Ok(()) }
    }
}

/// EPDiy library double, [`MOCK_WIDTH`] x [`MOCK_HEIGHT`] native
pub struct MockEpdiy {
    log: CallLog,
    rotation: EpdiyRotation,
}

impl MockEpdiy {
    /// A panel that records into `log`
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            rotation: EpdiyRotation::Landscape,
        }
    }

    fn portrait(&self) -> bool {
        matches!(
            self.rotation,
            EpdiyRotation::Portrait | EpdiyRotation::InvertedPortrait
        )
    }
}

impl Epdiy for MockEpdiy {
    type Error = MockError;

    fn init(&mut self, panel: &PanelId) {
        self.log.push(Call::Init { code: panel.code });
    }

    fn deinit(&mut self) {
        self.log.push(Call::Deinit);
    }

    fn set_rotation(&mut self, rotation: EpdiyRotation) {
        self.rotation = rotation;
        self.log.push(Call::SetRotation(rotation as i32));
    }

    fn hl_init(&mut self) -> Result<(), MockError> {
        self.log.push(Call::HlInit);
        self.log.check(MockError::Alloc)
    }

    fn width(&self) -> u16 {
        MOCK_WIDTH
    }

    fn height(&self) -> u16 {
        MOCK_HEIGHT
    }

    fn rotated_width(&self) -> u16 {
        if self.portrait() { MOCK_HEIGHT } else { MOCK_WIDTH }
    }

    fn rotated_height(&self) -> u16 {
        if self.portrait() { MOCK_WIDTH } else { MOCK_HEIGHT }
    }

    fn draw_pixel(&mut self, x: i32, y: i32, color: u8) {
        self.log.push(Call::DrawPixel { x, y, color });
    }

    fn clear(&mut self) {
        self.log.push(Call::Clear);
    }

    fn clear_area(&mut self, area: Rect) {
        self.log.push(Call::ClearArea(area));
    }

    fn set_all_white(&mut self) {
        self.log.push(Call::SetAllWhite);
    }

    fn fill(&mut self, color: u8) {
        self.log.push(Call::Fill(color));
    }

    fn update_screen(&mut self, mode: DrawMode, temperature: i32) -> Result<(), MockError> {
        self.log.push(Call::UpdateScreen {
            mode: mode.raw(),
            temperature,
        });
        self.log.check(MockError::Refresh)
    }

    fn update_area(&mut self, mode: DrawMode, temperature: i32, area: Rect) -> Result<(), MockError> {
        self.log.push(Call::UpdateArea {
            mode: mode.raw(),
            temperature,
            area,
        });
        self.log.check(MockError::Refresh)
    }

    fn power_on(&mut self) {
        self.log.push(Call::PowerOn);
    }

    fn power_off(&mut self) {
        self.log.push(Call::PowerOff);
    }
}

/// FastEPD library double, [`MOCK_WIDTH`] x [`MOCK_HEIGHT`] native
pub struct MockFastEpd {
    log: CallLog,
    degrees: i32,
}

impl MockFastEpd {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            degrees: 0,
        }
    }

    fn portrait(&self) -> bool {
        self.degrees == 90 || self.degrees == 270
    }
}

impl FastEpd for MockFastEpd {
    type Error = MockError;

    fn init_panel(&mut self, panel: &PanelId, bus_speed_hz: u32) -> Result<(), MockError> {
        self.log.push(Call::InitPanel {
            code: panel.code,
            bus_speed_hz,
        });
        self.log.check(MockError::Init)
    }

    fn set_mode(&mut self, mode: FastEpdMode) {
        self.log.push(Call::SetMode(mode));
    }

    fn set_rotation(&mut self, degrees: i32) {
        self.degrees = degrees;
        self.log.push(Call::SetRotation(degrees));
    }

    fn set_passes(&mut self, partial: u8, full: u8) {
        self.log.push(Call::SetPasses { partial, full });
    }

    fn width(&self) -> u16 {
        if self.portrait() { MOCK_HEIGHT } else { MOCK_WIDTH }
    }

    fn height(&self) -> u16 {
        if self.portrait() { MOCK_WIDTH } else { MOCK_HEIGHT }
    }

    fn fill_screen(&mut self, color: u8) {
        self.log.push(Call::Fill(color));
    }

    fn fill_rect(&mut self, area: Rect, color: u8) {
        self.log.push(Call::FillRect { area, color });
    }

    fn draw_pixel_fast(&mut self, x: i32, y: i32, color: u8) {
        self.log.push(Call::DrawPixel { x, y, color });
    }

    fn full_update(
        &mut self,
        clear_mode: DrawMode,
        keep_on: bool,
        area: Option<Rect>,
    ) -> Result<(), MockError> {
        self.log.push(Call::FullUpdate {
            clear_mode: clear_mode.raw(),
            keep_on,
            area,
        });
        self.log.check(MockError::Refresh)
    }

    fn partial_update(&mut self, keep_on: bool, start_row: u16, end_row: u16) -> Result<(), MockError> {
        self.log.push(Call::PartialUpdate {
            keep_on,
            start_row,
            end_row,
        });
        self.log.check(MockError::Refresh)
    }

    fn eink_power(&mut self, on: bool) {
        self.log.push(if on { Call::PowerOn } else { Call::PowerOff });
    }

    fn deinit(&mut self) {
        self.log.push(Call::Deinit);
    }
}

/// Surface handle handed out by [`MockCompositor`]
#[derive(Debug, PartialEq, Eq)]
pub struct MockSurface {
    pub id: usize,
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
    pub render_mode: RenderMode,
    pub rotation: Rotation,
}

/// Compositor double that keeps the flush target and emulates redraws
pub struct MockCompositor<B> {
    target: Option<FrameSink<B>>,
    buffer: Vec<u8>,
    format: Option<PixelFormat>,
    refuse: bool,
    created: usize,
    deleted: usize,
    flush_ready: usize,
}

impl<B> Default for MockCompositor<B> {
    fn default() -> Self {
        Self {
            target: None,
            buffer: Vec::new(),
            format: None,
            refuse: false,
            created: 0,
            deleted: 0,
            flush_ready: 0,
        }
    }
}

impl<B: Backend> MockCompositor<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A compositor that refuses to create surfaces
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn target(&self) -> Option<&FrameSink<B>> {
        self.target.as_ref()
    }

    /// Size of the draw buffer handed over with the surface
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn surfaces_created(&self) -> usize {
        self.created
    }

    pub fn surfaces_deleted(&self) -> usize {
        self.deleted
    }

    /// Flushes acknowledged so far
    pub fn flush_ready_count(&self) -> usize {
        self.flush_ready
    }

    /// Render the area between the inclusive corners `(x1, y1)` and
    /// `(x2, y2)` filled with `value` into the draw buffer and flush it.
    ///
    /// `None` without an attached surface. The flush is acknowledged
    /// whatever its outcome.
    pub fn redraw(
        &mut self,
        (x1, y1): (i32, i32),
        (x2, y2): (i32, i32),
        value: u8,
    ) -> Option<Result<(), Error<B::Error>>> {
        let target = self.target.as_ref()?;
        let area = Rect::from_corners(x1, y1, x2, y2);
        let format = self.format?;
        let len = format.buffer_len(area.width, area.height).min(self.buffer.len());
        self.buffer[..len].fill(value);
        let result = target.flush(area, &self.buffer[..len]);
        self.flush_ready += 1;
        Some(result)
    }

    /// Report a display rotation change, as the compositor's event hook would
    pub fn rotate(&self, rotation: Rotation) {
        if let Some(target) = &self.target {
            target.handle_rotation_change(rotation);
        }
    }
}

impl<B: Backend> Compositor<B> for MockCompositor<B> {
    type Surface = MockSurface;

    fn create_surface(&mut self, spec: SurfaceSpec, target: FrameSink<B>) -> Option<MockSurface> {
        if self.refuse {
            return None;
        }
        self.created += 1;
        self.buffer = spec.buffer;
        self.format = Some(spec.format);
        self.target = Some(target);
        Some(MockSurface {
            id: self.created,
            width: spec.width,
            height: spec.height,
            format: spec.format,
            render_mode: spec.render_mode,
            rotation: spec.rotation,
        })
    }

    fn delete_surface(&mut self, _surface: MockSurface) {
        self.deleted += 1;
        self.target = None;
        self.format = None;
        self.buffer = Vec::new();
    }
}

/// Touch controller double
pub struct MockTouch {
    supports_lvgl: bool,
    fail_start: bool,
    started: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockTouch {
    pub fn new() -> Self {
        Self {
            supports_lvgl: true,
            fail_start: false,
            started: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// A touch controller whose compositor registration fails
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::new()
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Default for MockTouch {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchDevice for MockTouch {
    fn supports_lvgl(&self) -> bool {
        self.supports_lvgl
    }

    fn start_lvgl(&self) -> bool {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return false;
        }
        self.started.store(true, Ordering::SeqCst);
        true
    }

    fn stop_lvgl(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.started.store(false, Ordering::SeqCst);
    }
}

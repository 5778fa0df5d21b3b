use epd_display::backend::epdiy::MODE_DU;
use epd_display::backend::{EpdiyBackend, FastEpdBackend};
use epd_display::hal::DisplayDevice;
use epd_display::mock::{Call, CallLog, MockCompositor, MockEpdiy, MockError, MockFastEpd};
use epd_display::rotation::EpdiyRotation;
use epd_display::{EpdDisplay, Error, GraphicsMode, PixelFormat, Rect, Rotation, presets};

type Epdiy = EpdiyBackend<MockEpdiy>;
type FastEpd = FastEpdBackend<MockFastEpd>;

/// Started and attached to the compositor, log cleared
fn attached_epdiy(log: &CallLog) -> EpdDisplay<Epdiy, MockCompositor<Epdiy>> {
    let mut display = EpdDisplay::new(
        EpdiyBackend::new(MockEpdiy::new(log)),
        presets::m5paper_s3_epdiy(None),
        MockCompositor::new(),
    );
    display.start().unwrap();
    display.start_lvgl().unwrap();
    log.clear();
    display
}

fn attached_fastepd(log: &CallLog, mode: GraphicsMode) -> EpdDisplay<FastEpd, MockCompositor<FastEpd>> {
    let mut display = EpdDisplay::new(
        FastEpdBackend::new(MockFastEpd::new(log)),
        presets::m5paper_s3_fastepd(None, mode, true),
        MockCompositor::new(),
    );
    display.start().unwrap();
    display.start_lvgl().unwrap();
    log.clear();
    display
}

fn drawn_colors(log: &CallLog) -> Vec<u8> {
    log.calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::DrawPixel { color, .. } => Some(color),
            _ => None,
        })
        .collect()
}

#[test]
fn epdiy_flush_refreshes_the_area_immediately() {
    let log = CallLog::new();
    let mut display = attached_epdiy(&log);
    let area = Rect::new(10, 20, 4, 2);

    let result = display.compositor_mut().redraw((10, 20), (13, 21), 0xFF);
    assert_eq!(result, Some(Ok(())));

    // 255 / 17 = 15, handed to the panel in the high nibble
    assert_eq!(drawn_colors(&log), vec![0xF0; 8]);
    assert_eq!(log.last_pixel(13, 21), Some(0xF0));
    // GC16 with the 2ppb packing flag, default temperature
    assert_eq!(
        log.calls().last(),
        Some(&Call::UpdateArea {
            mode: 0x82,
            temperature: 25,
            area
        })
    );
    assert_eq!(display.compositor().flush_ready_count(), 1);
    assert!(!display.frame_sink().is_dirty());
}

#[test]
fn epdiy_scales_gray_onto_sixteen_levels() {
    let log = CallLog::new();
    let mut display = attached_epdiy(&log);

    display.compositor_mut().redraw((0, 0), (0, 0), 128);
    assert_eq!(log.last_pixel(0, 0), Some(0x70));

    display.compositor_mut().redraw((0, 0), (0, 0), 0);
    assert_eq!(log.last_pixel(0, 0), Some(0x00));
}

#[test]
fn fastepd_flush_defers_the_refresh() {
    let log = CallLog::new();
    let mut display = attached_fastepd(&log, GraphicsMode::Gray4);

    let result = display.compositor_mut().redraw((0, 20), (2, 21), 0xAB);
    assert_eq!(result, Some(Ok(())));

    // High nibble only
    assert_eq!(drawn_colors(&log), vec![0x0A; 6]);
    assert_eq!(
        log.count(|c| matches!(c, Call::FullUpdate { .. } | Call::PartialUpdate { .. })),
        0
    );
    assert!(display.frame_sink().is_dirty());
    assert_eq!(display.compositor().flush_ready_count(), 1);
}

#[test]
fn fastepd_application_refresh_after_flush() {
    let log = CallLog::new();
    let mut display = attached_fastepd(&log, GraphicsMode::Gray4);
    display.compositor_mut().redraw((0, 20), (2, 21), 0x00);

    display.frame_sink().partial_refresh(20..=21, true).unwrap();
    assert_eq!(
        log.calls().last(),
        Some(&Call::PartialUpdate {
            keep_on: true,
            start_row: 20,
            end_row: 21
        })
    );

    display.update_screen(None, None).unwrap();
    assert_eq!(
        log.calls().last(),
        Some(&Call::FullUpdate {
            clear_mode: 1,
            keep_on: true,
            area: None
        })
    );
    assert!(!display.frame_sink().is_dirty());
    assert!(display.is_powered_on());
}

#[test]
fn fastepd_monochrome_flush_unpacks_msb_first() {
    let log = CallLog::new();
    let mut display = attached_fastepd(&log, GraphicsMode::Monochrome);

    display.compositor_mut().redraw((0, 0), (7, 0), 0b1010_0000);
    // Set bit is white, which is 1 in 1bpp mode
    assert_eq!(drawn_colors(&log), vec![1, 0, 1, 0, 0, 0, 0, 0]);
}

#[test]
fn refresh_powers_off_unless_kept_powered() {
    let log = CallLog::new();
    let display = attached_fastepd(&log, GraphicsMode::Gray4);

    display.frame_sink().full_refresh(None, None, false).unwrap();
    let calls = log.calls();
    assert!(matches!(calls[0], Call::FullUpdate { .. }));
    assert_eq!(calls[1], Call::PowerOff);
    assert!(!display.is_powered_on());

    // Next draw powers up lazily, exactly once
    log.clear();
    let sink = display.frame_sink();
    sink.write_region(Rect::new(0, 0, 1, 1), &[0], PixelFormat::L8)
        .unwrap();
    sink.write_region(Rect::new(1, 0, 1, 1), &[0], PixelFormat::L8)
        .unwrap();
    assert_eq!(log.calls()[0], Call::PowerOn);
    assert_eq!(log.count(|c| *c == Call::PowerOn), 1);
}

#[test]
fn short_buffer_is_rejected_before_drawing() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);

    let result = display
        .frame_sink()
        .write_region(Rect::new(0, 0, 2, 2), &[0; 3], PixelFormat::L8);
    assert_eq!(
        result,
        Err(Error::BufferTooSmall {
            required: 4,
            provided: 3
        })
    );
    assert!(log.is_empty());
}

#[test]
fn epdiy_rejects_monochrome_source() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);

    let result = display
        .frame_sink()
        .write_region(Rect::new(0, 0, 8, 1), &[0xFF], PixelFormat::I1);
    assert_eq!(result, Err(Error::UnsupportedFormat));
    assert!(log.is_empty());
}

#[test]
fn empty_region_is_a_no_op() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);

    let result = display
        .frame_sink()
        .write_region(Rect::new(5, 5, 0, 3), &[], PixelFormat::L8);
    assert!(result.is_ok());
    assert!(log.is_empty());
}

#[test]
fn refresh_failure_is_reported_once() {
    let log = CallLog::new();
    let mut display = attached_epdiy(&log);
    log.set_fail_refresh(true);

    let result = display.compositor_mut().redraw((0, 0), (1, 0), 0xFF);
    assert_eq!(result, Some(Err(Error::Native(MockError::Refresh))));
    assert_eq!(log.count(|c| matches!(c, Call::UpdateArea { .. })), 1);
    // The compositor still gets its acknowledgment
    assert_eq!(display.compositor().flush_ready_count(), 1);
}

#[test]
fn clear_black_then_white() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);

    display.clear_black(true).unwrap();
    assert_eq!(
        log.calls(),
        vec![
            Call::Fill(0x00),
            Call::UpdateScreen {
                mode: 0x02,
                temperature: 25
            }
        ]
    );
    assert!(display.is_powered_on());

    log.clear();
    display.clear_white(false).unwrap();
    assert_eq!(
        log.calls(),
        vec![Call::Clear, Call::SetAllWhite, Call::PowerOff]
    );
}

#[test]
fn clear_region_does_not_refresh() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);
    let area = Rect::new(4, 4, 10, 10);

    display.clear_area(area).unwrap();
    assert_eq!(log.calls(), vec![Call::ClearArea(area)]);
}

#[test]
fn fastepd_clear_region_marks_dirty() {
    let log = CallLog::new();
    let display = attached_fastepd(&log, GraphicsMode::Gray4);
    let area = Rect::new(0, 0, 16, 16);

    display.clear_area(area).unwrap();
    assert_eq!(log.calls(), vec![Call::FillRect { area, color: 0x0F }]);
    assert!(display.frame_sink().is_dirty());
}

#[test]
fn update_area_overrides_defaults() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);
    let area = Rect::new(0, 0, 32, 32);

    display.update_area(area, Some(MODE_DU), Some(18)).unwrap();
    assert_eq!(
        log.calls(),
        vec![Call::UpdateArea {
            mode: 0x01,
            temperature: 18,
            area
        }]
    );
}

#[test]
fn set_all_white_needs_no_power() {
    let log = CallLog::new();
    let mut display = attached_fastepd(&log, GraphicsMode::Gray4);
    display.set_power_on(false);
    log.clear();

    display.set_all_white().unwrap();
    assert_eq!(log.calls(), vec![Call::Fill(0x0F)]);
    assert!(!display.is_powered_on());
}

#[test]
fn compositor_rotation_reaches_the_panel() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);

    display.compositor().rotate(Rotation::Rotate90);
    assert_eq!(
        log.calls(),
        vec![Call::SetRotation(EpdiyRotation::InvertedPortrait as i32)]
    );
    assert_eq!(display.rotation(), Rotation::Rotate90);

    let log = CallLog::new();
    let display = attached_fastepd(&log, GraphicsMode::Gray4);
    display.compositor().rotate(Rotation::Rotate180);
    assert_eq!(log.calls(), vec![Call::SetRotation(180)]);
    assert_eq!(display.rotation(), Rotation::Rotate180);
}

#[test]
fn flush_after_detach_is_not_ready() {
    let log = CallLog::new();
    let mut display = attached_epdiy(&log);
    let sink = display.frame_sink().clone();

    display.stop_lvgl();
    assert_eq!(
        sink.flush(Rect::new(0, 0, 1, 1), &[0]),
        Err(Error::NotReady)
    );
    assert!(display.compositor_mut().redraw((0, 0), (0, 0), 0).is_none());
}

#[test]
fn epdiy_row_refresh_past_the_bottom_covers_the_panel() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);

    display.frame_sink().partial_refresh(0..=u16::MAX, true).unwrap();
    assert_eq!(
        log.calls(),
        vec![Call::UpdateArea {
            mode: 0x02,
            temperature: 25,
            area: Rect::new(0, 0, display.width(), display.height())
        }]
    );
}

#[test]
fn failed_clear_is_returned_epdiy() {
    let log = CallLog::new();
    let display = attached_epdiy(&log);
    display.set_all_white().unwrap();
    log.set_fail_refresh(true);

    assert_eq!(
        display.clear_black(false),
        Err(Error::Native(MockError::Refresh))
    );
    assert!(!display.is_powered_on());
    assert!(display.frame_sink().is_dirty());
}

#[test]
fn failed_clear_is_returned_fastepd() {
    let log = CallLog::new();
    let display = attached_fastepd(&log, GraphicsMode::Gray4);
    log.set_fail_refresh(true);

    assert_eq!(
        display.clear_black(false),
        Err(Error::Native(MockError::Refresh))
    );
    assert!(!display.is_powered_on());
    assert!(!display.frame_sink().is_dirty());
}

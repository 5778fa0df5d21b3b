use std::sync::Arc;

use epd_display::backend::{EpdiyBackend, FastEpdBackend};
use epd_display::hal::DisplayDevice;
use epd_display::mock::{Call, CallLog, MockCompositor, MockEpdiy, MockFastEpd};
use epd_display::{EpdDisplay, Error, GraphicsMode, PixelFormat, presets};

type FastEpd = FastEpdBackend<MockFastEpd>;

fn started_fastepd(log: &CallLog) -> EpdDisplay<FastEpd, MockCompositor<FastEpd>> {
    let mut display = EpdDisplay::new(
        FastEpdBackend::new(MockFastEpd::new(log)),
        presets::m5paper_s3_fastepd(None, GraphicsMode::Gray4, true),
        MockCompositor::new(),
    );
    display.start().unwrap();
    log.clear();
    display
}

#[test]
fn driver_describes_the_panel() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let driver = display.display_driver();

    assert_eq!(driver.color_format(), PixelFormat::I1);
    assert_eq!((driver.pixel_width(), driver.pixel_height()), (540, 960));
}

#[test]
fn draw_bitmap_unpacks_one_bit_rows() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let driver = display.display_driver();

    driver.draw_bitmap(0, 0, 8, 1, &[0b1000_0001]).unwrap();

    let colors: Vec<u8> = log
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::DrawPixel { color, .. } => Some(color),
            _ => None,
        })
        .collect();
    // White is 0x0F in 4bpp mode
    assert_eq!(colors, vec![0x0F, 0, 0, 0, 0, 0, 0, 0x0F]);
    assert!(display.frame_sink().is_dirty());
}

#[test]
fn draw_bitmap_end_coordinates_are_exclusive() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let driver = display.display_driver();

    driver.draw_bitmap(10, 5, 13, 7, &[0xFF, 0xFF]).unwrap();

    assert_eq!(log.count(|c| matches!(c, Call::DrawPixel { .. })), 6);
    assert_eq!(log.last_pixel(12, 6), Some(0x0F));
    assert_eq!(log.last_pixel(13, 6), None);
    assert_eq!(log.last_pixel(12, 7), None);
}

#[test]
fn draw_bitmap_rejects_empty_and_inverted_rectangles() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let driver = display.display_driver();

    assert_eq!(
        driver.draw_bitmap(5, 0, 2, 1, &[0]),
        Err(Error::InvalidBitmap {
            width: -3,
            height: 1
        })
    );
    assert_eq!(
        driver.draw_bitmap(0, 0, 0, 4, &[0; 4]),
        Err(Error::InvalidBitmap {
            width: 0,
            height: 4
        })
    );
    assert!(log.is_empty());
}

#[test]
fn draw_bitmap_rejects_extreme_coordinates() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let driver = display.display_driver();

    assert_eq!(
        driver.draw_bitmap(i32::MIN, 0, 1, 1, &[0]),
        Err(Error::InvalidBitmap {
            width: i32::MAX,
            height: 1
        })
    );
    assert_eq!(
        driver.draw_bitmap(0, 0, 70_000, 1, &[0; 8_750]),
        Err(Error::InvalidBitmap {
            width: 70_000,
            height: 1
        })
    );
    assert!(log.is_empty());
}

#[test]
fn driver_is_issued_once_and_shared() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);

    let first = display.display_driver();
    let second = display.display_driver();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn released_driver_allows_stop_and_attach() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);

    let driver = display.display_driver();
    driver.draw_bitmap(0, 0, 1, 1, &[0]).unwrap();
    drop(driver);

    assert!(display.start_lvgl().is_ok());
    display.stop_lvgl();
    assert!(display.stop().is_ok());
}

#[test]
#[should_panic(expected = "pixel driver still in use")]
fn stop_with_a_held_driver_faults() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let _driver = display.display_driver();

    let _ = display.stop();
}

#[test]
#[should_panic(expected = "pixel driver still in use")]
fn attach_with_a_held_driver_faults() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    let _driver = display.display_driver();

    let _ = display.start_lvgl();
}

#[test]
#[should_panic(expected = "call stop_lvgl first")]
fn driver_while_attached_faults() {
    let log = CallLog::new();
    let mut display = started_fastepd(&log);
    display.start_lvgl().unwrap();

    let _ = display.display_driver();
}

#[test]
#[should_panic(expected = "pixel driver still in use")]
fn dropping_the_device_under_a_held_driver_faults() {
    let log = CallLog::new();
    let _driver;
    {
        let mut display = started_fastepd(&log);
        _driver = display.display_driver();
    }
}

#[test]
#[should_panic(expected = "does not provide a pixel driver")]
fn epdiy_has_no_pixel_driver() {
    let log = CallLog::new();
    let mut display = EpdDisplay::new(
        EpdiyBackend::new(MockEpdiy::new(&log)),
        presets::m5paper_s3_epdiy(None),
        MockCompositor::new(),
    );

    let _ = display.display_driver();
}

#[cfg(feature = "graphics")]
mod canvas {
    use super::*;

    use embedded_graphics::{
        pixelcolor::BinaryColor,
        prelude::*,
        primitives::{PrimitiveStyle, Rectangle},
    };

    #[test]
    fn canvas_draws_ink_and_skips_out_of_bounds() {
        let log = CallLog::new();
        let mut display = started_fastepd(&log);
        let driver = display.display_driver();
        let mut canvas = driver.canvas();

        assert_eq!(canvas.size(), Size::new(540, 960));

        Rectangle::new(Point::new(-1, -1), Size::new(2, 2))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut canvas)
            .unwrap();

        assert_eq!(log.count(|c| matches!(c, Call::DrawPixel { .. })), 1);
        assert_eq!(log.last_pixel(0, 0), Some(0x00));
        assert!(canvas.is_dirty());
    }

    #[test]
    fn canvas_refresh_powers_down() {
        let log = CallLog::new();
        let mut display = started_fastepd(&log);
        let driver = display.display_driver();
        {
            let mut canvas = driver.canvas();
            Pixel(Point::new(3, 4), BinaryColor::Off)
                .draw(&mut canvas)
                .unwrap();
            canvas.refresh(false).unwrap();
            assert!(!canvas.is_dirty());
        }

        assert_eq!(log.last_pixel(3, 4), Some(0x0F));
        let calls = log.calls();
        assert_eq!(calls[calls.len() - 1], Call::PowerOff);
        assert!(matches!(calls[calls.len() - 2], Call::FullUpdate { .. }));
        assert!(!display.is_powered_on());
    }
}

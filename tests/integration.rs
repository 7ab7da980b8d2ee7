//! Integration tests for host-testable mirror logic.

use std::path::PathBuf;

use embedded_graphics::prelude::{Point, Size};
use time::{Date, Month, PrimitiveDateTime, Time};

use glance::calendar::{CalendarEvent, CalendarSnapshot};
use glance::config::{Config, DisplayConfig};
use glance::panel::{FbPanel, FrameBuffer};
use glance::touch::GestureTracker;
use glance_ui::{fill_cells, CalendarGrid, ClockView, ScreenRegions, TouchGesture, WeekView};

#[test]
fn config_file_controls_every_subsystem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [display]
        device = "/dev/fb1"
        width = 1080
        height = 1920
        bpp = 32

        [touch]
        device = "/dev/input/event3"
        raw_max_x = 1079
        raw_max_y = 1919
        invert_y = true

        [weather]
        city = "Berlin,DE"
        units = "metric"
        api_key = "k"

        [calendar]
        calendar_id = "family@group.calendar.google.com"
        client_id = "c"
        client_secret = "s"

        [clock]
        utc_offset_hours = 1
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.display.device, PathBuf::from("/dev/fb1"));
    assert_eq!(config.display.bpp, 32);
    assert_eq!(config.touch.device, PathBuf::from("/dev/input/event3"));
    assert!(config.touch.invert_y);
    assert!(!config.touch.swap_axes);
    assert_eq!(config.weather.units, "metric");
    assert_eq!(config.calendar.calendar_id, "family@group.calendar.google.com");
    assert_eq!(config.clock.utc_offset_hours, Some(1));
}

#[test]
fn raw_input_records_classify_in_panel_space() {
    let mut touch = Config::default().touch;
    touch.raw_max_x = 479;
    touch.raw_max_y = 799;
    let mut tracker = GestureTracker::new(touch, 480, 800);

    // Kernel record stream: EV_ABS positions, then BTN_TOUCH press,
    // a drag left, and the release.
    assert_eq!(tracker.feed(0x03, 0x00, 400), None);
    assert_eq!(tracker.feed(0x03, 0x01, 300), None);
    assert_eq!(tracker.feed(0x01, 0x14a, 1), None);
    assert_eq!(tracker.feed(0x03, 0x00, 150), None);
    assert_eq!(
        tracker.feed(0x01, 0x14a, 0),
        Some(TouchGesture::SwipeLeft(Point::new(400, 300)))
    );
}

#[test]
fn snapshot_events_render_into_grid_cells() {
    let grid = CalendarGrid::for_date(Date::from_calendar_date(2026, Month::August, 24).unwrap());
    let snapshot = CalendarSnapshot {
        year: 2026,
        month: 8,
        events: vec![
            CalendarEvent {
                day: 24,
                minutes: Some(9 * 60 + 30),
                summary: "Dentist".into(),
            },
            CalendarEvent {
                day: 12,
                minutes: None,
                summary: "Street fest".into(),
            },
        ],
    };

    let cells = fill_cells(&grid, &snapshot.markers());
    let cell = cells[grid.cell_of_day(24)].as_str();
    assert!(cell.starts_with("24\n"), "cell was {cell:?}");
    assert!(cell.contains("Dentist"));
    assert!(cell.ends_with("@ 09:30"));
    assert_eq!(cells[grid.cell_of_day(12)].as_str(), "12\nStreet fest");

    // August 2026 starts on a Saturday; the leading cells stay blank.
    assert_eq!(cells[0].as_str(), "");
    assert_eq!(cells[5].as_str(), "");
}

#[test]
fn a_composed_frame_reaches_the_panel_device() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let display = DisplayConfig {
        device: file.path().to_path_buf(),
        width: 480,
        height: 800,
        bpp: 16,
    };
    let mut panel = FbPanel::open(&display).unwrap();
    let mut frame = FrameBuffer::new(480, 800);

    let regions = ScreenRegions::split(Size::new(480, 800));
    let grid = CalendarGrid::for_date(Date::from_calendar_date(2026, Month::August, 24).unwrap());
    let cells = fill_cells(&grid, &[]);
    let noon = PrimitiveDateTime::new(
        Date::from_calendar_date(2026, Month::August, 24).unwrap(),
        Time::from_hms(12, 30, 0).unwrap(),
    );

    ClockView::new(noon, regions.clock).draw(&mut frame).unwrap();
    WeekView::new(&grid, &cells, regions.calendar).draw(&mut frame).unwrap();
    panel.flush(&frame).unwrap();

    let written = std::fs::metadata(file.path()).unwrap().len();
    assert_eq!(written, 480 * 800 * 2);
}

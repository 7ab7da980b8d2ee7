//! Renders the three mirror screens to PPM files for a quick look
//! without a panel: `cargo run --example preview`.

use std::convert::Infallible;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use glance_ui::{
    fill_cells, CalendarGrid, ClockView, DayView, EventMarker, MonthView, ScreenRegions, WeatherKind, WeatherReport,
    WeatherView, WeekView,
};
use time::{Date, Month, PrimitiveDateTime, Time};

const WIDTH: u32 = 480;
const HEIGHT: u32 = 800;

struct Frame {
    pixels: Vec<Rgb565>,
}

impl Frame {
    fn new() -> Self {
        Self {
            pixels: vec![Rgb565::BLACK; (WIDTH * HEIGHT) as usize],
        }
    }

    fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "P6\n{} {}\n255\n", WIDTH, HEIGHT)?;
        for pixel in &self.pixels {
            let r = pixel.r() << 3 | pixel.r() >> 2;
            let g = pixel.g() << 2 | pixel.g() >> 4;
            let b = pixel.b() << 3 | pixel.b() >> 2;
            out.write_all(&[r, g, b])?;
        }
        Ok(())
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(WIDTH, HEIGHT)
    }
}

impl DrawTarget for Frame {
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.x < WIDTH as i32 && point.y >= 0 && point.y < HEIGHT as i32 {
                self.pixels[(point.y as u32 * WIDTH + point.x as u32) as usize] = color;
            }
        }
        Ok(())
    }
}

fn main() -> std::io::Result<()> {
    let now = PrimitiveDateTime::new(
        Date::from_calendar_date(2026, Month::August, 24).unwrap(),
        Time::from_hms(16, 20, 0).unwrap(),
    );
    let report = WeatherReport {
        temp: 78,
        temp_max: 85,
        temp_min: 68,
        humidity: 54,
        kind: WeatherKind::PartlyCloudy,
    };
    let grid = CalendarGrid::for_date(now.date());
    let events = [
        EventMarker {
            day: 24,
            minutes: Some(9 * 60),
            summary: "Standup",
        },
        EventMarker {
            day: 26,
            minutes: Some(18 * 60 + 30),
            summary: "Dinner with Sam",
        },
        EventMarker {
            day: 31,
            minutes: None,
            summary: "Trip",
        },
    ];
    let cells = fill_cells(&grid, &events);
    let regions = ScreenRegions::split(Size::new(WIDTH, HEIGHT));

    let mut frame = Frame::new();
    ClockView::new(now, regions.clock).draw(&mut frame).unwrap();
    WeatherView::new(Some(report), regions.weather).draw(&mut frame).unwrap();
    WeekView::new(&grid, &cells, regions.calendar).draw(&mut frame).unwrap();
    frame.save(Path::new("preview-week.ppm"))?;

    let mut frame = Frame::new();
    ClockView::new(now, regions.clock).draw(&mut frame).unwrap();
    WeatherView::new(Some(report), regions.weather).draw(&mut frame).unwrap();
    MonthView::new(&grid, &cells, regions.calendar).draw(&mut frame).unwrap();
    frame.save(Path::new("preview-month.ppm"))?;

    let mut frame = Frame::new();
    ClockView::new(now, regions.clock).draw(&mut frame).unwrap();
    WeatherView::new(Some(report), regions.weather).draw(&mut frame).unwrap();
    DayView::new(cells[grid.cell_of_day(24)].as_str(), regions.calendar)
        .draw(&mut frame)
        .unwrap();
    frame.save(Path::new("preview-day.ppm"))?;

    println!("wrote preview-week.ppm, preview-month.ppm, preview-day.ppm");
    Ok(())
}

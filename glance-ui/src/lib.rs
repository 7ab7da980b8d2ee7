#![cfg_attr(not(test), no_std)]

use core::fmt::Write as _;
use embedded_graphics::pixelcolor::Rgb565 as Rgb;
use embedded_graphics::prelude::{DrawTarget, *};
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle, RoundedRectangle, Triangle};
use embedded_graphics::text::{Text, TextStyleBuilder};
use u8g2_fonts::{fonts, U8g2TextStyle};

pub mod calendar;
pub mod event;

pub use calendar::{
    fill_cells, CalendarAction, CalendarGrid, CellText, DayView, EventMarker, MonthView, WeekView, GRID_CELLS,
};
pub use event::TouchGesture;

fn clock_text_style(color: Rgb) -> U8g2TextStyle<Rgb> {
    U8g2TextStyle::new(fonts::u8g2_font_inb57_mn, color)
}

fn menu_text_style(color: Rgb) -> U8g2TextStyle<Rgb> {
    U8g2TextStyle::new(fonts::u8g2_font_spleen16x32_mf, color)
}

fn text_text_style(color: Rgb) -> U8g2TextStyle<Rgb> {
    U8g2TextStyle::new(fonts::u8g2_font_unifont_t_symbols, color)
}

/// The fixed screen split: weather top left, clock top right, calendar
/// below. Regions are derived from the panel size so the same views
/// serve any portrait panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRegions {
    pub weather: Rectangle,
    pub clock: Rectangle,
    pub calendar: Rectangle,
}

impl ScreenRegions {
    pub fn split(size: Size) -> Self {
        let header = size.height * 3 / 10;
        let half = size.width / 2;
        Self {
            weather: Rectangle::new(Point::zero(), Size::new(half, header)),
            clock: Rectangle::new(Point::new(half as i32, 0), Size::new(size.width - half, header)),
            calendar: Rectangle::new(Point::new(0, header as i32), Size::new(size.width, size.height - header)),
        }
    }
}

pub struct ClockView {
    time: time::PrimitiveDateTime,
    frame: Rectangle,
}

impl ClockView {
    pub fn new(time: time::PrimitiveDateTime, frame: Rectangle) -> Self {
        Self { time, frame }
    }

    pub fn draw<D: DrawTarget<Color = Rgb>>(&self, display: &mut D) -> Result<(), D::Error> {
        let centered = TextStyleBuilder::new()
            .alignment(embedded_graphics::text::Alignment::Center)
            .baseline(embedded_graphics::text::Baseline::Alphabetic)
            .build();
        let center_x = self.frame.top_left.x + self.frame.size.width as i32 / 2;

        let mut text: heapless::String<8> = heapless::String::new();
        write!(text, "{:02}:{:02}", self.time.hour(), self.time.minute()).unwrap();
        Text::with_text_style(
            &text,
            Point::new(center_x, self.frame.top_left.y + self.frame.size.height as i32 * 5 / 12),
            clock_text_style(Rgb::WHITE),
            centered,
        )
        .draw(display)?;

        let line = date_line(self.time.date());
        Text::with_text_style(
            &line,
            Point::new(center_x, self.frame.top_left.y + self.frame.size.height as i32 * 5 / 8),
            menu_text_style(Rgb::WHITE),
            centered,
        )
        .draw(display)?;
        Ok(())
    }
}

pub(crate) fn date_line(date: time::Date) -> heapless::String<16> {
    let mut line = heapless::String::new();
    write!(
        line,
        "{}, {} {:02}",
        calendar::weekday_abbrev(date.weekday()),
        calendar::month_abbrev(date.month()),
        date.day()
    )
    .unwrap();
    line
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherKind {
    Clear,
    PartlyCloudy,
    Clouds,
    Rain,
    Thunderstorm,
    Snow,
    Mist,
}

impl WeatherKind {
    /// Maps a provider icon code ("01d", "10n", ...) by its two-digit
    /// class. Unknown codes read as overcast.
    pub fn from_icon(code: &str) -> Self {
        match code.get(..2) {
            Some("01") => Self::Clear,
            Some("02") => Self::PartlyCloudy,
            Some("03") | Some("04") => Self::Clouds,
            Some("09") | Some("10") => Self::Rain,
            Some("11") => Self::Thunderstorm,
            Some("13") => Self::Snow,
            Some("50") => Self::Mist,
            _ => Self::Clouds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherReport {
    pub temp: i16,
    pub temp_max: i16,
    pub temp_min: i16,
    pub humidity: u8,
    pub kind: WeatherKind,
}

pub struct WeatherView {
    report: Option<WeatherReport>,
    frame: Rectangle,
}

impl WeatherView {
    pub fn new(report: Option<WeatherReport>, frame: Rectangle) -> Self {
        Self { report, frame }
    }

    pub fn draw<D: DrawTarget<Color = Rgb>>(&self, display: &mut D) -> Result<(), D::Error> {
        let origin = self.frame.top_left;
        let report = match self.report {
            Some(report) => report,
            None => {
                // Nothing fetched yet.
                Text::new("--", origin + Point::new(16, 72), clock_text_style(Rgb::WHITE)).draw(display)?;
                return Ok(());
            }
        };

        draw_icon(report.kind, origin + Point::new(16, 20), display)?;

        let mut text: heapless::String<8> = heapless::String::new();
        write!(text, "{}", report.temp).unwrap();
        let after = Text::new(&text, origin + Point::new(96, 72), clock_text_style(Rgb::WHITE)).draw(display)?;
        // Degree mark, drawn as a ring since the numeric font has none.
        Circle::new(after + Point::new(4, -52), 12)
            .into_styled(PrimitiveStyle::with_stroke(Rgb::WHITE, 2))
            .draw(display)?;

        let style = text_text_style(Rgb::WHITE);
        let mut line: heapless::String<20> = heapless::String::new();
        write!(line, "High: {}", report.temp_max).unwrap();
        Text::new(&line, origin + Point::new(16, 120), style).draw(display)?;

        let style = text_text_style(Rgb::WHITE);
        line.clear();
        write!(line, "Low:  {}", report.temp_min).unwrap();
        Text::new(&line, origin + Point::new(16, 144), style).draw(display)?;

        let style = text_text_style(Rgb::WHITE);
        line.clear();
        write!(line, "Humidity: {}%", report.humidity).unwrap();
        Text::new(&line, origin + Point::new(16, 168), style).draw(display)?;
        Ok(())
    }
}

// All icons fit a 64x64 box anchored at `tl`.
fn draw_icon<D: DrawTarget<Color = Rgb>>(kind: WeatherKind, tl: Point, display: &mut D) -> Result<(), D::Error> {
    match kind {
        WeatherKind::Clear => draw_sun(tl + Point::new(8, 8), 48, display),
        WeatherKind::PartlyCloudy => {
            draw_sun(tl + Point::new(30, 2), 26, display)?;
            draw_cloud(tl + Point::new(0, 24), display)
        }
        WeatherKind::Clouds => draw_cloud(tl + Point::new(0, 16), display),
        WeatherKind::Rain => {
            draw_cloud(tl + Point::new(0, 8), display)?;
            let stroke = PrimitiveStyle::with_stroke(Rgb::WHITE, 2);
            for i in 0..3 {
                let x = tl.x + 14 + i * 16;
                Line::new(Point::new(x, tl.y + 48), Point::new(x - 6, tl.y + 62))
                    .into_styled(stroke)
                    .draw(display)?;
            }
            Ok(())
        }
        WeatherKind::Thunderstorm => {
            draw_cloud(tl + Point::new(0, 8), display)?;
            Triangle::new(
                Point::new(tl.x + 34, tl.y + 44),
                Point::new(tl.x + 22, tl.y + 60),
                Point::new(tl.x + 32, tl.y + 56),
            )
            .into_styled(PrimitiveStyle::with_fill(Rgb::WHITE))
            .draw(display)?;
            Ok(())
        }
        WeatherKind::Snow => {
            let stroke = PrimitiveStyle::with_stroke(Rgb::WHITE, 2);
            let center = tl + Point::new(32, 32);
            for (dx, dy) in [(0, 22), (22, 0), (16, 16), (16, -16)] {
                Line::new(center - Point::new(dx, dy), center + Point::new(dx, dy))
                    .into_styled(stroke)
                    .draw(display)?;
            }
            Ok(())
        }
        WeatherKind::Mist => {
            let stroke = PrimitiveStyle::with_stroke(Rgb::WHITE, 3);
            for i in 0..4 {
                let y = tl.y + 16 + i * 11;
                let inset = if i % 2 == 0 { 4 } else { 10 };
                Line::new(Point::new(tl.x + inset, y), Point::new(tl.x + 56 + inset, y))
                    .into_styled(stroke)
                    .draw(display)?;
            }
            Ok(())
        }
    }
}

fn draw_sun<D: DrawTarget<Color = Rgb>>(tl: Point, diameter: i32, display: &mut D) -> Result<(), D::Error> {
    Circle::new(tl, diameter as u32)
        .into_styled(PrimitiveStyle::with_stroke(Rgb::WHITE, 3))
        .draw(display)?;
    let stroke = PrimitiveStyle::with_stroke(Rgb::WHITE, 2);
    let center = tl + Point::new(diameter / 2, diameter / 2);
    let inner = diameter / 2 + 3;
    let outer = diameter / 2 + 9;
    // Eight rays; diagonals scaled by ~1/sqrt(2).
    for (dx, dy) in [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)] {
        let scale = |r: i32| {
            if dx != 0 && dy != 0 {
                r * 100 / 141
            } else {
                r
            }
        };
        let from = center + Point::new(dx * scale(inner), dy * scale(inner));
        let to = center + Point::new(dx * scale(outer), dy * scale(outer));
        Line::new(from, to).into_styled(stroke).draw(display)?;
    }
    Ok(())
}

fn draw_cloud<D: DrawTarget<Color = Rgb>>(tl: Point, display: &mut D) -> Result<(), D::Error> {
    let fill = PrimitiveStyle::with_fill(Rgb::WHITE);
    Circle::new(tl + Point::new(8, 0), 24).into_styled(fill).draw(display)?;
    Circle::new(tl + Point::new(24, -6), 30).into_styled(fill).draw(display)?;
    RoundedRectangle::with_equal_corners(
        Rectangle::new(tl + Point::new(0, 10), Size::new(62, 22)),
        Size::new(10, 10),
    )
    .into_styled(fill)
    .draw(display)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::mock_display::MockDisplay;
    use time::{Date, Month, PrimitiveDateTime, Time};

    fn canvas() -> MockDisplay<Rgb> {
        let mut display = MockDisplay::new();
        display.set_allow_out_of_bounds_drawing(true);
        display.set_allow_overdraw(true);
        display
    }

    fn noon(year: i32, month: Month, day: u8) -> PrimitiveDateTime {
        PrimitiveDateTime::new(
            Date::from_calendar_date(year, month, day).unwrap(),
            Time::from_hms(12, 5, 0).unwrap(),
        )
    }

    #[test]
    fn regions_cover_the_panel() {
        let regions = ScreenRegions::split(Size::new(480, 800));
        assert_eq!(regions.weather.top_left, Point::zero());
        assert_eq!(regions.clock.top_left, Point::new(240, 0));
        assert_eq!(regions.calendar.top_left, Point::new(0, 240));
        assert_eq!(regions.weather.size.height, 240);
        assert_eq!(regions.calendar.size, Size::new(480, 560));
    }

    #[test]
    fn date_line_reads_like_a_mirror() {
        assert_eq!(date_line(Date::from_calendar_date(2026, Month::August, 5).unwrap()).as_str(), "Wed, Aug 05");
        assert_eq!(
            date_line(Date::from_calendar_date(2026, Month::November, 1).unwrap()).as_str(),
            "Sun, Nov 01"
        );
    }

    #[test]
    fn icon_codes_map_day_and_night_alike() {
        assert_eq!(WeatherKind::from_icon("01d"), WeatherKind::Clear);
        assert_eq!(WeatherKind::from_icon("01n"), WeatherKind::Clear);
        assert_eq!(WeatherKind::from_icon("02d"), WeatherKind::PartlyCloudy);
        assert_eq!(WeatherKind::from_icon("03n"), WeatherKind::Clouds);
        assert_eq!(WeatherKind::from_icon("04d"), WeatherKind::Clouds);
        assert_eq!(WeatherKind::from_icon("09d"), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_icon("10n"), WeatherKind::Rain);
        assert_eq!(WeatherKind::from_icon("11d"), WeatherKind::Thunderstorm);
        assert_eq!(WeatherKind::from_icon("13d"), WeatherKind::Snow);
        assert_eq!(WeatherKind::from_icon("50d"), WeatherKind::Mist);
        assert_eq!(WeatherKind::from_icon(""), WeatherKind::Clouds);
        assert_eq!(WeatherKind::from_icon("99x"), WeatherKind::Clouds);
    }

    #[test]
    fn clock_view_draws() {
        let regions = ScreenRegions::split(Size::new(480, 800));
        let view = ClockView::new(noon(2026, Month::August, 24), regions.clock);
        view.draw(&mut canvas()).unwrap();
    }

    #[test]
    fn weather_view_draws_every_kind() {
        let regions = ScreenRegions::split(Size::new(480, 800));
        for kind in [
            WeatherKind::Clear,
            WeatherKind::PartlyCloudy,
            WeatherKind::Clouds,
            WeatherKind::Rain,
            WeatherKind::Thunderstorm,
            WeatherKind::Snow,
            WeatherKind::Mist,
        ] {
            let report = WeatherReport {
                temp: 72,
                temp_max: 85,
                temp_min: 68,
                humidity: 54,
                kind,
            };
            WeatherView::new(Some(report), regions.weather).draw(&mut canvas()).unwrap();
        }
        WeatherView::new(None, regions.weather).draw(&mut canvas()).unwrap();
    }

    #[test]
    fn calendar_views_draw() {
        let regions = ScreenRegions::split(Size::new(480, 800));
        let grid = CalendarGrid::for_date(Date::from_calendar_date(2026, Month::August, 24).unwrap());
        let events = [EventMarker {
            day: 24,
            minutes: Some(9 * 60),
            summary: "Standup",
        }];
        let cells = fill_cells(&grid, &events);
        MonthView::new(&grid, &cells, regions.calendar).draw(&mut canvas()).unwrap();
        WeekView::new(&grid, &cells, regions.calendar).draw(&mut canvas()).unwrap();
        DayView::new(cells[grid.cell_of_day(24)].as_str(), regions.calendar)
            .draw(&mut canvas())
            .unwrap();
    }
}

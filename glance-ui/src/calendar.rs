use core::fmt::Write as _;
use embedded_graphics::pixelcolor::Rgb565 as Rgb;
use embedded_graphics::prelude::{DrawTarget, *};
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle};
use embedded_graphics::text::{Text, TextStyleBuilder};
use embedded_text::style::TextBoxStyleBuilder;
use embedded_text::TextBox;
use time::{Date, Month, Weekday};

use crate::event::TouchGesture;
use crate::{menu_text_style, text_text_style};

pub const GRID_COLS: usize = 7;
pub const GRID_ROWS: usize = 6;
pub const GRID_CELLS: usize = GRID_COLS * GRID_ROWS;

const BUTTON_ROW: u32 = 48;
const HEADER_ROW: u32 = 28;

pub type CellText = heapless::String<64>;

/// One month laid out on the fixed 6x7 grid, columns Sunday through
/// Saturday. `week_row` is the row shown in week view and follows the
/// day cursor; `last_week_row` is the row holding the last day of the
/// month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarGrid {
    year: i32,
    month: Month,
    day: u8,
    start_col: u8,
    month_len: u8,
    week_row: usize,
    last_week_row: usize,
}

impl CalendarGrid {
    pub fn for_date(date: Date) -> Self {
        let mut grid = Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            start_col: 0,
            month_len: 31,
            week_row: 0,
            last_week_row: 0,
        };
        grid.rebuild();
        grid
    }

    fn rebuild(&mut self) {
        self.month_len = time::util::days_in_year_month(self.year, self.month);
        if self.day < 1 {
            self.day = 1;
        }
        if self.day > self.month_len {
            self.day = self.month_len;
        }
        if let Ok(first) = Date::from_calendar_date(self.year, self.month, 1) {
            self.start_col = first.weekday().number_days_from_sunday();
        }
        self.last_week_row = self.row_of_day(self.month_len);
        self.week_row = self.row_of_day(self.day);
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn month_len(&self) -> u8 {
        self.month_len
    }

    pub fn start_col(&self) -> u8 {
        self.start_col
    }

    pub fn week_row(&self) -> usize {
        self.week_row
    }

    pub fn last_week_row(&self) -> usize {
        self.last_week_row
    }

    pub fn cell_of_day(&self, day: u8) -> usize {
        (day.max(1) as usize - 1 + self.start_col as usize).min(GRID_CELLS - 1)
    }

    pub fn day_at_cell(&self, cell: usize) -> Option<u8> {
        if cell >= GRID_CELLS {
            return None;
        }
        let day = cell as i32 - self.start_col as i32 + 1;
        if day >= 1 && day <= self.month_len as i32 {
            Some(day as u8)
        } else {
            None
        }
    }

    pub fn row_of_day(&self, day: u8) -> usize {
        if day == 0 || day > self.month_len {
            return 0;
        }
        self.cell_of_day(day) / GRID_COLS
    }

    /// Move the cursor to an arbitrary date, e.g. on the weekly snap
    /// back to today.
    pub fn set_date(&mut self, date: Date) {
        self.year = date.year();
        self.month = date.month();
        self.day = date.day();
        self.rebuild();
    }

    pub fn set_day(&mut self, day: u8) {
        self.day = day;
        self.rebuild();
    }

    pub fn next_month(&mut self) {
        self.month = self.month.next();
        if self.month == Month::January {
            self.year += 1;
        }
        self.day = 1;
        self.rebuild();
    }

    pub fn prev_month(&mut self) {
        self.month = self.month.previous();
        if self.month == Month::December {
            self.year -= 1;
        }
        self.month_len = time::util::days_in_year_month(self.year, self.month);
        self.day = self.month_len;
        self.rebuild();
    }

    pub fn next_week(&mut self) {
        if self.week_row >= self.last_week_row {
            self.next_month();
            self.week_row = 0;
        } else {
            self.week_row += 1;
        }
    }

    pub fn prev_week(&mut self) {
        if self.week_row == 0 {
            self.prev_month();
            self.week_row = self.last_week_row;
        } else {
            self.week_row -= 1;
        }
    }

    pub fn label(&self) -> heapless::String<16> {
        let mut label = heapless::String::new();
        let _ = write!(label, "{} {}", month_abbrev(self.month), self.year);
        label
    }
}

pub(crate) fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

pub(crate) fn weekday_abbrev(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Monday => "Mon",
        Weekday::Tuesday => "Tue",
        Weekday::Wednesday => "Wed",
        Weekday::Thursday => "Thu",
        Weekday::Friday => "Fri",
        Weekday::Saturday => "Sat",
        Weekday::Sunday => "Sun",
    }
}

const WEEKDAY_HEADER: [&str; GRID_COLS] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A single event placed on the grid. `minutes` is the start time as
/// minutes past midnight, `None` for all-day events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMarker<'a> {
    pub day: u8,
    pub minutes: Option<u16>,
    pub summary: &'a str,
}

/// Cell text for every grid slot: empty outside the month, the day
/// number inside it, and "day / summary @ HH:MM" where an event falls.
/// Later markers on the same day overwrite earlier ones. Overlong
/// summaries are truncated so the time suffix still fits.
pub fn fill_cells(grid: &CalendarGrid, events: &[EventMarker<'_>]) -> [CellText; GRID_CELLS] {
    let mut cells: [CellText; GRID_CELLS] = core::array::from_fn(|_| CellText::new());

    for (i, cell) in cells.iter_mut().enumerate() {
        if let Some(day) = grid.day_at_cell(i) {
            let _ = write!(cell, "{}", day);
        }
    }

    for event in events {
        if event.day == 0 || event.day > grid.month_len() {
            continue;
        }
        let cell = &mut cells[grid.cell_of_day(event.day)];
        cell.clear();
        let _ = write!(cell, "{}\n", event.day);
        let reserve = if event.minutes.is_some() { 8 } else { 0 };
        for ch in event.summary.chars() {
            if cell.len() + ch.len_utf8() + reserve > cell.capacity() {
                break;
            }
            let _ = cell.push(ch);
        }
        if let Some(minutes) = event.minutes {
            let _ = write!(cell, " @ {:02}:{:02}", minutes / 60, minutes % 60);
        }
    }

    cells
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarAction {
    PrevPage,
    NextPage,
    Refresh,
    ShowWeek,
    ShowMonth,
    OpenDay(u8),
    CloseDay,
}

#[derive(Clone, Copy)]
pub struct NavButton<'a> {
    text: &'a str,
    bounds: Rectangle,
}

impl<'a> NavButton<'a> {
    pub fn new(text: &'a str, bounds: Rectangle) -> Self {
        Self { text, bounds }
    }

    pub fn draw<D: DrawTarget<Color = Rgb>>(&self, display: &mut D) -> Result<(), D::Error> {
        let line_style = PrimitiveStyleBuilder::new()
            .stroke_color(Rgb::CSS_DIM_GRAY)
            .stroke_width(1)
            .fill_color(Rgb::BLACK)
            .build();
        self.bounds.into_styled(line_style).draw(display)?;

        Text::with_text_style(
            self.text,
            self.bounds.center(),
            text_text_style(Rgb::WHITE),
            TextStyleBuilder::new()
                .alignment(embedded_graphics::text::Alignment::Center)
                .baseline(embedded_graphics::text::Baseline::Middle)
                .build(),
        )
        .draw(display)?;
        Ok(())
    }

    // Check if point is within our range
    pub fn is_contained_by(&self, pos: Point) -> bool {
        let c1 = self.bounds.top_left;
        let c2 = c1 + Point::new(self.bounds.size.width as i32 - 1, self.bounds.size.height as i32 - 1);
        c1.x <= pos.x && c1.y <= pos.y && c2.x >= pos.x && c2.y >= pos.y
    }
}

// Button row slots, widths given in eighths of the frame width.
fn row_slots(frame: Rectangle, widths: [u32; 5]) -> [Rectangle; 5] {
    let eighth = frame.size.width / 8;
    let mut x = frame.top_left.x;
    core::array::from_fn(|i| {
        let w = widths[i] * eighth;
        let slot = Rectangle::new(Point::new(x, frame.top_left.y), Size::new(w, BUTTON_ROW));
        x += w as i32;
        slot
    })
}

fn grid_frame(frame: Rectangle) -> Rectangle {
    let top = (BUTTON_ROW + HEADER_ROW) as i32;
    Rectangle::new(
        frame.top_left + Point::new(0, top),
        Size::new(frame.size.width, frame.size.height.saturating_sub(BUTTON_ROW + HEADER_ROW)),
    )
}

fn draw_weekday_header<D: DrawTarget<Color = Rgb>>(frame: Rectangle, display: &mut D) -> Result<(), D::Error> {
    let cell_w = frame.size.width / GRID_COLS as u32;
    let y = frame.top_left.y + BUTTON_ROW as i32;
    let border = PrimitiveStyleBuilder::new()
        .stroke_color(Rgb::CSS_DIM_GRAY)
        .stroke_width(1)
        .build();
    for (col, name) in WEEKDAY_HEADER.iter().enumerate() {
        let bounds = Rectangle::new(
            Point::new(frame.top_left.x + col as i32 * cell_w as i32, y),
            Size::new(cell_w, HEADER_ROW),
        );
        bounds.into_styled(border).draw(display)?;
        Text::with_text_style(
            name,
            bounds.center(),
            text_text_style(Rgb::WHITE),
            TextStyleBuilder::new()
                .alignment(embedded_graphics::text::Alignment::Center)
                .baseline(embedded_graphics::text::Baseline::Middle)
                .build(),
        )
        .draw(display)?;
    }
    Ok(())
}

fn draw_cell<D: DrawTarget<Color = Rgb>>(text: &str, bounds: Rectangle, display: &mut D) -> Result<(), D::Error> {
    let border = PrimitiveStyleBuilder::new()
        .stroke_color(Rgb::CSS_DIM_GRAY)
        .stroke_width(1)
        .build();
    bounds.into_styled(border).draw(display)?;
    if !text.is_empty() {
        let inset = Rectangle::new(
            bounds.top_left + Point::new(3, 2),
            bounds.size.saturating_sub(Size::new(6, 4)),
        );
        TextBox::new(text, inset, text_text_style(Rgb::WHITE)).draw(display)?;
    }
    Ok(())
}

// Tap position to grid cell index, None on dead space around the grid.
fn cell_at(frame: Rectangle, rows: usize, pos: Point) -> Option<usize> {
    let grid = grid_frame(frame);
    if pos.x < grid.top_left.x || pos.y < grid.top_left.y {
        return None;
    }
    let cell_w = grid.size.width / GRID_COLS as u32;
    let cell_h = grid.size.height / rows as u32;
    if cell_w == 0 || cell_h == 0 {
        return None;
    }
    let col = ((pos.x - grid.top_left.x) as u32 / cell_w) as usize;
    let row = ((pos.y - grid.top_left.y) as u32 / cell_h) as usize;
    if col >= GRID_COLS || row >= rows {
        return None;
    }
    Some(row * GRID_COLS + col)
}

#[derive(Clone, Copy)]
pub struct MonthView<'a> {
    grid: &'a CalendarGrid,
    cells: &'a [CellText; GRID_CELLS],
    frame: Rectangle,
}

impl<'a> MonthView<'a> {
    pub fn new(grid: &'a CalendarGrid, cells: &'a [CellText; GRID_CELLS], frame: Rectangle) -> Self {
        Self { grid, cells, frame }
    }

    fn slots(&self) -> [Rectangle; 5] {
        row_slots(self.frame, [1, 2, 1, 2, 2])
    }

    pub fn draw<D: DrawTarget<Color = Rgb>>(&self, display: &mut D) -> Result<(), D::Error> {
        let [prev, label, next, refresh, weekly] = self.slots();
        NavButton::new("<<", prev).draw(display)?;
        NavButton::new(">>", next).draw(display)?;
        NavButton::new("Refresh", refresh).draw(display)?;
        NavButton::new("Show Weekly", weekly).draw(display)?;
        Text::with_text_style(
            &self.grid.label(),
            label.center(),
            text_text_style(Rgb::WHITE),
            TextStyleBuilder::new()
                .alignment(embedded_graphics::text::Alignment::Center)
                .baseline(embedded_graphics::text::Baseline::Middle)
                .build(),
        )
        .draw(display)?;

        draw_weekday_header(self.frame, display)?;

        let grid = grid_frame(self.frame);
        let cell_w = grid.size.width / GRID_COLS as u32;
        let cell_h = grid.size.height / GRID_ROWS as u32;
        for row in 0..GRID_ROWS {
            for col in 0..GRID_COLS {
                let bounds = Rectangle::new(
                    grid.top_left + Point::new(col as i32 * cell_w as i32, row as i32 * cell_h as i32),
                    Size::new(cell_w, cell_h),
                );
                draw_cell(&self.cells[row * GRID_COLS + col], bounds, display)?;
            }
        }
        Ok(())
    }

    pub fn hit(&self, pos: Point) -> Option<CalendarAction> {
        let [prev, _, next, refresh, weekly] = self.slots();
        if NavButton::new("<<", prev).is_contained_by(pos) {
            return Some(CalendarAction::PrevPage);
        }
        if NavButton::new(">>", next).is_contained_by(pos) {
            return Some(CalendarAction::NextPage);
        }
        if NavButton::new("Refresh", refresh).is_contained_by(pos) {
            return Some(CalendarAction::Refresh);
        }
        if NavButton::new("Show Weekly", weekly).is_contained_by(pos) {
            return Some(CalendarAction::ShowWeek);
        }
        let cell = cell_at(self.frame, GRID_ROWS, pos)?;
        self.grid.day_at_cell(cell).map(CalendarAction::OpenDay)
    }

    pub fn action_for(&self, gesture: TouchGesture) -> Option<CalendarAction> {
        match gesture {
            TouchGesture::SwipeLeft(_) => Some(CalendarAction::NextPage),
            TouchGesture::SwipeRight(_) => Some(CalendarAction::PrevPage),
            TouchGesture::SwipeUp(_) | TouchGesture::SwipeDown(_) => Some(CalendarAction::ShowWeek),
            TouchGesture::SingleTap(pos) => self.hit(pos),
        }
    }
}

#[derive(Clone, Copy)]
pub struct WeekView<'a> {
    grid: &'a CalendarGrid,
    cells: &'a [CellText; GRID_CELLS],
    frame: Rectangle,
}

impl<'a> WeekView<'a> {
    pub fn new(grid: &'a CalendarGrid, cells: &'a [CellText; GRID_CELLS], frame: Rectangle) -> Self {
        Self { grid, cells, frame }
    }

    fn slots(&self) -> [Rectangle; 5] {
        row_slots(self.frame, [1, 2, 1, 2, 2])
    }

    pub fn draw<D: DrawTarget<Color = Rgb>>(&self, display: &mut D) -> Result<(), D::Error> {
        let [prev, label, next, refresh, monthly] = self.slots();
        NavButton::new("<<", prev).draw(display)?;
        NavButton::new(">>", next).draw(display)?;
        NavButton::new("Refresh", refresh).draw(display)?;
        NavButton::new("Show Monthly", monthly).draw(display)?;
        Text::with_text_style(
            &self.grid.label(),
            label.center(),
            text_text_style(Rgb::WHITE),
            TextStyleBuilder::new()
                .alignment(embedded_graphics::text::Alignment::Center)
                .baseline(embedded_graphics::text::Baseline::Middle)
                .build(),
        )
        .draw(display)?;

        draw_weekday_header(self.frame, display)?;

        // One tall row for the current week.
        let grid = grid_frame(self.frame);
        let cell_w = grid.size.width / GRID_COLS as u32;
        for col in 0..GRID_COLS {
            let bounds = Rectangle::new(
                grid.top_left + Point::new(col as i32 * cell_w as i32, 0),
                Size::new(cell_w, grid.size.height),
            );
            draw_cell(&self.cells[self.grid.week_row() * GRID_COLS + col], bounds, display)?;
        }
        Ok(())
    }

    pub fn hit(&self, pos: Point) -> Option<CalendarAction> {
        let [prev, _, next, refresh, monthly] = self.slots();
        if NavButton::new("<<", prev).is_contained_by(pos) {
            return Some(CalendarAction::PrevPage);
        }
        if NavButton::new(">>", next).is_contained_by(pos) {
            return Some(CalendarAction::NextPage);
        }
        if NavButton::new("Refresh", refresh).is_contained_by(pos) {
            return Some(CalendarAction::Refresh);
        }
        if NavButton::new("Show Monthly", monthly).is_contained_by(pos) {
            return Some(CalendarAction::ShowMonth);
        }
        let col = cell_at(self.frame, 1, pos)?;
        let cell = self.grid.week_row() * GRID_COLS + col;
        self.grid.day_at_cell(cell).map(CalendarAction::OpenDay)
    }

    pub fn action_for(&self, gesture: TouchGesture) -> Option<CalendarAction> {
        match gesture {
            TouchGesture::SwipeLeft(_) => Some(CalendarAction::NextPage),
            TouchGesture::SwipeRight(_) => Some(CalendarAction::PrevPage),
            TouchGesture::SwipeUp(_) | TouchGesture::SwipeDown(_) => Some(CalendarAction::ShowMonth),
            TouchGesture::SingleTap(pos) => self.hit(pos),
        }
    }
}

#[derive(Clone, Copy)]
pub struct DayView<'a> {
    text: &'a str,
    frame: Rectangle,
}

impl<'a> DayView<'a> {
    pub fn new(text: &'a str, frame: Rectangle) -> Self {
        Self { text, frame }
    }

    pub fn draw<D: DrawTarget<Color = Rgb>>(&self, display: &mut D) -> Result<(), D::Error> {
        let border = PrimitiveStyleBuilder::new()
            .stroke_color(Rgb::CSS_DIM_GRAY)
            .stroke_width(1)
            .build();
        self.frame.into_styled(border).draw(display)?;

        let textbox_style = TextBoxStyleBuilder::new()
            .height_mode(embedded_text::style::HeightMode::FitToText)
            .alignment(embedded_text::alignment::HorizontalAlignment::Center)
            .paragraph_spacing(6)
            .build();
        let inset = Rectangle::new(
            self.frame.top_left + Point::new(8, 24),
            self.frame.size.saturating_sub(Size::new(16, 24)),
        );
        TextBox::with_textbox_style(self.text, inset, menu_text_style(Rgb::WHITE), textbox_style).draw(display)?;
        Ok(())
    }

    pub fn action_for(&self, _gesture: TouchGesture) -> Option<CalendarAction> {
        Some(CalendarAction::CloseDay)
    }
}

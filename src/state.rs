//! The mirror's view-state machine.
//!
//! One enum variant per visible screen. Each variant holds the content
//! it last composed, draws itself, and decides its successor; the main
//! loop redraws only when the successor compares unequal.

use std::fmt;

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use glance_ui::{
    fill_cells, CalendarAction, CalendarGrid, CellText, ClockView, DayView, MonthView, ScreenRegions, TouchGesture,
    WeatherReport, WeatherView, WeekView, GRID_CELLS,
};
use log::debug;
use time::{Date, Weekday};
use tokio::sync::{mpsc, watch};

use crate::device::Device;
use crate::error::Error;

/// Everything a screen shows, captured at composition time so that
/// `PartialEq` on states can suppress redundant redraws. The clock is
/// kept at minute precision.
#[derive(PartialEq)]
struct Content {
    now: time::PrimitiveDateTime,
    weather: Option<WeatherReport>,
    grid: CalendarGrid,
    cells: Box<[CellText; GRID_CELLS]>,
}

impl Content {
    fn compose(device: &mut Device, grid: CalendarGrid) -> Self {
        let weather = *device.weather.borrow_and_update();
        let cells = {
            let snapshot = device.calendar.borrow_and_update();
            let markers = if snapshot.covers(grid.year(), u8::from(grid.month())) {
                snapshot.markers()
            } else {
                // Snapshot for another month; show bare day numbers.
                Vec::new()
            };
            Box::new(fill_cells(&grid, &markers))
        };
        Self {
            now: device.clock.minute(),
            weather,
            grid,
            cells,
        }
    }
}

/// Weather and clock header, shared by every screen. Returns the split
/// so the caller can place its calendar variant.
fn draw_chrome(content: &Content, device: &mut Device) -> Result<ScreenRegions, Error> {
    let regions = ScreenRegions::split(device.screen.size());
    let frame = device.screen.frame();
    frame.clear(Rgb565::BLACK)?;
    WeatherView::new(content.weather, regions.weather).draw(frame)?;
    ClockView::new(content.now, regions.clock).draw(frame)?;
    Ok(regions)
}

enum Wake {
    /// Second tick or a fresh snapshot; recompose and compare.
    Data,
    Daily,
    Touch(TouchGesture),
}

async fn wake(device: &mut Device) -> Wake {
    tokio::select! {
        _ = device.second.tick() => Wake::Data,
        _ = device.daily.tick() => Wake::Daily,
        _ = data_change(&mut device.weather) => Wake::Data,
        _ = data_change(&mut device.calendar) => Wake::Data,
        gesture = next_gesture(&mut device.touch) => Wake::Touch(gesture),
    }
}

async fn data_change<T>(channel: &mut watch::Receiver<T>) {
    if channel.changed().await.is_err() {
        // Sender task gone; the last value stays on screen.
        std::future::pending::<()>().await;
    }
}

async fn next_gesture(touch: &mut mpsc::Receiver<TouchGesture>) -> TouchGesture {
    match touch.recv().await {
        Some(gesture) => gesture,
        // Reader thread gone; the mirror stays up without touch.
        None => std::future::pending().await,
    }
}

/// Sunday housekeeping recenters the calendar on today.
fn recentered(today: Date, grid: &mut CalendarGrid) -> bool {
    if today.weekday() == Weekday::Sunday {
        grid.set_date(today);
        debug!("weekly recenter to {today}");
        true
    } else {
        false
    }
}

/// Daily tick: always refetch, and on Sundays hand back the recentered
/// grid so the caller can fall back to its resting view.
fn daily_tick(device: &mut Device, grid: CalendarGrid) -> Option<CalendarGrid> {
    let mut grid = grid;
    let snapped = recentered(device.clock.now().date(), &mut grid);
    device.request_fetch(grid.year(), u8::from(grid.month()));
    snapped.then_some(grid)
}

#[derive(PartialEq)]
pub enum MirrorState {
    Week(WeekState),
    Month(MonthState),
    Day(DayState),
}

impl fmt::Debug for MirrorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Week(_) => f.write_str("Week"),
            Self::Month(_) => f.write_str("Month"),
            Self::Day(_) => f.write_str("Day"),
        }
    }
}

impl MirrorState {
    /// The week view of today.
    pub fn startup(device: &mut Device) -> Self {
        let grid = CalendarGrid::for_date(device.clock.now().date());
        Self::Week(WeekState::new(device, grid))
    }

    pub async fn draw(&self, device: &mut Device) -> Result<(), Error> {
        match self {
            Self::Week(state) => state.draw(device).await,
            Self::Month(state) => state.draw(device).await,
            Self::Day(state) => state.draw(device).await,
        }
    }

    pub async fn next(&mut self, device: &mut Device) -> MirrorState {
        match self {
            Self::Week(state) => state.next(device).await,
            Self::Month(state) => state.next(device).await,
            Self::Day(state) => state.next(device).await,
        }
    }
}

#[derive(PartialEq)]
pub struct WeekState {
    content: Content,
}

impl WeekState {
    fn new(device: &mut Device, grid: CalendarGrid) -> Self {
        Self {
            content: Content::compose(device, grid),
        }
    }

    async fn draw(&self, device: &mut Device) -> Result<(), Error> {
        let regions = draw_chrome(&self.content, device)?;
        WeekView::new(&self.content.grid, &self.content.cells, regions.calendar).draw(device.screen.frame())?;
        device.screen.flush()?;
        Ok(())
    }

    async fn next(&mut self, device: &mut Device) -> MirrorState {
        loop {
            match wake(device).await {
                Wake::Data => {
                    let fresh = Content::compose(device, self.content.grid);
                    if fresh != self.content {
                        return MirrorState::Week(WeekState { content: fresh });
                    }
                }
                Wake::Daily => {
                    if let Some(grid) = daily_tick(device, self.content.grid) {
                        return MirrorState::Week(WeekState::new(device, grid));
                    }
                }
                Wake::Touch(gesture) => {
                    let regions = ScreenRegions::split(device.screen.size());
                    let view = WeekView::new(&self.content.grid, &self.content.cells, regions.calendar);
                    match view.action_for(gesture) {
                        Some(CalendarAction::PrevPage) => {
                            let mut grid = self.content.grid;
                            grid.prev_week();
                            device.request_fetch(grid.year(), u8::from(grid.month()));
                            return MirrorState::Week(WeekState::new(device, grid));
                        }
                        Some(CalendarAction::NextPage) => {
                            let mut grid = self.content.grid;
                            grid.next_week();
                            device.request_fetch(grid.year(), u8::from(grid.month()));
                            return MirrorState::Week(WeekState::new(device, grid));
                        }
                        Some(CalendarAction::Refresh) => {
                            let grid = &self.content.grid;
                            device.request_fetch(grid.year(), u8::from(grid.month()));
                        }
                        Some(CalendarAction::ShowMonth) => {
                            return MirrorState::Month(MonthState::new(device, self.content.grid));
                        }
                        Some(CalendarAction::OpenDay(day)) => {
                            return MirrorState::Day(DayState::new(device, self.content.grid, day, DayOrigin::Week));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

#[derive(PartialEq)]
pub struct MonthState {
    content: Content,
}

impl MonthState {
    fn new(device: &mut Device, grid: CalendarGrid) -> Self {
        Self {
            content: Content::compose(device, grid),
        }
    }

    async fn draw(&self, device: &mut Device) -> Result<(), Error> {
        let regions = draw_chrome(&self.content, device)?;
        MonthView::new(&self.content.grid, &self.content.cells, regions.calendar).draw(device.screen.frame())?;
        device.screen.flush()?;
        Ok(())
    }

    async fn next(&mut self, device: &mut Device) -> MirrorState {
        loop {
            match wake(device).await {
                Wake::Data => {
                    let fresh = Content::compose(device, self.content.grid);
                    if fresh != self.content {
                        return MirrorState::Month(MonthState { content: fresh });
                    }
                }
                Wake::Daily => {
                    if let Some(grid) = daily_tick(device, self.content.grid) {
                        return MirrorState::Month(MonthState::new(device, grid));
                    }
                }
                Wake::Touch(gesture) => {
                    let regions = ScreenRegions::split(device.screen.size());
                    let view = MonthView::new(&self.content.grid, &self.content.cells, regions.calendar);
                    match view.action_for(gesture) {
                        Some(CalendarAction::PrevPage) => {
                            let mut grid = self.content.grid;
                            grid.prev_month();
                            device.request_fetch(grid.year(), u8::from(grid.month()));
                            return MirrorState::Month(MonthState::new(device, grid));
                        }
                        Some(CalendarAction::NextPage) => {
                            let mut grid = self.content.grid;
                            grid.next_month();
                            device.request_fetch(grid.year(), u8::from(grid.month()));
                            return MirrorState::Month(MonthState::new(device, grid));
                        }
                        Some(CalendarAction::Refresh) => {
                            let grid = &self.content.grid;
                            device.request_fetch(grid.year(), u8::from(grid.month()));
                        }
                        Some(CalendarAction::ShowWeek) => {
                            return MirrorState::Week(WeekState::new(device, self.content.grid));
                        }
                        Some(CalendarAction::OpenDay(day)) => {
                            return MirrorState::Day(DayState::new(device, self.content.grid, day, DayOrigin::Month));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayOrigin {
    Week,
    Month,
}

#[derive(PartialEq)]
pub struct DayState {
    /// The opened day, independent of the grid cursor.
    day: u8,
    origin: DayOrigin,
    content: Content,
}

impl DayState {
    fn new(device: &mut Device, grid: CalendarGrid, day: u8, origin: DayOrigin) -> Self {
        Self {
            day,
            origin,
            content: Content::compose(device, grid),
        }
    }

    fn text(&self) -> &str {
        self.content.cells[self.content.grid.cell_of_day(self.day)].as_str()
    }

    async fn draw(&self, device: &mut Device) -> Result<(), Error> {
        let regions = draw_chrome(&self.content, device)?;
        DayView::new(self.text(), regions.calendar).draw(device.screen.frame())?;
        device.screen.flush()?;
        Ok(())
    }

    async fn next(&mut self, device: &mut Device) -> MirrorState {
        loop {
            match wake(device).await {
                Wake::Data => {
                    let fresh = Content::compose(device, self.content.grid);
                    if fresh != self.content {
                        return MirrorState::Day(DayState {
                            day: self.day,
                            origin: self.origin,
                            content: fresh,
                        });
                    }
                }
                Wake::Daily => {
                    // An open day falls back to the week on the snap.
                    if let Some(grid) = daily_tick(device, self.content.grid) {
                        return MirrorState::Week(WeekState::new(device, grid));
                    }
                }
                Wake::Touch(gesture) => {
                    let regions = ScreenRegions::split(device.screen.size());
                    let view = DayView::new(self.text(), regions.calendar);
                    if let Some(CalendarAction::CloseDay) = view.action_for(gesture) {
                        return match self.origin {
                            DayOrigin::Week => MirrorState::Week(WeekState::new(device, self.content.grid)),
                            DayOrigin::Month => MirrorState::Month(MonthState::new(device, self.content.grid)),
                        };
                    }
                }
            }
        }
    }
}

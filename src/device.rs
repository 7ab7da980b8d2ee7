//! The assembled appliance: panel, touch stream, data feeds and tick
//! sources, bundled for the state machine.

use std::time::Duration;

use embedded_graphics::prelude::{OriginDimensions, Size};
use glance_ui::TouchGesture;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};

use crate::calendar::{CalendarSnapshot, FetchRequest};
use crate::clock::{Clock, CLOCK_TICK};
use crate::config::DisplayConfig;
use crate::panel::{FbPanel, FrameBuffer, PanelError};
use crate::weather::WeatherReport;

/// Cadence of the housekeeping tick that re-centers the views on the
/// current week.
pub const DAILY_TICK: Duration = Duration::from_secs(24 * 60 * 60);

/// The drawable frame and the panel it lands on.
pub struct Screen {
    frame: FrameBuffer,
    panel: FbPanel,
}

impl Screen {
    pub fn new(config: &DisplayConfig) -> Result<Self, PanelError> {
        Ok(Self {
            frame: FrameBuffer::new(config.width, config.height),
            panel: FbPanel::open(config)?,
        })
    }

    pub fn frame(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }

    pub fn size(&self) -> Size {
        self.frame.size()
    }

    pub fn flush(&mut self) -> Result<(), PanelError> {
        self.panel.flush(&self.frame)
    }
}

pub struct Device {
    pub clock: Clock,
    pub screen: Screen,
    pub touch: mpsc::Receiver<TouchGesture>,
    pub weather: watch::Receiver<Option<WeatherReport>>,
    pub calendar: watch::Receiver<CalendarSnapshot>,
    fetch: watch::Sender<FetchRequest>,
    pub second: Interval,
    pub daily: Interval,
}

impl Device {
    pub fn new(
        clock: Clock,
        screen: Screen,
        touch: mpsc::Receiver<TouchGesture>,
        weather: watch::Receiver<Option<WeatherReport>>,
        calendar: watch::Receiver<CalendarSnapshot>,
        fetch: watch::Sender<FetchRequest>,
    ) -> Self {
        let mut second = interval(CLOCK_TICK);
        second.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The calendar task covers startup with its own first tick; the
        // first housekeeping tick lands a full period out.
        let mut daily = interval_at(Instant::now() + DAILY_TICK, DAILY_TICK);
        daily.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            clock,
            screen,
            touch,
            weather,
            calendar,
            fetch,
            second,
            daily,
        }
    }

    /// Asks the calendar task for a month. A newer request replaces any
    /// still waiting; only the last visible month matters.
    pub fn request_fetch(&self, year: i32, month: u8) {
        self.fetch.send_replace(FetchRequest { year, month });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_requests_keep_only_the_newest() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = DisplayConfig {
            device: file.path().to_path_buf(),
            width: 4,
            height: 2,
            bpp: 16,
        };
        let screen = Screen::new(&config).unwrap();
        let (_touch_tx, touch_rx) = mpsc::channel(1);
        let (_weather_tx, weather_rx) = watch::channel(None);
        let (_calendar_tx, calendar_rx) = watch::channel(CalendarSnapshot::default());
        let (fetch_tx, mut fetch_rx) = watch::channel(FetchRequest { year: 2026, month: 8 });

        let device = Device::new(
            Clock::fixed(time::UtcOffset::UTC),
            screen,
            touch_rx,
            weather_rx,
            calendar_rx,
            fetch_tx,
        );

        // A burst during an in-flight fetch must not lose the last month.
        device.request_fetch(2026, 9);
        device.request_fetch(2026, 10);
        device.request_fetch(2027, 1);

        assert!(fetch_rx.has_changed().unwrap());
        assert_eq!(*fetch_rx.borrow_and_update(), FetchRequest { year: 2027, month: 1 });
        assert!(!fetch_rx.has_changed().unwrap());
    }
}

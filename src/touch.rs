//! Touch input from a Linux evdev device.
//!
//! A blocking reader thread consumes raw `input_event` records and runs
//! them through [`GestureTracker`], which scales raw coordinates into
//! panel space and classifies each press/release pair as a tap or a
//! swipe. Finished gestures go to the UI over a bounded channel.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use embedded_graphics::prelude::Point;
use glance_ui::TouchGesture;
use log::warn;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::TouchConfig;

/// Press and release within this box is a tap.
const TAP_SLOP: i32 = 25;
/// Dominant-axis travel needed for a swipe.
const SWIPE_MIN: i32 = 60;

const EV_KEY: u16 = 0x01;
const EV_ABS: u16 = 0x03;
const ABS_X: u16 = 0x00;
const ABS_Y: u16 = 0x01;
const BTN_TOUCH: u16 = 0x14a;

// struct input_event leads with a timeval, which is two longs.
#[cfg(target_pointer_width = "64")]
const RECORD_LEN: usize = 24;
#[cfg(not(target_pointer_width = "64"))]
const RECORD_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum TouchError {
    #[error("could not open touch device {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Type, code and value of one kernel record. The timestamp is ignored.
fn split_record(record: &[u8; RECORD_LEN]) -> (u16, u16, i32) {
    let tail = &record[RECORD_LEN - 8..];
    (
        u16::from_ne_bytes([tail[0], tail[1]]),
        u16::from_ne_bytes([tail[2], tail[3]]),
        i32::from_ne_bytes([tail[4], tail[5], tail[6], tail[7]]),
    )
}

/// Stateful press/release classifier. Coordinate events arrive before
/// the `BTN_TOUCH` press on the usual controllers, so the tracker keeps
/// the latest raw position at all times.
pub struct GestureTracker {
    config: TouchConfig,
    width: u32,
    height: u32,
    raw_x: i32,
    raw_y: i32,
    down: Option<Point>,
}

impl GestureTracker {
    pub fn new(config: TouchConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            width,
            height,
            raw_x: 0,
            raw_y: 0,
            down: None,
        }
    }

    /// Raw digitizer coordinates mapped to panel pixels: swap first,
    /// then invert, then scale against the raw range.
    fn to_panel(&self, raw_x: i32, raw_y: i32) -> Point {
        let (mut x, mut y, max_x, max_y) = if self.config.swap_axes {
            (raw_y, raw_x, self.config.raw_max_y as i32, self.config.raw_max_x as i32)
        } else {
            (raw_x, raw_y, self.config.raw_max_x as i32, self.config.raw_max_y as i32)
        };
        if self.config.invert_x {
            x = max_x - x;
        }
        if self.config.invert_y {
            y = max_y - y;
        }
        let px = x.clamp(0, max_x) as i64 * (self.width as i64 - 1) / max_x.max(1) as i64;
        let py = y.clamp(0, max_y) as i64 * (self.height as i64 - 1) / max_y.max(1) as i64;
        Point::new(px as i32, py as i32)
    }

    /// Feeds one record; returns a gesture when a release completes one.
    pub fn feed(&mut self, kind: u16, code: u16, value: i32) -> Option<TouchGesture> {
        match (kind, code) {
            (EV_ABS, ABS_X) => self.raw_x = value,
            (EV_ABS, ABS_Y) => self.raw_y = value,
            (EV_KEY, BTN_TOUCH) if value == 1 => {
                self.down = Some(self.to_panel(self.raw_x, self.raw_y));
            }
            (EV_KEY, BTN_TOUCH) if value == 0 => {
                // A release with no recorded press is noise.
                let down = self.down.take()?;
                let up = self.to_panel(self.raw_x, self.raw_y);
                return classify(down, up);
            }
            _ => {}
        }
        None
    }
}

/// Taps report where the finger lifted, swipes where it landed.
fn classify(down: Point, up: Point) -> Option<TouchGesture> {
    let dx = up.x - down.x;
    let dy = up.y - down.y;
    if dx.abs() < TAP_SLOP && dy.abs() < TAP_SLOP {
        return Some(TouchGesture::SingleTap(up));
    }
    if dx.abs() >= dy.abs() {
        if dx.abs() >= SWIPE_MIN {
            return Some(if dx > 0 {
                TouchGesture::SwipeRight(down)
            } else {
                TouchGesture::SwipeLeft(down)
            });
        }
    } else if dy.abs() >= SWIPE_MIN {
        return Some(if dy > 0 {
            TouchGesture::SwipeDown(down)
        } else {
            TouchGesture::SwipeUp(down)
        });
    }
    None
}

/// Opens the touch device and spawns the blocking reader thread.
pub fn spawn_reader(
    config: TouchConfig,
    width: u32,
    height: u32,
) -> Result<mpsc::Receiver<TouchGesture>, TouchError> {
    let file = File::open(&config.device).map_err(|source| TouchError::Open {
        path: config.device.clone(),
        source,
    })?;
    let (gestures, receiver) = mpsc::channel(8);
    let tracker = GestureTracker::new(config, width, height);
    std::thread::spawn(move || read_loop(file, tracker, gestures));
    Ok(receiver)
}

fn read_loop(mut file: File, mut tracker: GestureTracker, gestures: mpsc::Sender<TouchGesture>) {
    let mut record = [0u8; RECORD_LEN];
    loop {
        if let Err(err) = file.read_exact(&mut record) {
            warn!("touch device read failed: {err}");
            return;
        }
        let (kind, code, value) = split_record(&record);
        if let Some(gesture) = tracker.feed(kind, code, value) {
            // When the UI lags, stale touches are dropped, not queued.
            if let Err(TrySendError::Closed(_)) = gestures.try_send(gesture) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_config() -> TouchConfig {
        TouchConfig {
            device: PathBuf::from("/dev/null"),
            raw_max_x: 479,
            raw_max_y: 799,
            swap_axes: false,
            invert_x: false,
            invert_y: false,
        }
    }

    fn press(tracker: &mut GestureTracker, x: i32, y: i32) {
        assert_eq!(tracker.feed(EV_ABS, ABS_X, x), None);
        assert_eq!(tracker.feed(EV_ABS, ABS_Y, y), None);
        assert_eq!(tracker.feed(EV_KEY, BTN_TOUCH, 1), None);
    }

    fn release(tracker: &mut GestureTracker, x: i32, y: i32) -> Option<TouchGesture> {
        tracker.feed(EV_ABS, ABS_X, x);
        tracker.feed(EV_ABS, ABS_Y, y);
        tracker.feed(EV_KEY, BTN_TOUCH, 0)
    }

    #[test]
    fn small_wobble_is_a_tap() {
        let mut tracker = GestureTracker::new(identity_config(), 480, 800);
        press(&mut tracker, 100, 100);
        assert_eq!(
            release(&mut tracker, 110, 95),
            Some(TouchGesture::SingleTap(Point::new(110, 95)))
        );
    }

    #[test]
    fn horizontal_drags_swipe() {
        let mut tracker = GestureTracker::new(identity_config(), 480, 800);
        press(&mut tracker, 400, 300);
        assert_eq!(
            release(&mut tracker, 200, 310),
            Some(TouchGesture::SwipeLeft(Point::new(400, 300)))
        );

        press(&mut tracker, 100, 300);
        let gesture = release(&mut tracker, 320, 290).unwrap();
        assert_eq!(gesture, TouchGesture::SwipeRight(Point::new(100, 300)));
        assert_eq!(gesture.point(), Point::new(100, 300));
    }

    #[test]
    fn vertical_drags_swipe() {
        let mut tracker = GestureTracker::new(identity_config(), 480, 800);
        press(&mut tracker, 240, 600);
        assert_eq!(
            release(&mut tracker, 240, 400),
            Some(TouchGesture::SwipeUp(Point::new(240, 600)))
        );

        press(&mut tracker, 240, 200);
        assert_eq!(
            release(&mut tracker, 250, 500),
            Some(TouchGesture::SwipeDown(Point::new(240, 200)))
        );
    }

    #[test]
    fn drag_between_slop_and_swipe_is_nothing() {
        let mut tracker = GestureTracker::new(identity_config(), 480, 800);
        press(&mut tracker, 100, 100);
        assert_eq!(release(&mut tracker, 140, 100), None);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut tracker = GestureTracker::new(identity_config(), 480, 800);
        assert_eq!(tracker.feed(EV_KEY, BTN_TOUCH, 0), None);
    }

    #[test]
    fn swap_and_invert_remap_the_panel() {
        let config = TouchConfig {
            device: PathBuf::from("/dev/null"),
            // Post-swap, panel x spans the device y range.
            raw_max_x: 799,
            raw_max_y: 479,
            swap_axes: true,
            invert_x: true,
            invert_y: false,
        };
        let mut tracker = GestureTracker::new(config, 480, 800);
        press(&mut tracker, 100, 30);
        assert_eq!(
            release(&mut tracker, 100, 30),
            Some(TouchGesture::SingleTap(Point::new(449, 100)))
        );
    }

    #[test]
    fn records_split_into_type_code_value() {
        let mut record = [0u8; RECORD_LEN];
        let tail = RECORD_LEN - 8;
        record[tail..tail + 2].copy_from_slice(&EV_ABS.to_ne_bytes());
        record[tail + 2..tail + 4].copy_from_slice(&ABS_X.to_ne_bytes());
        record[tail + 4..].copy_from_slice(&1234i32.to_ne_bytes());
        assert_eq!(split_record(&record), (EV_ABS, ABS_X, 1234));
    }
}

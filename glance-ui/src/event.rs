use embedded_graphics::prelude::Point;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TouchGesture {
    SingleTap(Point),
    SwipeUp(Point),
    SwipeDown(Point),
    SwipeLeft(Point),
    SwipeRight(Point),
}

impl TouchGesture {
    pub fn point(&self) -> Point {
        match *self {
            Self::SingleTap(point) => point,
            Self::SwipeUp(point) => point,
            Self::SwipeDown(point) => point,
            Self::SwipeLeft(point) => point,
            Self::SwipeRight(point) => point,
        }
    }
}

//! Motion curve segments and evaluation.
//!
//! Segments are encoded as a flat number list: the first two numbers are the
//! start point `(time, value)`, then each segment is a type tag followed by its
//! points (the start point is shared with the previous segment's end):
//! - 0 linear: 1 point
//! - 1 bezier: 3 points (two control points, then the end point)
//! - 2 stepped: 1 point (holds the left value)
//! - 3 inverse stepped: 1 point (takes the right value)

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub time: f32,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Linear([Point; 2]),
    Bezier([Point; 4]),
    Stepped([Point; 2]),
    InverseStepped([Point; 2]),
}

impl Segment {
    fn start(&self) -> Point {
        match self {
            Segment::Linear(p) | Segment::Stepped(p) | Segment::InverseStepped(p) => p[0],
            Segment::Bezier(p) => p[0],
        }
    }

    fn end(&self) -> Point {
        match self {
            Segment::Linear(p) | Segment::Stepped(p) | Segment::InverseStepped(p) => p[1],
            Segment::Bezier(p) => p[3],
        }
    }

    fn evaluate(&self, time: f32) -> f32 {
        match self {
            Segment::Linear([a, b]) => lerp(a.value, b.value, ratio(*a, *b, time)),
            Segment::Bezier([p0, p1, p2, p3]) => {
                // De Casteljau on the normalized segment ratio.
                let t = ratio(*p0, *p3, time);
                let p01 = lerp(p0.value, p1.value, t);
                let p12 = lerp(p1.value, p2.value, t);
                let p23 = lerp(p2.value, p3.value, t);
                let p012 = lerp(p01, p12, t);
                let p123 = lerp(p12, p23, t);
                lerp(p012, p123, t)
            }
            Segment::Stepped([a, _]) => a.value,
            Segment::InverseStepped([_, b]) => b.value,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn ratio(a: Point, b: Point, time: f32) -> f32 {
    let span = b.time - a.time;
    if span <= 0.0 {
        return 0.0;
    }
    ((time - a.time) / span).max(0.0)
}

/// A parsed segment list for one curve.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentList {
    segments: Vec<Segment>,
    first: Option<Point>,
}

impl SegmentList {
    pub fn parse(flat: &[f32]) -> Result<Self, String> {
        if flat.is_empty() {
            return Ok(Self::default());
        }
        if flat.len() < 2 {
            return Err("segment list shorter than a start point".into());
        }
        let pt = |i: usize| Point {
            time: flat[i],
            value: flat[i + 1],
        };
        let first = pt(0);
        let mut last = first;
        let mut segments = Vec::new();
        let mut i = 2;
        while i < flat.len() {
            let tag = flat[i];
            i += 1;
            let need = if tag == 1.0 { 6 } else { 2 };
            if i + need > flat.len() {
                return Err(format!("segment at {} truncated", i - 1));
            }
            let seg = match tag as i32 {
                0 => Segment::Linear([last, pt(i)]),
                1 => Segment::Bezier([last, pt(i), pt(i + 2), pt(i + 4)]),
                2 => Segment::Stepped([last, pt(i)]),
                3 => Segment::InverseStepped([last, pt(i)]),
                other => return Err(format!("unknown segment type {other}")),
            };
            last = seg.end();
            segments.push(seg);
            i += need;
        }
        Ok(Self {
            segments,
            first: Some(first),
        })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Value at `time` seconds. Past the last point the last value holds.
    pub fn evaluate(&self, time: f32) -> f32 {
        let Some(first) = self.first else {
            return 0.0;
        };
        if self.segments.is_empty() {
            return first.value;
        }
        match self.segments.iter().find(|s| s.end().time > time) {
            Some(seg) => seg.evaluate(time),
            None => self.segments[self.segments.len() - 1].end().value,
        }
    }

    pub fn start_time(&self) -> f32 {
        self.segments.first().map_or(0.0, |s| s.start().time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn linear_then_stepped() {
        // (0,0) -linear-> (1,10) -stepped-> (2,20)
        let s = SegmentList::parse(&[0.0, 0.0, 0.0, 1.0, 10.0, 2.0, 2.0, 20.0]).unwrap();
        assert_eq!(s.len(), 2);
        assert_relative_eq!(s.evaluate(0.5), 5.0);
        assert_relative_eq!(s.evaluate(1.5), 10.0);
        assert_relative_eq!(s.evaluate(3.0), 20.0);
    }

    #[test]
    fn bezier_endpoints_and_midpoint() {
        // Symmetric control points along a straight line evaluate linearly.
        let s = SegmentList::parse(&[
            0.0, 0.0, 1.0, 1.0 / 3.0, 1.0, 2.0 / 3.0, 2.0, 1.0, 3.0,
        ])
        .unwrap();
        assert_relative_eq!(s.evaluate(0.0), 0.0);
        assert_relative_eq!(s.evaluate(0.5), 1.5, epsilon = 1e-5);
        assert_relative_eq!(s.evaluate(1.0), 3.0);
    }

    #[test]
    fn inverse_stepped_takes_right_value() {
        let s = SegmentList::parse(&[0.0, 1.0, 3.0, 1.0, 5.0]).unwrap();
        assert_relative_eq!(s.evaluate(0.2), 5.0);
    }

    #[test]
    fn truncated_segment_is_rejected() {
        assert!(SegmentList::parse(&[0.0, 0.0, 1.0, 0.5, 0.5]).is_err());
        assert!(SegmentList::parse(&[0.0, 0.0, 9.0, 1.0, 1.0]).is_err());
    }
}

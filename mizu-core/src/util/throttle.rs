use std::time::{Duration, Instant};

/// Rate-limits progress values flowing into a UI sink.
///
/// At most one value is forwarded per `interval`; `finish` always forwards the
/// final `1.0` so a consumer never stalls short of completion.
pub struct ThrottledProgress<F: FnMut(f32)> {
    sink: F,
    interval: Duration,
    last_emit: Option<Instant>,
    last_value: Option<f32>,
}

impl<F: FnMut(f32)> ThrottledProgress<F> {
    pub fn new(interval: Duration, sink: F) -> Self {
        Self {
            sink,
            interval,
            last_emit: None,
            last_value: None,
        }
    }

    pub fn report(&mut self, fraction: f32) {
        let fraction = fraction.clamp(0.0, 1.0);
        let due = match self.last_emit {
            None => true,
            Some(t) => t.elapsed() >= self.interval,
        };
        if due {
            self.emit(fraction);
        }
    }

    pub fn finish(&mut self) {
        if self.last_value != Some(1.0) {
            self.emit(1.0);
        }
    }

    fn emit(&mut self, fraction: f32) {
        (self.sink)(fraction);
        self.last_emit = Some(Instant::now());
        self.last_value = Some(fraction);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Busy,
}

/// Lets one request run at a time and keeps only the newest one waiting.
///
/// Requests arriving while busy overwrite a single slot instead of queueing.
/// When the running request completes, the newest request is handed out if
/// it differs from the one just processed.
#[derive(Debug, Clone)]
pub struct Coalescer<T> {
    state: State,
    latest: Option<T>,
    in_flight: Option<T>,
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            state: State::Idle,
            latest: None,
            in_flight: None,
        }
    }
}

impl<T: Clone + PartialEq> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.state == State::Busy
    }

    /// Returns the request to process now, or `None` if it was parked.
    pub fn request(&mut self, request: T) -> Option<T> {
        self.latest = Some(request.clone());
        match self.state {
            State::Busy => None,
            State::Idle => {
                self.state = State::Busy;
                self.in_flight = Some(request.clone());
                Some(request)
            }
        }
    }

    /// Marks the running request done. Returns the next request to process
    /// (staying busy), or `None` after going idle.
    pub fn complete(&mut self) -> Option<T> {
        if self.state == State::Idle {
            return None;
        }
        let processed = self.in_flight.take();
        match &self.latest {
            Some(latest) if processed.as_ref() != Some(latest) => {
                self.in_flight = Some(latest.clone());
                Some(latest.clone())
            }
            _ => {
                self.state = State::Idle;
                None
            }
        }
    }
}

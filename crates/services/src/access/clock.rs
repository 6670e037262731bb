use bson::DateTime;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}

/// Test clock that only moves when told to.
#[cfg(test)]
pub(crate) struct ManualClock {
    millis: parking_lot::Mutex<i64>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new(start: DateTime) -> Self {
        Self {
            millis: parking_lot::Mutex::new(start.timestamp_millis()),
        }
    }

    pub(crate) fn set(&self, at: DateTime) {
        *self.millis.lock() = at.timestamp_millis();
    }

    pub(crate) fn advance(&self, by: chrono::Duration) {
        *self.millis.lock() += by.num_milliseconds();
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime {
        DateTime::from_millis(*self.millis.lock())
    }
}

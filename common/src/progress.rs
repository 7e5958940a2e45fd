#[derive(Debug, Default)]
pub struct Counter {
    value: std::sync::atomic::AtomicU64,
}

impl Counter {
    pub fn add(&self, value: u64) {
        self.value
            .fetch_add(value, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn inc(&self) {
        self.add(1);
    }

    pub fn get(&self) -> u64 {
        self.value.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Live counters for one batch, updated by its tasks.
#[derive(Debug, Default)]
pub struct Progress {
    pub objects_submitted: Counter,
    pub objects_transferred: Counter,
    pub objects_failed: Counter,
    /// Directory markers and entries that are not regular files
    pub objects_skipped: Counter,
    pub bytes_transferred: Counter,
}

impl Progress {
    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            objects_submitted: self.objects_submitted.get(),
            objects_transferred: self.objects_transferred.get(),
            objects_failed: self.objects_failed.get(),
            objects_skipped: self.objects_skipped.get(),
            bytes_transferred: self.bytes_transferred.get(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub objects_submitted: u64,
    pub objects_transferred: u64,
    pub objects_failed: u64,
    pub objects_skipped: u64,
    pub bytes_transferred: u64,
}

impl std::ops::Add for Summary {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self {
            objects_submitted: self.objects_submitted + other.objects_submitted,
            objects_transferred: self.objects_transferred + other.objects_transferred,
            objects_failed: self.objects_failed + other.objects_failed,
            objects_skipped: self.objects_skipped + other.objects_skipped,
            bytes_transferred: self.bytes_transferred + other.bytes_transferred,
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "objects submitted: {}\n\
            objects transferred: {}\n\
            objects failed: {}\n\
            objects skipped: {}\n\
            bytes transferred: {}",
            self.objects_submitted,
            self.objects_transferred,
            self.objects_failed,
            self.objects_skipped,
            bytesize::ByteSize(self.bytes_transferred),
        )
    }
}

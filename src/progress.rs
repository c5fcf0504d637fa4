use crate::index::Selector;
use std::fmt;
use std::time::Duration;

/// A step of a fetch or an index materialization, as reported to a [`ProgressObserver`].
///
/// `Display` renders the message a human would want in a log file, e.g.
/// `[fatcache] <"numbers"> indexing on [is_odd] done! 0 minutes, 3 seconds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    FetchStarted {
        cache: String,
        key: String,
    },
    FetchFinished {
        cache: String,
        key: String,
        elapsed: Duration,
    },
    IndexStarted {
        cache: String,
        key: String,
        selector: Selector,
    },
    IndexFinished {
        cache: String,
        key: String,
        selector: Selector,
        elapsed: Duration,
    },
}

impl Progress {
    pub fn key(&self) -> &str {
        match self {
            Progress::FetchStarted { key, .. }
            | Progress::FetchFinished { key, .. }
            | Progress::IndexStarted { key, .. }
            | Progress::IndexFinished { key, .. } => key,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Progress::FetchFinished { elapsed, .. } | Progress::IndexFinished { elapsed, .. } => {
                Some(*elapsed)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::FetchStarted { cache, key } => write!(f, "[{cache}] <{key}> fetching ..."),
            Progress::FetchFinished {
                cache,
                key,
                elapsed,
            } => write!(f, "[{cache}] <{key}> done! {}", Took(*elapsed)),
            Progress::IndexStarted {
                cache,
                key,
                selector,
            } => write!(f, "[{cache}] <{key}> indexing on {selector} ..."),
            Progress::IndexFinished {
                cache,
                key,
                selector,
                elapsed,
            } => write!(
                f,
                "[{cache}] <{key}> indexing on {selector} done! {}",
                Took(*elapsed)
            ),
        }
    }
}

struct Took(Duration);

impl fmt::Display for Took {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.0.as_secs();
        write!(f, "{} minutes, {} seconds", seconds / 60, seconds % 60)
    }
}

/// Advisory sink for [`Progress`] events. It has no influence on cache behavior.
pub trait ProgressObserver {
    fn notify(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress),
{
    fn notify(&self, progress: &Progress) {
        self(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_messages_name_the_key() {
        let started = Progress::FetchStarted {
            cache: "fatcache".into(),
            key: "\"you\"".into(),
        };
        let finished = Progress::FetchFinished {
            cache: "fatcache".into(),
            key: "\"you\"".into(),
            elapsed: Duration::from_secs(125),
        };

        assert_eq!(started.to_string(), "[fatcache] <\"you\"> fetching ...");
        assert_eq!(
            finished.to_string(),
            "[fatcache] <\"you\"> done! 2 minutes, 5 seconds"
        );
        assert_eq!(finished.elapsed(), Some(Duration::from_secs(125)));
        assert_eq!(started.elapsed(), None);
    }

    #[test]
    fn index_messages_name_the_selector() {
        let progress = Progress::IndexStarted {
            cache: "fatcache".into(),
            key: "\"you\"".into(),
            selector: Selector::from("is_none"),
        };

        assert_eq!(
            progress.to_string(),
            "[fatcache] <\"you\"> indexing on [is_none] ..."
        );
        assert_eq!(progress.key(), "\"you\"");
    }
}

//! Progress reporting for long-running operations.

use std::panic::{self, AssertUnwindSafe};

/// Receives human-readable progress messages, in order, on the task that
/// runs the job.
pub trait StatusSink {
    /// Called at each checkpoint of a job.
    fn status_changed(&self, message: &str);
}

impl<F: Fn(&str)> StatusSink for F {
    fn status_changed(&self, message: &str) {
        self(message);
    }
}

/// Deliver `message` to `sink`, containing any panic it raises.
pub(crate) fn notify(sink: Option<&dyn StatusSink>, message: &str) {
    log::info!("{message}");
    let Some(sink) = sink else {
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| sink.status_changed(message))).is_err() {
        log::warn!("status sink panicked while handling '{message}'");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::RefCell;

    #[rstest]
    fn closures_receive_messages_in_order() {
        let seen = RefCell::new(Vec::new());
        let sink = |message: &str| seen.borrow_mut().push(message.to_owned());
        notify(Some(&sink), "one");
        notify(Some(&sink), "two");
        notify(None, "three");
        assert_eq!(*seen.borrow(), ["one", "two"]);
    }

    #[rstest]
    fn panicking_sinks_are_contained() {
        let sink = |_: &str| panic!("sink failure");
        notify(Some(&sink), "still running");
    }
}

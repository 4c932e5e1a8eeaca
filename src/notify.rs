//! Notified transitions
//!
//! Both the [`ClockManager`](crate::ClockManager) and the
//! [`PowerManager`](crate::PowerManager) switch between entries of a
//! caller-owned configuration table. Modules that depend on the clocks or the
//! power mode register a [`TransitionCallback`] to hear about it:
//!
//! ```text
//!  before(0..N) ──ok──▶ apply ──ok──▶ after(0..N)
//!       │                 │
//!       └─refused─┐       └─failed─┐
//!                 ▼                ▼
//!          recover(k..=0)   recover(N-1..=0)
//! ```
//!
//! With [`Policy::Forcible`] a refusal is recorded but the transition is
//! applied anyway.

use crate::Error;

/// Which phase a callback is being told about
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyType {
    /// The transition is about to be applied
    Before,
    /// The transition was applied
    After,
    /// The transition was abandoned after `Before`
    Recover,
}

/// Which phases a registered callback wants to hear about.
///
/// `Recover` is delivered to every callback that got `Before`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackType {
    /// `Before` and `Recover` only
    Before,
    /// `After` only
    After,
    /// Everything
    BeforeAfter,
}

impl CallbackType {
    const fn wants_before(self) -> bool {
        matches!(self, CallbackType::Before | CallbackType::BeforeAfter)
    }

    const fn wants_after(self) -> bool {
        matches!(self, CallbackType::After | CallbackType::BeforeAfter)
    }
}

/// What to do when a callback refuses a transition
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Abandon the transition on the first refusal
    Agreement,
    /// Apply the transition regardless
    Forcible,
}

/// What a callback is told
#[derive(Debug)]
pub struct Notification<'a, C> {
    /// Phase
    pub notify_type: NotifyType,
    /// Index of the target in the manager's configuration table
    pub target_index: usize,
    /// The target configuration
    pub target: &'a C,
    /// Policy of the transition
    pub policy: Policy,
}

/// A module that depends on the clock tree or the power mode.
///
/// `C` is [`ClockUserConfig`](crate::ClockUserConfig) for the clock manager
/// and [`PowerModeConfig`](crate::PowerModeConfig) for the power manager.
/// Every method defaults to accepting, so implementations only override the
/// phases they care about. They must not call back into the manager.
pub trait TransitionCallback<C> {
    /// The transition is about to be applied. An error refuses it.
    fn before(&self, _notification: &Notification<'_, C>) -> Result<(), Error> {
        Ok(())
    }

    /// The transition was applied. An error is reported as
    /// [`Error::NotifyAfter`], the hardware has already changed.
    fn after(&self, _notification: &Notification<'_, C>) -> Result<(), Error> {
        Ok(())
    }

    /// The transition was abandoned. The result is ignored.
    fn recover(&self, _notification: &Notification<'_, C>) -> Result<(), Error> {
        Ok(())
    }
}

/// One entry of a manager's callback table
pub struct CallbackConfig<'a, C> {
    /// The dependent module
    pub callback: &'a dyn TransitionCallback<C>,
    /// Phases it wants
    pub callback_type: CallbackType,
}

impl<C> Clone for CallbackConfig<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for CallbackConfig<'_, C> {}

impl<C> core::fmt::Debug for CallbackConfig<'_, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CallbackConfig")
            .field("callback_type", &self.callback_type)
            .finish_non_exhaustive()
    }
}

/// Result of one notified transition
pub(crate) struct Outcome {
    pub result: Result<(), Error>,
    /// First callback that failed, in any phase
    pub error_callback: Option<usize>,
}

/// Run `apply` wrapped in the before/after/recover protocol
pub(crate) fn run_transition<C>(
    callbacks: &[CallbackConfig<'_, C>],
    target_index: usize,
    target: &C,
    policy: Policy,
    apply: impl FnOnce() -> Result<(), Error>,
) -> Outcome {
    let mut error_callback = None;
    let mut refused = false;
    // Callbacks [0, notified) have been told `Before`
    let mut notified = 0;

    let mut notification = Notification {
        notify_type: NotifyType::Before,
        target_index,
        target,
        policy,
    };

    for (idx, entry) in callbacks.iter().enumerate() {
        notified = idx + 1;
        if !entry.callback_type.wants_before() {
            continue;
        }
        if entry.callback.before(&notification).is_err() {
            warn!("callback {} refused transition to {}", idx, target_index);
            error_callback.get_or_insert(idx);
            refused = true;
            if policy == Policy::Agreement {
                break;
            }
        }
    }

    let applied = if !refused || policy == Policy::Forcible {
        Some(apply())
    } else {
        None
    };

    let result = match applied {
        Some(Ok(())) => {
            notification.notify_type = NotifyType::After;
            let mut after_failed = false;
            for (idx, entry) in callbacks.iter().enumerate() {
                if !entry.callback_type.wants_after() {
                    continue;
                }
                if entry.callback.after(&notification).is_err() {
                    warn!("callback {} failed after transition to {}", idx, target_index);
                    error_callback.get_or_insert(idx);
                    after_failed = true;
                    if policy == Policy::Agreement {
                        break;
                    }
                }
            }
            if refused {
                Err(Error::NotifyBefore)
            } else if after_failed {
                Err(Error::NotifyAfter)
            } else {
                Ok(())
            }
        }
        Some(Err(e)) => {
            recover(callbacks, &mut notification, callbacks.len());
            Err(e)
        }
        None => {
            recover(callbacks, &mut notification, notified);
            Err(Error::NotifyBefore)
        }
    };

    Outcome { result, error_callback }
}

/// Tell callbacks `[0, notified)` in reverse order that the transition was
/// abandoned
fn recover<C>(callbacks: &[CallbackConfig<'_, C>], notification: &mut Notification<'_, C>, notified: usize) {
    notification.notify_type = NotifyType::Recover;
    for entry in callbacks[..notified].iter().rev() {
        if entry.callback_type.wants_before() {
            let _ = entry.callback.recover(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    type Log = RefCell<Vec<(usize, NotifyType)>>;

    struct Recorder<'a> {
        id: usize,
        log: &'a Log,
        refuse_before: bool,
        fail_after: bool,
    }

    impl<'a> Recorder<'a> {
        fn new(id: usize, log: &'a Log) -> Self {
            Self {
                id,
                log,
                refuse_before: false,
                fail_after: false,
            }
        }
    }

    impl TransitionCallback<u32> for Recorder<'_> {
        fn before(&self, n: &Notification<'_, u32>) -> Result<(), Error> {
            self.log.borrow_mut().push((self.id, n.notify_type));
            if self.refuse_before {
                Err(Error::Busy)
            } else {
                Ok(())
            }
        }

        fn after(&self, n: &Notification<'_, u32>) -> Result<(), Error> {
            self.log.borrow_mut().push((self.id, n.notify_type));
            if self.fail_after {
                Err(Error::Busy)
            } else {
                Ok(())
            }
        }

        fn recover(&self, n: &Notification<'_, u32>) -> Result<(), Error> {
            self.log.borrow_mut().push((self.id, n.notify_type));
            Ok(())
        }
    }

    fn table<'a>(recorders: &'a [Recorder<'a>], types: &[CallbackType]) -> Vec<CallbackConfig<'a, u32>> {
        recorders
            .iter()
            .zip(types)
            .map(|(r, t)| CallbackConfig {
                callback: r,
                callback_type: *t,
            })
            .collect()
    }

    #[test]
    fn success_notifies_before_then_after_in_order() {
        let log = Log::default();
        let recorders: Vec<_> = (0..3).map(|i| Recorder::new(i, &log)).collect();
        let callbacks = table(&recorders, &[CallbackType::BeforeAfter; 3]);
        let mut applied = false;

        let out = run_transition(&callbacks, 1, &7, Policy::Agreement, || {
            applied = true;
            Ok(())
        });

        assert_eq!(out.result, Ok(()));
        assert_eq!(out.error_callback, None);
        assert!(applied);
        assert_eq!(
            *log.borrow(),
            [
                (0, NotifyType::Before),
                (1, NotifyType::Before),
                (2, NotifyType::Before),
                (0, NotifyType::After),
                (1, NotifyType::After),
                (2, NotifyType::After),
            ]
        );
    }

    #[test]
    fn type_filter_skips_phases() {
        let log = Log::default();
        let recorders: Vec<_> = (0..3).map(|i| Recorder::new(i, &log)).collect();
        let callbacks = table(
            &recorders,
            &[CallbackType::After, CallbackType::Before, CallbackType::BeforeAfter],
        );

        let out = run_transition(&callbacks, 0, &7, Policy::Agreement, || Ok(()));

        assert_eq!(out.result, Ok(()));
        assert_eq!(
            *log.borrow(),
            [
                (1, NotifyType::Before),
                (2, NotifyType::Before),
                (0, NotifyType::After),
                (2, NotifyType::After),
            ]
        );
    }

    #[test]
    fn refusal_recovers_in_reverse_and_skips_apply() {
        let log = Log::default();
        let mut recorders: Vec<_> = (0..4).map(|i| Recorder::new(i, &log)).collect();
        recorders[2].refuse_before = true;
        let callbacks = table(&recorders, &[CallbackType::BeforeAfter; 4]);
        let mut applied = false;

        let out = run_transition(&callbacks, 0, &7, Policy::Agreement, || {
            applied = true;
            Ok(())
        });

        assert_eq!(out.result, Err(Error::NotifyBefore));
        assert_eq!(out.error_callback, Some(2));
        assert!(!applied);
        assert_eq!(
            *log.borrow(),
            [
                (0, NotifyType::Before),
                (1, NotifyType::Before),
                (2, NotifyType::Before),
                (2, NotifyType::Recover),
                (1, NotifyType::Recover),
                (0, NotifyType::Recover),
            ]
        );
    }

    #[test]
    fn refusal_at_index_zero_recovers_only_zero() {
        let log = Log::default();
        let mut recorders: Vec<_> = (0..2).map(|i| Recorder::new(i, &log)).collect();
        recorders[0].refuse_before = true;
        let callbacks = table(&recorders, &[CallbackType::BeforeAfter; 2]);

        let out = run_transition(&callbacks, 0, &7, Policy::Agreement, || Ok(()));

        assert_eq!(out.result, Err(Error::NotifyBefore));
        assert_eq!(*log.borrow(), [(0, NotifyType::Before), (0, NotifyType::Recover)]);
    }

    #[test]
    fn forcible_applies_despite_refusal() {
        let log = Log::default();
        let mut recorders: Vec<_> = (0..3).map(|i| Recorder::new(i, &log)).collect();
        recorders[0].refuse_before = true;
        let callbacks = table(&recorders, &[CallbackType::BeforeAfter; 3]);
        let mut applied = false;

        let out = run_transition(&callbacks, 0, &7, Policy::Forcible, || {
            applied = true;
            Ok(())
        });

        assert!(applied);
        assert_eq!(out.result, Err(Error::NotifyBefore));
        assert_eq!(out.error_callback, Some(0));
        let log = log.borrow();
        assert_eq!(log.iter().filter(|(_, t)| *t == NotifyType::Before).count(), 3);
        assert_eq!(log.iter().filter(|(_, t)| *t == NotifyType::After).count(), 3);
        assert!(log.iter().all(|(_, t)| *t != NotifyType::Recover));
    }

    #[test]
    fn after_failure_is_reported_as_notify_after() {
        let log = Log::default();
        let mut recorders: Vec<_> = (0..3).map(|i| Recorder::new(i, &log)).collect();
        recorders[1].fail_after = true;
        let callbacks = table(&recorders, &[CallbackType::BeforeAfter; 3]);

        let out = run_transition(&callbacks, 0, &7, Policy::Agreement, || Ok(()));

        assert_eq!(out.result, Err(Error::NotifyAfter));
        assert_eq!(out.error_callback, Some(1));
        assert_eq!(log.borrow().last(), Some(&(1, NotifyType::After)));
    }

    #[test]
    fn apply_failure_recovers_everyone_and_returns_its_error() {
        let log = Log::default();
        let recorders: Vec<_> = (0..3).map(|i| Recorder::new(i, &log)).collect();
        let callbacks = table(&recorders, &[CallbackType::BeforeAfter; 3]);

        let out = run_transition(&callbacks, 0, &7, Policy::Agreement, || Err(Error::Timeout));

        assert_eq!(out.result, Err(Error::Timeout));
        assert_eq!(out.error_callback, None);
        assert_eq!(
            log.borrow()[3..],
            [(2, NotifyType::Recover), (1, NotifyType::Recover), (0, NotifyType::Recover)]
        );
    }

    #[test]
    fn empty_table_just_applies() {
        let callbacks: [CallbackConfig<'_, u32>; 0] = [];
        let out = run_transition(&callbacks, 0, &7, Policy::Agreement, || Err(Error::Busy));
        assert_eq!(out.result, Err(Error::Busy));
    }
}

//! Registry of started coroutines
//!
//! Deregistration only clears the coroutine's active flag while a pass is
//! running; the entry is swept out once the pass completes. Indices stay
//! stable during a pass, so a coroutine stopping itself or a neighbour never
//! shifts the one that follows.

use super::{runtime, Runtime};
use crate::coroutine::{Control, Schedulable};
use crate::fault::Fault;

/// Add `coroutine` to the end of the registry
///
/// An entry still waiting for its sweep is reused in place. When the
/// registry is full during a pass, the slot of a coroutine that stopped
/// earlier in the pass is taken over, so only active coroutines count
/// toward the capacity.
pub(crate) fn register(coroutine: &'static dyn Schedulable) -> Result<(), Fault> {
    let runtime = runtime();
    let mut registry = runtime.registry.borrow_mut();

    let present = registry.iter().any(|entry| {
        core::ptr::addr_eq(
            *entry as *const dyn Schedulable,
            coroutine as *const dyn Schedulable,
        )
    });
    if present {
        return Ok(());
    }

    let Err(coroutine) = registry.push(coroutine) else {
        return Ok(());
    };

    // Prefer a slot the pass has already visited so the newcomer waits for
    // the next pass
    let cursor = runtime.cursor.get();
    let slot = registry
        .iter()
        .enumerate()
        .filter(|(_, entry)| !entry.control().is_active())
        .map(|(index, _)| index)
        .min_by_key(|index| *index > cursor);
    match slot {
        Some(index) => {
            registry[index] = coroutine;
            Ok(())
        }
        None => Err(Fault::capacity("coroutine registry full")),
    }
}

/// Remove the coroutine owning `control`
///
/// The caller has already cleared the active flag.
pub(crate) fn deregister(control: &Control) {
    let runtime = runtime();
    if runtime.in_pass.get() {
        runtime.sweep_pending.set(true);
        return;
    }
    runtime
        .registry
        .borrow_mut()
        .retain(|entry| !core::ptr::eq(entry.control(), control));
}

/// Drop every inactive entry
pub(super) fn sweep(runtime: &Runtime) {
    if runtime.sweep_pending.replace(false) {
        runtime
            .registry
            .borrow_mut()
            .retain(|entry| entry.control().is_active());
    }
}

/// Number of registry entries at pass start
pub(super) fn snapshot_len(runtime: &Runtime) -> usize {
    runtime.registry.borrow().len()
}

pub(super) fn entry(runtime: &Runtime, index: usize) -> Option<&'static dyn Schedulable> {
    runtime.registry.borrow().get(index).copied()
}

/// Number of registered coroutines, paused ones included
pub fn active_count() -> usize {
    runtime()
        .registry
        .borrow()
        .iter()
        .filter(|entry| entry.control().is_active())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::{Control, Schedulable};
    use crate::scheduler::reset;
    use std::boxed::Box;
    use std::vec::Vec;

    struct Probe {
        control: Control,
    }

    impl Schedulable for Probe {
        fn control(&self) -> &Control {
            &self.control
        }

        fn name(&self) -> &'static str {
            "probe"
        }

        fn run_or_resume(&'static self) {}
    }

    fn probe() -> &'static Probe {
        let probe = Box::leak(Box::new(Probe {
            control: Control::new(),
        }));
        probe.control.activate();
        probe
    }

    #[test]
    fn test_register_is_idempotent() {
        reset();
        let a = probe();
        register(a).unwrap();
        register(a).unwrap();
        assert_eq!(snapshot_len(runtime()), 1);
    }

    #[test]
    fn test_deregister_outside_pass_is_immediate() {
        reset();
        let a = probe();
        let b = probe();
        register(a).unwrap();
        register(b).unwrap();
        a.control.deactivate();
        deregister(&a.control);
        assert_eq!(snapshot_len(runtime()), 1);
        assert!(core::ptr::eq(entry(runtime(), 0).unwrap().control(), &b.control));
    }

    #[test]
    fn test_deregister_inside_pass_is_deferred() {
        reset();
        let runtime = runtime();
        let a = probe();
        register(a).unwrap();

        runtime.in_pass.set(true);
        a.control.deactivate();
        deregister(&a.control);
        assert_eq!(snapshot_len(runtime), 1);
        assert_eq!(active_count(), 0);

        runtime.in_pass.set(false);
        sweep(runtime);
        assert_eq!(snapshot_len(runtime), 0);
    }

    #[test]
    fn test_capacity_fault() {
        reset();
        for _ in 0..crate::config::MAX_COROUTINES {
            register(probe()).unwrap();
        }
        let fault = register(probe()).unwrap_err();
        assert_eq!(fault.kind(), crate::fault::FaultKind::Capacity);
    }

    #[test]
    fn test_full_registry_reuses_slot_stopped_in_pass() {
        reset();
        let runtime = runtime();
        let entries: Vec<&'static Probe> =
            (0..crate::config::MAX_COROUTINES).map(|_| probe()).collect();
        for entry in &entries {
            register(*entry).unwrap();
        }

        runtime.in_pass.set(true);
        runtime.cursor.set(5);
        entries[9].control.deactivate();
        deregister(&entries[9].control);
        entries[2].control.deactivate();
        deregister(&entries[2].control);

        let late = probe();
        register(late).unwrap();
        assert_eq!(snapshot_len(runtime), crate::config::MAX_COROUTINES);
        assert!(core::ptr::eq(entry(runtime, 2).unwrap().control(), &late.control));
        assert!(core::ptr::eq(
            entry(runtime, 9).unwrap().control(),
            &entries[9].control
        ));

        runtime.in_pass.set(false);
        sweep(runtime);
        assert_eq!(snapshot_len(runtime), crate::config::MAX_COROUTINES - 1);
        assert_eq!(active_count(), crate::config::MAX_COROUTINES - 1);
    }

    #[test]
    fn test_full_registry_of_active_entries_still_faults_in_pass() {
        reset();
        let runtime = runtime();
        for _ in 0..crate::config::MAX_COROUTINES {
            register(probe()).unwrap();
        }
        runtime.in_pass.set(true);
        let fault = register(probe()).unwrap_err();
        assert_eq!(fault.kind(), crate::fault::FaultKind::Capacity);
        runtime.in_pass.set(false);
    }
}
